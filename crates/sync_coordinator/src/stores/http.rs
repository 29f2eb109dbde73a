//! REST step store
//!
//! Endpoints (relative to `base_url`):
//! - `GET  /steps/{userId}?startDate=..&endDate=..`
//! - `POST /steps` (upsert by user + day)
//! - `GET  /goals/{userId}`
//!
//! Every response is wrapped as `{statusCode, message, success, data}`.

use std::time::Duration;

use chrono::SecondsFormat;
use contracts::{ContractError, Goal, StepQuery, StepRecord, StepStore, StoreConfig};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Response envelope used by every endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEnvelope<T> {
    #[serde(default)]
    status_code: u16,
    #[serde(default)]
    message: String,
    success: bool,
    data: Option<T>,
}

/// Goal payload; the backend serializes numbers as JSON numbers of either kind
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoalDto {
    #[serde(default)]
    daily_goal: f64,
    #[serde(default)]
    weekly_goal: f64,
}

impl GoalDto {
    fn into_goal(self) -> Goal {
        fn to_count(value: f64) -> u32 {
            if value.is_finite() && value > 0.0 {
                value.round().min(f64::from(u32::MAX)) as u32
            } else {
                0
            }
        }
        Goal::new(to_count(self.daily_goal), to_count(self.weekly_goal))
    }
}

/// HTTP-backed store
#[derive(Debug, Clone)]
pub struct HttpStepStore {
    client: Client,
    base_url: String,
}

impl HttpStepStore {
    /// Create a store for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ContractError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ContractError::store_request("build_client", e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use a preconfigured client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, ContractError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| ContractError::config_validation("store.base_url", "missing base_url"))?;
        Self::new(base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn steps_url(&self, user_id: &str) -> String {
        format!("{}/steps/{}", self.base_url, user_id)
    }

    fn upsert_url(&self) -> String {
        format!("{}/steps", self.base_url)
    }

    fn goal_url(&self, user_id: &str) -> String {
        format!("{}/goals/{}", self.base_url, user_id)
    }

    /// Unwrap the envelope, mapping transport/HTTP/backend failures
    async fn read_envelope<T: DeserializeOwned>(
        operation: &str,
        response: Response,
    ) -> Result<Option<T>, ContractError> {
        let status = response.status();
        debug!(operation, %status, "store response");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ContractError::store_rejected(
                operation,
                format!("HTTP {status}: {text}"),
            ));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ContractError::store_request(operation, format!("decode error: {e}")))?;

        if !envelope.success {
            return Err(ContractError::store_rejected(
                operation,
                format!("{} ({})", envelope.message, envelope.status_code),
            ));
        }
        Ok(envelope.data)
    }
}

impl StepStore for HttpStepStore {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(name = "http_store_fetch_steps", skip(self), fields(user_id = %query.user_id))]
    async fn fetch_steps(&self, query: &StepQuery) -> Result<Vec<StepRecord>, ContractError> {
        const OP: &str = "fetch_steps";
        let start = query.range.start.to_rfc3339_opts(SecondsFormat::Millis, true);
        let end = query.range.end.to_rfc3339_opts(SecondsFormat::Millis, true);

        let response = self
            .client
            .get(self.steps_url(&query.user_id))
            .query(&[("startDate", start.as_str()), ("endDate", end.as_str())])
            .send()
            .await
            .map_err(|e| ContractError::store_request(OP, e.to_string()))?;

        let mut records: Vec<StepRecord> =
            Self::read_envelope(OP, response).await?.unwrap_or_default();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    #[instrument(name = "http_store_upsert_steps", skip(self, record), fields(user_id = %record.user_id, steps = record.steps))]
    async fn upsert_steps(&self, record: &StepRecord) -> Result<(), ContractError> {
        const OP: &str = "upsert_steps";
        let response = self
            .client
            .post(self.upsert_url())
            .json(record)
            .send()
            .await
            .map_err(|e| ContractError::store_request(OP, e.to_string()))?;

        Self::read_envelope::<serde_json::Value>(OP, response).await?;
        Ok(())
    }

    #[instrument(name = "http_store_fetch_goal", skip(self))]
    async fn fetch_goal(&self, user_id: &str) -> Result<Option<Goal>, ContractError> {
        const OP: &str = "fetch_goal";
        let response = self
            .client
            .get(self.goal_url(user_id))
            .send()
            .await
            .map_err(|e| ContractError::store_request(OP, e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let goal: Option<GoalDto> = Self::read_envelope(OP, response).await?;
        Ok(goal.map(GoalDto::into_goal))
    }
}
