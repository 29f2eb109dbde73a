//! In-memory step store

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use contracts::{ContractError, Goal, StepQuery, StepRecord, StepStore};
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct MemoryState {
    /// Upsert key: user + local calendar day
    records: BTreeMap<(String, NaiveDate), StepRecord>,
    goals: HashMap<String, Goal>,
    /// Every accepted upsert, in order
    write_log: Vec<StepRecord>,
}

/// In-process store keyed by user + local date
#[derive(Debug)]
pub struct MemoryStepStore {
    name: String,
    state: Mutex<MemoryState>,
    latency: Duration,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    writes_in_flight: AtomicUsize,
    max_concurrent_writes: AtomicUsize,
}

impl Default for MemoryStepStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStepStore {
    pub fn new() -> Self {
        Self {
            name: "memory".to_string(),
            state: Mutex::new(MemoryState::default()),
            latency: Duration::ZERO,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            writes_in_flight: AtomicUsize::new(0),
            max_concurrent_writes: AtomicUsize::new(0),
        }
    }

    /// Builder: delay every operation
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Seed a persisted record (bypasses the write log)
    pub fn insert_record(&self, record: StepRecord) {
        let key = Self::key(&record);
        self.lock().records.insert(key, record);
    }

    pub fn set_goal(&self, user_id: impl Into<String>, goal: Goal) {
        self.lock().goals.insert(user_id.into(), goal);
    }

    /// Accepted upserts
    pub fn write_count(&self) -> usize {
        self.lock().write_log.len()
    }

    pub fn write_log(&self) -> Vec<StepRecord> {
        self.lock().write_log.clone()
    }

    /// Stored records for `user_id`, ordered by date
    pub fn records_for(&self, user_id: &str) -> Vec<StepRecord> {
        let mut records: Vec<StepRecord> = self
            .lock()
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date);
        records
    }

    /// Highest number of upserts observed running at once
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_concurrent_writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(record: &StepRecord) -> (String, NaiveDate) {
        (
            record.user_id.clone(),
            record.date.with_timezone(&Local).date_naive(),
        )
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl StepStore for MemoryStepStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "memory_store_fetch_steps", skip(self), fields(user_id = %query.user_id))]
    async fn fetch_steps(&self, query: &StepQuery) -> Result<Vec<StepRecord>, ContractError> {
        self.simulate_latency().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ContractError::store_request("fetch_steps", "injected failure"));
        }

        let records: Vec<StepRecord> = self
            .records_for(&query.user_id)
            .into_iter()
            .filter(|r| query.range.contains(r.date))
            .collect();
        debug!(count = records.len(), "fetched records");
        Ok(records)
    }

    #[instrument(name = "memory_store_upsert_steps", skip(self, record), fields(user_id = %record.user_id, steps = record.steps))]
    async fn upsert_steps(&self, record: &StepRecord) -> Result<(), ContractError> {
        let running = self.writes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_writes.fetch_max(running, Ordering::SeqCst);

        self.simulate_latency().await;
        self.writes_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ContractError::store_rejected("upsert_steps", "injected failure"));
        }

        let key = Self::key(record);
        let mut state = self.lock();
        state.records.insert(key, record.clone());
        state.write_log.push(record.clone());
        Ok(())
    }

    async fn fetch_goal(&self, user_id: &str) -> Result<Option<Goal>, ContractError> {
        self.simulate_latency().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ContractError::store_request("fetch_goal", "injected failure"));
        }
        Ok(self.lock().goals.get(user_id).copied())
    }
}
