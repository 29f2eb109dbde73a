//! TrackerBlueprint - Config Loader output
//!
//! Describes one tracking deployment: detector tuning, debounce, metric
//! policies, the activity table, and where steps are persisted.

use serde::{Deserialize, Serialize};

use crate::{ActivityTable, Goal, UserPhysicalProfile};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete tracker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Per-activity thresholds and factors
    #[serde(default)]
    pub activities: ActivityTable,

    /// Physical profile (normally read from the preferences store)
    #[serde(default)]
    pub profile: Option<UserPhysicalProfile>,

    /// Goal override; when absent the goal is fetched from the store
    #[serde(default)]
    pub goal: Option<Goal>,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Step detector tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Sliding window capacity (samples)
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Minimum time between accepted steps (milliseconds)
    #[serde(default = "default_refractory_ms")]
    pub refractory_ms: u64,
}

fn default_window_size() -> usize {
    10
}

fn default_refractory_ms() -> u64 {
    300
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            refractory_ms: default_refractory_ms(),
        }
    }
}

/// What to do on simulators / emulators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualDevicePolicy {
    /// Count steps locally, never persist them
    #[default]
    DetectLocally,
    /// Do not subscribe to the motion source at all
    Disabled,
}

/// Sync coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet period before a debounced write (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub virtual_device_policy: VirtualDevicePolicy,
}

fn default_debounce_ms() -> u64 {
    2000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            virtual_device_policy: VirtualDevicePolicy::default(),
        }
    }
}

/// Denominator policy for average steps per hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourlyRateBasis {
    /// steps / max(elapsed hours, 1)
    #[default]
    FloorOneHour,
    /// steps / 24
    FlatDay,
}

/// Metric derivation policies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub hourly_rate_basis: HourlyRateBasis,
}

/// Session identity and plumbing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Authenticated user
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Capacity of the sample queue between source callback and session loop
    #[serde(default = "default_sample_channel_capacity")]
    pub sample_channel_capacity: usize,
}

fn default_user_id() -> String {
    "local-user".to_string()
}

fn default_sample_channel_capacity() -> usize {
    256
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            sample_channel_capacity: default_sample_channel_capacity(),
        }
    }
}

/// Store backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// In-process store (offline / tests)
    #[default]
    Memory,
    /// REST backend
    Http,
}

/// Remote store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,

    /// Base URL of the REST backend (http kind only)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}
