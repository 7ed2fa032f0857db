//! # Configuration
//!
//! Plain structs with serde support, sensible defaults and explicit
//! validation. An aggregate [`OrchestratorConfig`] can be layered from a
//! TOML file plus `ORCHESTRATOR__`-prefixed environment overrides.

use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};

/// What the Reaper does with an operation stuck `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Republish the stored envelope with zero delay
    Retry,
    /// Finalize directly as failed
    Fail,
}

/// Queue worker behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueWorkerConfig {
    /// Interval between state polls while waiting on an attempt
    pub polling_interval_ms: u64,
    /// Envelopes taken per `pump()`
    pub batch_size: usize,
    /// Maximum envelopes processed concurrently
    pub concurrency: usize,
    /// Ceiling on one attempt's wall-clock time before it is nacked
    pub max_processing_time_ms: u64,
    /// Retry budget: attempts at or beyond this count finalize as failed
    pub max_retries: u32,
    /// Whether permanent failures are copied to the DLQ
    pub dlq_enabled: bool,
}

impl Default for QueueWorkerConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: 100,
            batch_size: 10,
            concurrency: 5,
            max_processing_time_ms: 30_000,
            max_retries: 3,
            dlq_enabled: true,
        }
    }
}

impl QueueWorkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.polling_interval_ms == 0 {
            return Err(OrchestratorError::Configuration(
                "polling_interval_ms must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(OrchestratorError::Configuration(
                "batch_size must be positive".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(OrchestratorError::Configuration(
                "concurrency must be positive".to_string(),
            ));
        }
        if self.max_processing_time_ms == 0 {
            return Err(OrchestratorError::Configuration(
                "max_processing_time_ms must be positive".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(OrchestratorError::Configuration(
                "max_retries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Finalizer sweep behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizerConfig {
    /// Interval between scans when run on a schedule
    pub scan_interval_ms: u64,
    /// Pending WAL entries recovered per scan
    pub batch_size: usize,
}

impl Default for FinalizerConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 60_000,
            batch_size: 100,
        }
    }
}

impl FinalizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_ms == 0 {
            return Err(OrchestratorError::Configuration(
                "scan_interval_ms must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(OrchestratorError::Configuration(
                "batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reaper sweep behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    /// Interval between scans when run on a schedule
    pub scan_interval_ms: u64,
    /// How long an operation may sit `InProgress` before it counts as stuck
    pub timeout_threshold_ms: u64,
    /// Stuck operations reconciled per scan
    pub batch_size: usize,
    /// Strategy applied to every stuck operation
    pub default_strategy: ReconcileStrategy,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 300_000,
            timeout_threshold_ms: 600_000,
            batch_size: 50,
            default_strategy: ReconcileStrategy::Fail,
        }
    }
}

impl ReaperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_ms == 0 {
            return Err(OrchestratorError::Configuration(
                "scan_interval_ms must be positive".to_string(),
            ));
        }
        if self.timeout_threshold_ms == 0 {
            return Err(OrchestratorError::Configuration(
                "timeout_threshold_ms must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(OrchestratorError::Configuration(
                "batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Exponential backoff parameters for retry republishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First-attempt delay
    pub base_delay_ms: u64,
    /// Cap applied after exponentiation and jitter
    pub max_delay_ms: u64,
    /// Jitter as a fraction of the exponential delay, 0.0 to 1.0
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 300_000,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_delay_ms == 0 {
            return Err(OrchestratorError::Configuration(
                "base_delay_ms must be positive".to_string(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(OrchestratorError::Configuration(format!(
                "max_delay_ms must be >= base_delay_ms (base: {}, max: {})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(OrchestratorError::Configuration(format!(
                "jitter_factor must be between 0.0 and 1.0 (current: {})",
                self.jitter_factor
            )));
        }
        Ok(())
    }
}

/// Aggregate configuration for all runners.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub queue_worker: QueueWorkerConfig,
    pub finalizer: FinalizerConfig,
    pub reaper: ReaperConfig,
    pub backoff: BackoffConfig,
}

impl OrchestratorConfig {
    /// Layer defaults, an optional TOML file, and `ORCHESTRATOR__`-prefixed
    /// environment variables (e.g. `ORCHESTRATOR__QUEUE_WORKER__BATCH_SIZE`).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("ORCHESTRATOR")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        self.queue_worker.validate()?;
        self.finalizer.validate()?;
        self.reaper.validate()?;
        self.backoff.validate()?;
        Ok(())
    }
}
