use crate::common::{BatchError, BatchResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

/// How an engine treats requests whose parameters differ from the rest of
/// their batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPolicy {
    /// The first request's parameters apply to the whole batch. Divergence is
    /// logged and counted but not acted on.
    #[default]
    FirstWins,
    /// A flushed batch is split into consecutive runs of equal parameters,
    /// each dispatched as its own executor call.
    SplitByParameters,
    /// Enqueue fails when the parameters differ from the queue head.
    Reject,
}

/// Per-engine tuning. Fixed when the engine is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub max_batch: usize,
    pub flush_interval_ms: u64,
    pub max_queue_size: usize,
    pub parameter_policy: ParameterPolicy,
}

impl EngineSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Sub-millisecond intervals round up to 1 ms; only `Duration::ZERO`
    /// yields a zero interval.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        let mut millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 && !interval.is_zero() {
            millis = 1;
        }
        self.flush_interval_ms = millis;
        self
    }

    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    pub fn with_parameter_policy(mut self, policy: ParameterPolicy) -> Self {
        self.parameter_policy = policy;
        self
    }

    pub fn validate(&self) -> BatchResult<()> {
        if self.max_batch == 0 {
            return Err(BatchError::invalid_config("max_batch must be > 0"));
        }
        if self.max_queue_size == 0 {
            return Err(BatchError::invalid_config("max_queue_size must be > 0"));
        }
        if self.max_queue_size > Semaphore::MAX_PERMITS {
            return Err(BatchError::invalid_config(format!(
                "max_queue_size must be <= {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_batch: 16,
            flush_interval_ms: 50,
            max_queue_size: 1000,
            parameter_policy: ParameterPolicy::FirstWins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = EngineSettings::default();
        assert_eq!(settings.max_batch, 16);
        assert_eq!(settings.flush_interval(), Duration::from_millis(50));
        assert_eq!(settings.max_queue_size, 1000);
        assert_eq!(settings.parameter_policy, ParameterPolicy::FirstWins);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let err = EngineSettings::default().with_max_batch(0).validate().unwrap_err();
        assert!(matches!(err, BatchError::InvalidConfig { .. }));

        let err = EngineSettings::default()
            .with_max_queue_size(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("max_queue_size"));
    }

    #[test]
    fn zero_flush_interval_is_allowed() {
        let settings = EngineSettings::default().with_flush_interval(Duration::ZERO);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn sub_millisecond_interval_rounds_up() {
        let settings = EngineSettings::default().with_flush_interval(Duration::from_micros(200));
        assert_eq!(settings.flush_interval_ms, 1);
        assert_eq!(settings.flush_interval(), Duration::from_millis(1));

        let settings = EngineSettings::default().with_flush_interval(Duration::from_micros(2500));
        assert_eq!(settings.flush_interval_ms, 2);
    }

    #[test]
    fn oversized_queue_is_rejected() {
        let err = EngineSettings::default()
            .with_max_queue_size(usize::MAX)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("max_queue_size"));
    }

    #[test]
    fn max_batch_above_queue_size_is_accepted() {
        let settings = EngineSettings::default().with_max_batch(64).with_max_queue_size(8);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        let settings: EngineSettings =
            toml::from_str("parameter_policy = \"split_by_parameters\"").unwrap();
        assert_eq!(settings.parameter_policy, ParameterPolicy::SplitByParameters);
        assert_eq!(settings.max_batch, 16);
    }
}
