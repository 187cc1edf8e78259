//! Run configuration.

use std::time::Duration;

use nocturne_pipeline::{FilterParams, PipelineError};
use serde::{Deserialize, Serialize};

/// Serde helper: `Option<Duration>` as optional fractional seconds.
mod optional_duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        duration.map(|d| d.as_secs_f64()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    serde::de::Error::custom(
                        "timeout seconds must be finite, non-negative, and representable as a Duration",
                    )
                })
            })
            .transpose()
    }
}

/// What to do when some partitions fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole run if any partition fails.
    #[default]
    Abort,

    /// Assemble whatever succeeded, leaving failed columns black, and
    /// report the failures alongside the image.
    Tolerate,
}

/// Everything the broker needs besides the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Parameters sent to every worker.
    pub params: FilterParams,

    /// Number of worker processes, one per column partition.
    ///
    /// Must be at least 1 and at most the image width.
    pub workers: usize,

    /// How partition failures are handled.
    pub failure_policy: FailurePolicy,

    /// How long to wait for the workers before killing them.
    ///
    /// `None` waits indefinitely.
    #[serde(with = "optional_duration_serde")]
    pub worker_timeout: Option<Duration>,
}

impl RunConfig {
    /// Default worker count.
    pub const DEFAULT_WORKERS: usize = 1;

    /// Check everything that can be checked without the image.
    ///
    /// The upper bound on `workers` depends on the image width and is
    /// enforced when partitioning.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the filter parameters
    /// are out of range, `workers` is zero, or the timeout is zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.params.validate()?;
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "worker count must be at least 1".to_owned(),
            ));
        }
        if self.worker_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PipelineError::InvalidConfig(
                "worker timeout must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            params: FilterParams::default(),
            workers: Self::DEFAULT_WORKERS,
            failure_policy: FailurePolicy::default(),
            worker_timeout: None,
        }
    }
}
