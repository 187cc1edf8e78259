//! Broker errors.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use nocturne_pipeline::{AssemblyError, PipelineError};
use nocturne_protocol::ProtocolError;

/// Why one partition produced no usable result.
#[derive(Debug, thiserror::Error)]
pub enum PartitionFailure {
    /// The request could not be sent or the reply could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The worker exited with a non-zero status or was killed by a signal.
    #[error("worker exited unsuccessfully ({status})")]
    WorkerExit {
        /// Exit status as reported by the OS.
        status: ExitStatus,
    },

    /// The worker was still running at the deadline and was killed.
    #[error("worker did not finish within {after:?}")]
    TimedOut {
        /// The configured timeout.
        after: Duration,
    },

    /// Waiting on the worker process failed.
    #[error("could not wait for worker: {0}")]
    Wait(#[source] io::Error),
}

/// A run that produced no image.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The configuration was rejected before any worker was spawned.
    #[error(transparent)]
    Config(#[from] PipelineError),

    /// A worker process could not be started. Workers already started
    /// have been killed.
    #[error("failed to spawn worker {index}: {source}")]
    Spawn {
        /// Partition the worker was meant for.
        index: usize,
        /// Error from the OS.
        source: io::Error,
    },

    /// One or more partitions failed under [`crate::FailurePolicy::Abort`].
    #[error("{} of {total} partitions failed", .failures.len())]
    PartitionsFailed {
        /// Number of partitions in the run.
        total: usize,
        /// Every failed partition, by index.
        failures: Vec<(usize, PartitionFailure)>,
    },

    /// Fragments did not fit back together.
    #[error("reassembly failed: {0}")]
    Assembly(#[from] AssemblyError),
}
