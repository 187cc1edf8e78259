//! nocturne-broker: run the filter chain across a pool of worker processes.
//!
//! The image is split into column partitions, one per worker. Each worker
//! is a separate process started through a [`WorkerLauncher`]; it gets
//! its fragment on stdin and answers on stdout. The broker reaps every
//! worker, decodes the replies in partition order, and stitches them
//! into full-size images.
//!
//! [`Broker::run`] does all of that in one call. [`Broker::new`] returns
//! the first state of a [`run`] so callers can step through it.

pub mod config;
pub mod error;
pub mod launcher;
pub mod run;

pub use config::{FailurePolicy, RunConfig};
pub use error::{BrokerError, PartitionFailure};
pub use launcher::{ProcessLauncher, WORKER_BIN, WorkerLauncher};
pub use run::{Broker, BrokerOutput, Outcome};
