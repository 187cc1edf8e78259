//! Launcher errors.

use std::io;
use std::path::PathBuf;

use nocturne_broker::BrokerError;
use nocturne_pipeline::PipelineError;

/// Anything that stops the launcher before it finishes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Command-line or JSON configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The input image could not be read or decoded.
    #[error("could not read image {}: {source}", path.display())]
    ReadImage {
        /// Input path.
        path: PathBuf,
        /// Decoder error.
        source: image::ImageError,
    },

    /// A stage image could not be encoded or written.
    #[error("could not write image {}: {source}", path.display())]
    WriteImage {
        /// Output path.
        path: PathBuf,
        /// Encoder error.
        source: image::ImageError,
    },

    /// The decoded image is not a usable raster.
    #[error(transparent)]
    Raster(#[from] PipelineError),

    /// Filesystem failure outside image encoding.
    #[error("{}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Error from the OS.
        source: io::Error,
    },

    /// The classification report could not be written.
    #[error("could not write report {}: {source}", path.display())]
    Report {
        /// Report path.
        path: PathBuf,
        /// CSV error.
        source: csv::Error,
    },

    /// The worker pool failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Logging could not be set up.
    #[error("could not initialize logging: {0}")]
    Logging(String),
}
