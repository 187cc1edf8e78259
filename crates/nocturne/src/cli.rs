//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use nocturne_broker::{FailurePolicy, RunConfig};
use nocturne_pipeline::FilterParams;

use crate::error::AppError;
use crate::settings::Settings;

/// Filter a BMP image across a pool of worker processes.
///
/// The image is split into one column range per worker. Each worker
/// saturates, greyscales and binarizes its columns; the results are
/// stitched back together, written as BMPs, and classified as mostly
/// black or not in a CSV report.
#[derive(Debug, Parser)]
#[command(name = "nocturne", version)]
pub struct Cli {
    /// Input BMP image.
    #[arg(short = 'N', long)]
    pub image: PathBuf,

    /// Number of stage images to write (1 = saturated, 2 = + greyscale,
    /// 3 = + binarized).
    #[arg(short = 'f', long = "filters", default_value_t = Settings::DEFAULT_FILTER_COUNT)]
    pub filter_count: usize,

    /// Saturation factor (greater than 0).
    #[arg(short = 'p', long = "saturation", default_value_t = FilterParams::DEFAULT_SATURATION_FACTOR)]
    pub saturation_factor: f32,

    /// Binarization threshold (0 to 1).
    #[arg(short = 'u', long, default_value_t = FilterParams::DEFAULT_BINARIZE_THRESHOLD)]
    pub binarize_threshold: f32,

    /// Fraction of near-black pixels at which an image counts as mostly
    /// black (0 to 1).
    #[arg(short = 'v', long, default_value_t = Settings::DEFAULT_CLASSIFY_THRESHOLD)]
    pub classify_threshold: f32,

    /// Number of worker processes.
    #[arg(short = 'W', long, default_value_t = RunConfig::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Directory for the output images.
    #[arg(short = 'C', long)]
    pub output_dir: PathBuf,

    /// Path of the CSV report.
    #[arg(short = 'R', long)]
    pub report: PathBuf,

    /// Worker executable (default: `nocturne-worker` next to this binary).
    #[arg(long)]
    pub worker_bin: Option<PathBuf>,

    /// Kill workers that have not finished after this many milliseconds.
    #[arg(long)]
    pub worker_timeout_ms: Option<u64>,

    /// Write partial images when some workers fail instead of aborting.
    #[arg(long)]
    pub tolerate_failures: bool,

    /// Full worker pool configuration as JSON (overrides -p, -u, -W,
    /// --worker-timeout-ms and --tolerate-failures).
    #[arg(long)]
    pub config_json: Option<String>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// Write the log to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Build the worker pool configuration.
    ///
    /// If `--config-json` is provided, the JSON is parsed directly and the
    /// individual pool flags are ignored.
    fn run_config(&self) -> Result<RunConfig, AppError> {
        if let Some(ref json) = self.config_json {
            return serde_json::from_str(json)
                .map_err(|e| AppError::Config(format!("error parsing --config-json: {e}")));
        }
        Ok(RunConfig {
            params: FilterParams {
                saturation_factor: self.saturation_factor,
                binarize_threshold: self.binarize_threshold,
            },
            workers: self.workers,
            failure_policy: if self.tolerate_failures {
                FailurePolicy::Tolerate
            } else {
                FailurePolicy::Abort
            },
            worker_timeout: self.worker_timeout_ms.map(Duration::from_millis),
        })
    }

    /// Assemble and validate the settings for this invocation.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if any option is out of range.
    pub fn settings(&self) -> Result<Settings, AppError> {
        let settings = Settings {
            image: self.image.clone(),
            output_dir: self.output_dir.clone(),
            report: self.report.clone(),
            run: self.run_config()?,
            filter_count: self.filter_count,
            classify_threshold: self.classify_threshold,
        };
        settings.validate()?;
        Ok(settings)
    }
}
