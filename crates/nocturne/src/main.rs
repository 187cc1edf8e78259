//! nocturne: filter a BMP image across worker processes.
//!
//! Splits the image into one column range per worker, runs each range
//! through saturate, greyscale and binarize in a separate
//! `nocturne-worker` process, reassembles the results, writes the
//! requested stage images, and records in a CSV report whether each one
//! is mostly black.
//!
//! # Usage
//!
//! ```text
//! nocturne -N <IMAGE> -C <OUTPUT_DIR> -R <REPORT> [-f 3] [-p 1.3] [-u 0.5] [-v 0.5] [-W 1]
//! ```

#![allow(clippy::print_stderr)]

mod app;
mod bmp;
mod cli;
mod error;
mod report;
mod settings;

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use nocturne_broker::ProcessLauncher;
use simplelog::{
    ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};

use crate::app::Completion;
use crate::cli::Cli;
use crate::error::AppError;

fn init_logging(level: LevelFilter, file: Option<&Path>) -> Result<(), AppError> {
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    match file {
        Some(path) => {
            let file = File::create(path).map_err(|source| AppError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            WriteLogger::init(level, config, file)
        }
        None => TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto),
    }
    .map_err(|e| AppError::Logging(e.to_string()))
}

fn launcher(cli: &Cli) -> Result<ProcessLauncher, AppError> {
    match &cli.worker_bin {
        Some(path) => Ok(ProcessLauncher::new(path)),
        None => ProcessLauncher::beside_current_exe().map_err(|source| AppError::Io {
            path: "nocturne executable".into(),
            source,
        }),
    }
}

fn try_main(cli: &Cli) -> Result<Completion, AppError> {
    let settings = cli.settings()?;
    let launcher = launcher(cli)?;
    log::debug!("worker binary: {}", launcher.program().display());
    app::run(&settings, &launcher)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_level, cli.log_file.as_deref()) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match try_main(&cli) {
        Ok(Completion::Complete) => ExitCode::SUCCESS,
        Ok(Completion::Partial) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
