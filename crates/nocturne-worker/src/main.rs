//! nocturne-worker: filter one column fragment.
//!
//! Reads a request from stdin, writes the reply to stdout, and exits 0.
//! Any failure is logged to stderr and reported through a non-zero exit
//! status, which is all the broker looks at.
//!
//! The log level comes from `NOCTURNE_LOG` (default `warn`).

#![allow(clippy::print_stderr)]

use std::io::{self, BufWriter};
use std::process::ExitCode;

use nocturne_protocol::{WORKER_INDEX_ENV, WORKER_LOG_ENV};
use log::SetLoggerError;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

fn init_logging() -> Result<(), SetLoggerError> {
    let level = std::env::var(WORKER_LOG_ENV)
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    // Stdout carries the reply, so the terminal logger must stay on stderr.
    TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Never)
}

fn main() -> ExitCode {
    // The reply does not depend on logging, so serve the request anyway.
    if let Err(e) = init_logging() {
        eprintln!("nocturne-worker: logging disabled: {e}");
    }
    let index = std::env::var(WORKER_INDEX_ENV).unwrap_or_else(|_| String::from("?"));

    let mut input = io::stdin().lock();
    let mut output = BufWriter::new(io::stdout().lock());

    match nocturne_worker::serve(&mut input, &mut output) {
        Ok(dimensions) => {
            log::debug!("worker {index}: replied for {dimensions} fragment");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("worker {index}: {e}");
            ExitCode::FAILURE
        }
    }
}
