//! How worker processes are started.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::LevelFilter;
use nocturne_pipeline::Partition;
use nocturne_protocol::{WORKER_INDEX_ENV, WORKER_LOG_ENV};

/// File name of the worker binary, without platform suffix.
pub const WORKER_BIN: &str = "nocturne-worker";

/// Builds the command that starts the worker for one partition.
///
/// The broker overrides stdin, stdout and stderr on the returned command,
/// so implementations only choose the program, arguments and environment.
pub trait WorkerLauncher {
    /// The command for `partition`'s worker.
    fn command(&self, partition: &Partition) -> Command;
}

impl<F> WorkerLauncher for F
where
    F: Fn(&Partition) -> Command,
{
    fn command(&self, partition: &Partition) -> Command {
        self(partition)
    }
}

/// Runs the `nocturne-worker` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessLauncher {
    program: PathBuf,
    log_level: Option<LevelFilter>,
}

impl ProcessLauncher {
    /// Launch `program` for every partition.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            log_level: None,
        }
    }

    /// Launch the worker binary installed next to the running executable.
    ///
    /// # Errors
    ///
    /// Returns an error if the current executable's path is unavailable.
    pub fn beside_current_exe() -> io::Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe
            .parent()
            .ok_or_else(|| io::Error::other("current executable has no parent directory"))?;
        let name = format!("{WORKER_BIN}{}", std::env::consts::EXE_SUFFIX);
        Ok(Self::new(dir.join(name)))
    }

    /// Pin the workers' log level instead of forwarding the broker's own.
    #[must_use]
    pub const fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Path of the worker binary.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn command(&self, partition: &Partition) -> Command {
        let level = self.log_level.unwrap_or_else(log::max_level);
        let mut command = Command::new(&self.program);
        command
            .env(WORKER_LOG_ENV, level.to_string())
            .env(WORKER_INDEX_ENV, partition.index.to_string());
        command
    }
}
