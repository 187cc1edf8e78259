//! A single run of the worker pool, advanced one step at a time.
//!
//! ```no_run
//! # use nocturne_broker::{Broker, BrokerError, ProcessLauncher, RunConfig};
//! # use nocturne_pipeline::Raster;
//! # fn go(raster: &Raster) -> Result<(), BrokerError> {
//! let launcher = ProcessLauncher::new("target/release/nocturne-worker");
//! let output = Broker::new(raster, RunConfig::default())
//!     .partition()?
//!     .spawn(&launcher)?
//!     .send()
//!     .collect()
//!     .assemble()?
//!     .into_output();
//! assert!(output.is_complete());
//! # Ok(())
//! # }
//! ```
//!
//! Each step consumes `self` and returns the next state, so a run cannot
//! be resumed twice or skip a step. Workers are started with piped stdin
//! and stdout. Every worker gets a writer thread for its request and a
//! drain thread for its reply, so neither a worker that never reads nor
//! one blocked on a full stdout pipe can stall the broker itself. A
//! `worker_timeout` is measured from spawn and covers both directions.
//!
//! Dropping any state that still owns workers kills and reaps them.

use std::io::{self, BufWriter, Read};
use std::process::{Child, ChildStdin, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nocturne_pipeline::{
    ChainOutput, Dimensions, FilterParams, Partition, Raster, assemble_available, partition,
};
use nocturne_protocol::{ProtocolError, decode_reply, write_request};

use crate::config::{FailurePolicy, RunConfig};
use crate::error::{BrokerError, PartitionFailure};
use crate::launcher::WorkerLauncher;

/// Poll interval while waiting on a worker under a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of one partition once its worker has been reaped.
pub type Outcome = Result<ChainOutput, PartitionFailure>;

// ───────────────────────── worker handle ──────────────────────────

/// A running worker, its request, and the threads feeding and draining it.
struct WorkerHandle {
    index: usize,
    child: Child,
    stdin: Option<ChildStdin>,
    fragment: Option<Raster>,
    writer: Option<JoinHandle<Result<(), ProtocolError>>>,
    drain: Option<JoinHandle<io::Result<Vec<u8>>>>,
    reaped: bool,
}

impl WorkerHandle {
    fn start(index: usize, mut child: Child, fragment: Raster) -> Self {
        let stdin = child.stdin.take();
        let drain = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut reply = Vec::new();
                stdout.read_to_end(&mut reply).map(|_| reply)
            })
        });
        Self {
            index,
            child,
            stdin,
            fragment: Some(fragment),
            writer: None,
            drain,
            reaped: false,
        }
    }

    /// Hand the request to a writer thread, which closes stdin when done.
    fn send(&mut self, params: FilterParams) {
        let (Some(stdin), Some(fragment)) = (self.stdin.take(), self.fragment.take()) else {
            return;
        };
        let index = self.index;
        self.writer = Some(thread::spawn(move || {
            let mut channel = BufWriter::new(stdin);
            let result = write_request(&mut channel, &fragment, params);
            match &result {
                Ok(()) => log::debug!(
                    "sent {} fragment to worker {index}",
                    fragment.dimensions()
                ),
                Err(e) => log::warn!("sending to worker {index} failed: {e}"),
            }
            result
        }));
    }

    /// How writing the request ended. Only called once the worker has
    /// exited, so the writer has either finished or hit a closed pipe.
    fn request(&mut self) -> Result<(), ProtocolError> {
        let writer = self.writer.take().ok_or(ProtocolError::Truncated {
            what: "request channel",
        })?;
        writer
            .join()
            .map_err(|_| ProtocolError::Io(io::Error::other("request writer thread panicked")))?
    }

    /// Wait for the worker to exit, killing it at `deadline`.
    fn wait(&mut self, deadline: Option<(Instant, Duration)>) -> Result<ExitStatus, PartitionFailure> {
        let Some((deadline, limit)) = deadline else {
            let status = self.child.wait().map_err(PartitionFailure::Wait)?;
            self.reaped = true;
            return Ok(status);
        };
        loop {
            if let Some(status) = self.child.try_wait().map_err(PartitionFailure::Wait)? {
                self.reaped = true;
                return Ok(status);
            }
            let now = Instant::now();
            if now >= deadline {
                log::warn!("worker {} still running after {limit:?}, killing it", self.index);
                self.kill();
                return Err(PartitionFailure::TimedOut { after: limit });
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Everything the worker wrote to stdout.
    fn reply(&mut self) -> Result<Vec<u8>, PartitionFailure> {
        let drain = self.drain.take().ok_or(ProtocolError::Truncated { what: "reply" })?;
        let reply = drain
            .join()
            .map_err(|_| ProtocolError::Io(io::Error::other("reply reader thread panicked")))?
            .map_err(ProtocolError::Io)?;
        Ok(reply)
    }

    fn kill(&mut self) {
        if self.reaped {
            return;
        }
        // Either call fails only if the child is already gone.
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.reaped = true;
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stdin.take();
        self.kill();
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Run state before anything has been checked or started.
#[must_use = "broker runs are consumed by advancing: call .partition() to continue"]
pub struct Pending<'a> {
    raster: &'a Raster,
    config: RunConfig,
}

impl<'a> Pending<'a> {
    /// The configuration this run will use.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Validate the configuration against the image and split it into
    /// one column range per worker.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Config`] if the configuration is invalid or
    /// asks for more workers than the image has columns.
    pub fn partition(self) -> Result<Partitioned<'a>, BrokerError> {
        self.config.validate()?;
        let partitions = partition(self.raster.width(), self.config.workers)?;
        log::debug!(
            "split {} image into {} partitions",
            self.raster.dimensions(),
            partitions.len()
        );
        Ok(Partitioned {
            raster: self.raster,
            config: self.config,
            partitions,
        })
    }
}

// ───────────────────────── Stage 1: Partitioned ──────────────────────────

/// Run state with column ranges computed and no processes started.
#[must_use = "broker runs are consumed by advancing: call .spawn() to continue"]
pub struct Partitioned<'a> {
    raster: &'a Raster,
    config: RunConfig,
    partitions: Vec<Partition>,
}

impl Partitioned<'_> {
    /// One partition per worker, in index order.
    #[must_use]
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Start one worker per partition. A `worker_timeout` starts counting
    /// here.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Config`] if a partition does not fit the
    /// image, and [`BrokerError::Spawn`] if any worker fails to start. The
    /// workers started before it are killed and reaped first.
    pub fn spawn<L>(self, launcher: &L) -> Result<Spawned, BrokerError>
    where
        L: WorkerLauncher + ?Sized,
    {
        let fragments = self
            .partitions
            .iter()
            .map(|p| self.raster.crop_columns(p.columns()))
            .collect::<Result<Vec<_>, _>>()?;

        let started = Instant::now();
        let mut workers = Vec::with_capacity(self.partitions.len());
        for (partition, fragment) in self.partitions.iter().zip(fragments) {
            let child = launcher
                .command(partition)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|source| BrokerError::Spawn {
                    index: partition.index,
                    source,
                })?;
            log::debug!("worker {} started as pid {}", partition.index, child.id());
            workers.push(WorkerHandle::start(partition.index, child, fragment));
        }
        log::info!("started {} workers", workers.len());
        Ok(Spawned {
            dimensions: self.raster.dimensions(),
            config: self.config,
            partitions: self.partitions,
            workers,
            started,
        })
    }
}

// ───────────────────────── Stage 2: Spawned ──────────────────────────

/// Run state with every worker running and waiting for its request.
#[must_use = "broker runs are consumed by advancing: call .send() to continue"]
pub struct Spawned {
    dimensions: Dimensions,
    config: RunConfig,
    partitions: Vec<Partition>,
    workers: Vec<WorkerHandle>,
    started: Instant,
}

impl Spawned {
    /// One partition per worker, in index order.
    #[must_use]
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// OS process ids of the workers, in partition order.
    #[must_use]
    pub fn worker_ids(&self) -> Vec<u32> {
        self.workers.iter().map(|w| w.child.id()).collect()
    }

    /// Start writing every worker's request, in partition order, each on
    /// its own thread. A worker's stdin is closed once its request is
    /// written.
    ///
    /// Returns without waiting for the writes. A failed write is recorded
    /// against that partition only and surfaces from
    /// [`Sent::collect`].
    pub fn send(mut self) -> Sent {
        let params = self.config.params;
        for worker in &mut self.workers {
            worker.send(params);
        }
        Sent {
            dimensions: self.dimensions,
            config: self.config,
            partitions: self.partitions,
            workers: self.workers,
            started: self.started,
        }
    }
}

// ───────────────────────── Stage 3: Sent ──────────────────────────

/// Run state with every request in flight and the workers processing.
#[must_use = "broker runs are consumed by advancing: call .collect() to continue"]
pub struct Sent {
    dimensions: Dimensions,
    config: RunConfig,
    partitions: Vec<Partition>,
    workers: Vec<WorkerHandle>,
    started: Instant,
}

impl Sent {
    /// One partition per worker, in index order.
    #[must_use]
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// OS process ids of the workers, in partition order.
    #[must_use]
    pub fn worker_ids(&self) -> Vec<u32> {
        self.workers.iter().map(|w| w.child.id()).collect()
    }

    /// Reap every worker in partition order and decode its reply.
    ///
    /// The exit status is checked before the reply is decoded: a worker
    /// that exited unsuccessfully is reported as
    /// [`PartitionFailure::WorkerExit`] even if its request also failed
    /// to send, and one killed at the deadline as
    /// [`PartitionFailure::TimedOut`] even if it never read its request.
    /// With a `worker_timeout`, the deadline is shared by all workers and
    /// counts from spawn.
    pub fn collect(self) -> Collected {
        let Self {
            dimensions,
            config,
            partitions,
            mut workers,
            started,
        } = self;
        let deadline = config
            .worker_timeout
            .map(|limit| (started + limit, limit));

        let outcomes: Vec<Outcome> = partitions
            .iter()
            .zip(&mut workers)
            .map(|(partition, worker)| {
                let expected = Dimensions::new(partition.width(), dimensions.height);
                let outcome = finish(worker, deadline, expected);
                match &outcome {
                    Ok(_) => log::debug!("worker {} finished", partition.index),
                    Err(e) => log::warn!("partition {} failed: {e}", partition.index),
                }
                outcome
            })
            .collect();

        Collected {
            dimensions,
            config,
            partitions,
            outcomes,
        }
    }
}

fn finish(
    worker: &mut WorkerHandle,
    deadline: Option<(Instant, Duration)>,
    expected: Dimensions,
) -> Outcome {
    let status = worker.wait(deadline)?;
    if !status.success() {
        return Err(PartitionFailure::WorkerExit { status });
    }
    worker.request()?;
    let reply = worker.reply()?;
    Ok(decode_reply(&reply, expected)?)
}

// ───────────────────────── Stage 4: Collected ──────────────────────────

/// Run state with every worker reaped and every reply decoded or failed.
#[must_use = "broker runs are consumed by advancing: call .assemble() to continue"]
pub struct Collected {
    dimensions: Dimensions,
    config: RunConfig,
    partitions: Vec<Partition>,
    outcomes: Vec<Outcome>,
}

impl Collected {
    /// One partition per worker, in index order.
    #[must_use]
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Per-partition results, indexed like [`partitions`](Self::partitions).
    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Stitch the replies into full-size images, applying the
    /// configured [`FailurePolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::PartitionsFailed`] if any partition failed
    /// under [`FailurePolicy::Abort`], and [`BrokerError::Assembly`] if
    /// the replies do not fit together.
    pub fn assemble(self) -> Result<Assembled, BrokerError> {
        let total = self.partitions.len();
        let mut failures = Vec::new();
        let mut columns: [Vec<Option<Raster>>; 3] = Default::default();

        for (index, outcome) in self.outcomes.into_iter().enumerate() {
            match outcome {
                Ok(stages) => {
                    for (slot, raster) in columns.iter_mut().zip(stages.into_stages()) {
                        slot.push(Some(raster));
                    }
                }
                Err(failure) => {
                    failures.push((index, failure));
                    for slot in &mut columns {
                        slot.push(None);
                    }
                }
            }
        }

        if !failures.is_empty() && self.config.failure_policy == FailurePolicy::Abort {
            return Err(BrokerError::PartitionsFailed { total, failures });
        }

        let [saturated, greyscale, binarized] = columns;
        let stitch = |fragments: Vec<Option<Raster>>| {
            assemble_available(self.dimensions, &self.partitions, &fragments)
        };
        let stages = ChainOutput {
            saturated: stitch(saturated)?,
            greyscale: stitch(greyscale)?,
            binarized: stitch(binarized)?,
        };

        if failures.is_empty() {
            log::info!("assembled {} image from {total} partitions", self.dimensions);
        } else {
            log::warn!(
                "assembled {} image with {} of {total} partitions missing",
                self.dimensions,
                failures.len()
            );
        }

        Ok(Assembled {
            output: BrokerOutput {
                stages,
                partitions: self.partitions,
                failures,
            },
        })
    }
}

// ───────────────────────── Stage 5: Assembled ──────────────────────────

/// Final run state.
#[must_use = "call .into_output() to extract the BrokerOutput"]
pub struct Assembled {
    output: BrokerOutput,
}

impl Assembled {
    /// The assembled images.
    #[must_use]
    pub const fn stages(&self) -> &ChainOutput {
        &self.output.stages
    }

    /// Returns `true` if every partition contributed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.output.is_complete()
    }

    /// Consume the run, returning its output.
    #[must_use]
    pub fn into_output(self) -> BrokerOutput {
        self.output
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct BrokerOutput {
    /// One full-size image per chain stage.
    ///
    /// Columns of failed partitions are black.
    pub stages: ChainOutput,
    /// The partitions the image was split into.
    pub partitions: Vec<Partition>,
    /// Partitions that contributed nothing, by index. Empty unless the
    /// run used [`FailurePolicy::Tolerate`].
    pub failures: Vec<(usize, PartitionFailure)>,
}

impl BrokerOutput {
    /// Returns `true` if every partition contributed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of partitions that contributed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.partitions.len() - self.failures.len()
    }
}

// ───────────────────────── entry point ──────────────────────────

/// Entry point for a worker-pool run.
pub struct Broker;

impl Broker {
    /// Start a run over `raster`. Nothing is checked or spawned yet.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(raster: &Raster, config: RunConfig) -> Pending<'_> {
        Pending { raster, config }
    }

    /// Drive a run through every state.
    ///
    /// # Errors
    ///
    /// See [`Pending::partition`], [`Partitioned::spawn`] and
    /// [`Collected::assemble`].
    pub fn run<L>(
        raster: &Raster,
        config: RunConfig,
        launcher: &L,
    ) -> Result<BrokerOutput, BrokerError>
    where
        L: WorkerLauncher + ?Sized,
    {
        log::info!(
            "processing {} image with {} workers",
            raster.dimensions(),
            config.workers
        );
        Ok(Self::new(raster, config)
            .partition()?
            .spawn(launcher)?
            .send()
            .collect()
            .assemble()?
            .into_output())
    }
}
