//! End-to-end runs of the broker against the real `nocturne-worker` binary.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use nocturne_broker::{
    Broker, BrokerError, FailurePolicy, PartitionFailure, ProcessLauncher, RunConfig,
};
use nocturne_pipeline::{FilterParams, Partition, Raster, Rgb, process_local};
use nocturne_protocol::{WORKER_INDEX_ENV, WORKER_LOG_ENV, read_reply, write_request};

const WORKER: &str = env!("CARGO_BIN_EXE_nocturne-worker");

fn launcher() -> ProcessLauncher {
    ProcessLauncher::new(WORKER).with_log_level(log::LevelFilter::Warn)
}

fn photo(width: u32, height: u32) -> Raster {
    let mut state: u32 = 0x9e37_79b9;
    Raster::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb::new(r, g, b)
    })
    .unwrap()
}

#[test]
fn pool_matches_single_process_chain() {
    let raster = photo(31, 9);
    for workers in 1..=3 {
        let config = RunConfig {
            workers,
            ..RunConfig::default()
        };
        let output = Broker::run(&raster, config.clone(), &launcher()).unwrap();
        assert!(output.is_complete(), "workers = {workers}");
        assert_eq!(
            output.stages,
            process_local(&raster, config.params, workers).unwrap(),
            "workers = {workers}"
        );
    }
}

#[test]
fn identity_params_reproduce_the_source() {
    let raster = photo(12, 5);
    let config = RunConfig {
        params: FilterParams {
            saturation_factor: 1.0,
            binarize_threshold: 0.5,
        },
        workers: 4,
        ..RunConfig::default()
    };
    let output = Broker::run(&raster, config, &launcher()).unwrap();
    assert_eq!(output.stages.saturated, raster);
}

#[test]
fn many_workers_on_a_wide_image() {
    // Replies larger than a pipe buffer must not stall the run.
    let raster = photo(600, 200);
    let config = RunConfig {
        workers: 3,
        ..RunConfig::default()
    };
    let output = Broker::run(&raster, config.clone(), &launcher()).unwrap();
    assert_eq!(
        output.stages,
        process_local(&raster, config.params, config.workers).unwrap()
    );
}

#[cfg(unix)]
#[test]
fn failed_partition_is_reported_by_index() {
    let raster = photo(10, 4);
    let real = launcher();
    let flaky = |p: &Partition| {
        if p.index == 1 {
            let mut c = Command::new("sh");
            c.args(["-c", "cat > /dev/null; exit 3"]);
            c
        } else {
            nocturne_broker::WorkerLauncher::command(&real, p)
        }
    };

    let aborted = RunConfig {
        workers: 3,
        ..RunConfig::default()
    };
    let Err(BrokerError::PartitionsFailed { failures, .. }) =
        Broker::run(&raster, aborted.clone(), &flaky)
    else {
        panic!("expected the run to abort");
    };
    let indices: Vec<usize> = failures.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, [1]);

    let tolerated = RunConfig {
        failure_policy: FailurePolicy::Tolerate,
        ..aborted
    };
    let output = Broker::run(&raster, tolerated.clone(), &flaky).unwrap();
    assert!(!output.is_complete());
    let reference = process_local(&raster, tolerated.params, 3).unwrap();
    let failed = output.partitions[1].columns();
    for y in 0..raster.height() {
        for x in 0..raster.width() {
            let expected = if failed.contains(&x) {
                Rgb::BLACK
            } else {
                reference.binarized.get(x, y).unwrap()
            };
            assert_eq!(output.stages.binarized.get(x, y), Some(expected), "({x}, {y})");
        }
    }
}

#[cfg(unix)]
#[test]
fn hung_worker_is_killed() {
    let real = launcher();
    let stuck = |p: &Partition| {
        if p.index == 0 {
            let mut c = Command::new("sh");
            c.args(["-c", "exec sleep 30"]);
            c
        } else {
            nocturne_broker::WorkerLauncher::command(&real, p)
        }
    };
    let config = RunConfig {
        workers: 2,
        failure_policy: FailurePolicy::Tolerate,
        worker_timeout: Some(Duration::from_millis(500)),
        ..RunConfig::default()
    };
    let output = Broker::run(&photo(8, 8), config, &stuck).unwrap();
    assert!(matches!(
        output.failures.as_slice(),
        [(0, PartitionFailure::TimedOut { .. })]
    ));
    assert_eq!(output.processed(), 1);
}

#[test]
fn worker_binary_answers_one_request() {
    let raster = photo(5, 3);
    let params = FilterParams::default();
    let mut request = Vec::new();
    write_request(&mut request, &raster, params).unwrap();

    let mut child = Command::new(WORKER)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(&request).unwrap();
    let out = child.wait_with_output().unwrap();

    assert!(out.status.success());
    let reply = read_reply(&mut out.stdout.as_slice()).unwrap();
    assert_eq!(reply, process_local(&raster, params, 1).unwrap());
}

#[test]
fn worker_binary_fails_on_truncated_request() {
    let mut request = Vec::new();
    write_request(&mut request, &photo(5, 3), FilterParams::default()).unwrap();
    request.truncate(request.len() / 2);

    let mut child = Command::new(WORKER)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(&request).unwrap();
    let out = child.wait_with_output().unwrap();

    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn worker_binary_logs_to_stderr_only() {
    let raster = photo(4, 2);
    let params = FilterParams::default();
    let mut request = Vec::new();
    write_request(&mut request, &raster, params).unwrap();

    let mut child = Command::new(WORKER)
        .env(WORKER_LOG_ENV, "debug")
        .env(WORKER_INDEX_ENV, "7")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(&request).unwrap();
    let out = child.wait_with_output().unwrap();

    assert!(out.status.success());
    let log = String::from_utf8_lossy(&out.stderr);
    assert!(log.contains("worker 7: replied"), "stderr was {log:?}");
    assert!(!log.contains("logging disabled"));
    let reply = read_reply(&mut out.stdout.as_slice()).unwrap();
    assert_eq!(reply, process_local(&raster, params, 1).unwrap());
}

#[test]
fn worker_binary_logs_its_failure() {
    let mut child = Command::new(WORKER)
        .env(WORKER_INDEX_ENV, "2")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"BM").unwrap();
    let out = child.wait_with_output().unwrap();

    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("worker 2:"));
}
