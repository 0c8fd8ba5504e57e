use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use log::{debug, info};
use serde::Serialize;

use crate::thread_pool::{PoolStats, ThreadPool};
use crate::{PoolError, Result};

/// Sample input summed by the `sum` command when no values are given.
pub const SAMPLE_DATA: [i64; 15] = [100, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// Outcome of [`sum_chunks`].
#[derive(Debug, Serialize)]
pub struct SumReport {
    /// Sum over all chunks.
    pub total: i64,
    /// Number of chunks actually scheduled.
    pub chunks: usize,
    /// Pool counters once every chunk finished.
    pub stats: PoolStats,
}

/// Sums `data` by splitting it into at most `chunks` contiguous ranges and
/// summing each range as a separate job.
///
/// Partial sums travel back over a channel and are combined after
/// [`ThreadPool::wait`] returns.
///
/// # Errors
///
/// Returns an error if the pool rejects a job, a chunk never reports back
/// (its job panicked), or the sum overflows `i64`.
pub fn sum_chunks<P: ThreadPool>(pool: &P, data: &[i64], chunks: usize) -> Result<SumReport> {
    let data: Arc<[i64]> = Arc::from(data);
    let chunk_size = data.len().div_ceil(chunks.max(1)).max(1);
    let (tx, rx) = channel::unbounded();

    let mut scheduled = 0;
    for (index, start) in (0..data.len()).step_by(chunk_size).enumerate() {
        let end = (start + chunk_size).min(data.len());
        let data = Arc::clone(&data);
        let tx = tx.clone();
        pool.schedule(move || {
            let sum = checked_sum(data[start..end].iter().copied());
            // The receiver outlives every job; a failed send cannot happen.
            let _ = tx.send((index, sum));
        })?;
        scheduled += 1;
    }
    drop(tx);

    pool.wait();

    let partials: Vec<(usize, Option<i64>)> = rx.try_iter().collect();
    if partials.len() != scheduled {
        return Err(PoolError::StringError(format!(
            "{} of {} chunks did not report a sum",
            scheduled - partials.len(),
            scheduled
        )));
    }
    for (index, sum) in &partials {
        debug!("Chunk {index} summed to {sum:?}");
    }

    let total = partials
        .iter()
        .try_fold(0i64, |total, (_, sum)| total.checked_add((*sum)?))
        .ok_or_else(|| PoolError::StringError("sum overflows i64".to_owned()))?;

    Ok(SumReport {
        total,
        chunks: scheduled,
        stats: pool.stats(),
    })
}

fn checked_sum(values: impl Iterator<Item = i64>) -> Option<i64> {
    values.fold(Some(0i64), |total, value| total?.checked_add(value))
}

/// A named smoke check exercising one pool behaviour.
///
/// Every check builds its pool with the thread count it is given (the
/// binary's `--threads`, defaulting to the CPU count) rather than a fixed
/// four workers, and sleeps in the 10 to 100 ms range so a full run stays
/// short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Ten jobs with staggered sleeps, then wait.
    Simple,
    /// One job, then sleep instead of waiting.
    SingleThreadNoWait,
    /// One slow job, then drop the pool without waiting.
    SingleThreadSingleWait,
    /// Wait twice on a pool that never got a job.
    NoThreadsDoubleWait,
    /// Wait on a batch, then schedule and wait again.
    ReuseThreadPool,
}

impl Scenario {
    /// Every scenario, in the order `--all` runs them.
    pub const ALL: [Scenario; 5] = [
        Scenario::NoThreadsDoubleWait,
        Scenario::ReuseThreadPool,
        Scenario::Simple,
        Scenario::SingleThreadNoWait,
        Scenario::SingleThreadSingleWait,
    ];

    /// The flag-style name of the scenario.
    pub fn name(self) -> &'static str {
        match self {
            Scenario::Simple => "simple",
            Scenario::SingleThreadNoWait => "single-thread-no-wait",
            Scenario::SingleThreadSingleWait => "single-thread-single-wait",
            Scenario::NoThreadsDoubleWait => "no-threads-double-wait",
            Scenario::ReuseThreadPool => "reuse-thread-pool",
        }
    }
}

/// Outcome of one [`Scenario`].
#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: &'static str,
    /// Worker threads the pool was built with.
    pub threads: u32,
    /// Wall-clock time including pool teardown.
    pub elapsed_ms: u128,
    /// Pool counters just before teardown.
    pub stats: PoolStats,
}

/// Runs `scenario` against a fresh pool of type `P` with `threads` workers.
///
/// # Errors
///
/// Returns an error if the pool cannot be built or rejects a job.
pub fn run_scenario<P: ThreadPool>(scenario: Scenario, threads: u32) -> Result<ScenarioReport> {
    info!("Running scenario {}", scenario.name());
    let start = Instant::now();
    let pool = P::new(threads)?;

    match scenario {
        Scenario::Simple => {
            for id in 0..10u64 {
                pool.schedule(move || {
                    info!("Job {id} has started");
                    sleep_ms((id % 3) * 10);
                    info!("Job {id} has finished");
                })?;
            }
            pool.wait();
        }
        Scenario::SingleThreadNoWait => {
            pool.schedule(|| info!("This is a test."))?;
            sleep_ms(100);
        }
        Scenario::SingleThreadSingleWait => {
            pool.schedule(|| {
                info!("This is a test.");
                sleep_ms(100);
            })?;
        }
        Scenario::NoThreadsDoubleWait => {
            pool.wait();
            pool.wait();
        }
        Scenario::ReuseThreadPool => {
            for _ in 0..16 {
                pool.schedule(|| {
                    info!("This is a test.");
                    sleep_ms(50);
                })?;
            }
            pool.wait();
            pool.schedule(|| {
                info!("This is a code.");
                sleep_ms(100);
            })?;
            pool.wait();
        }
    }

    let stats = pool.stats();
    drop(pool);

    Ok(ScenarioReport {
        scenario: scenario.name(),
        threads,
        elapsed_ms: start.elapsed().as_millis(),
        stats,
    })
}

fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}
