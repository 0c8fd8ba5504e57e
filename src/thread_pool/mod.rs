use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use log::{debug, error};
use serde::Serialize;

use crate::Result;

/// A unit of work: an owned, zero-argument closure run exactly once.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A thread pool for executing jobs concurrently.
///
/// Implementors manage a fixed set of worker threads and run submitted
/// jobs in submission order, at most one job per worker at a time.
pub trait ThreadPool {
    /// Creates a new thread pool with the given number of threads.
    ///
    /// Zero threads is allowed: the pool then rejects every job with
    /// [`PoolError::NoWorkers`](crate::PoolError::NoWorkers).
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created (e.g., a worker
    /// thread fails to spawn).
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Schedules a function to run on one of the threads in the pool.
    ///
    /// Never blocks, even when every worker is busy.
    ///
    /// # Errors
    ///
    /// Returns an error, and drops `job` unrun, if the pool is shutting
    /// down or has no worker threads.
    fn schedule<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static;

    /// Blocks until the queue is empty and no worker is running a job.
    ///
    /// Returns immediately if the pool is already quiescent. Must not be
    /// called from inside a job: the calling job counts as active, so the
    /// pool can never become quiescent.
    fn wait(&self);

    /// Returns a snapshot of the pool's counters.
    fn stats(&self) -> PoolStats;
}

/// A point-in-time view of a pool, taken under its lock.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Number of worker threads.
    pub workers: usize,
    /// Jobs scheduled but not yet picked up by a worker.
    pub queued: usize,
    /// Workers currently running a job.
    pub active: usize,
    /// Jobs that ran to completion.
    pub completed: u64,
    /// Jobs that panicked.
    pub panicked: u64,
}

/// Where a pool is in its life.
///
/// ```text
///  Running --(shutdown)--> Draining --(all threads joined)--> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Accepting and running jobs.
    Running,
    /// No longer accepting jobs; workers finish what they hold and exit.
    Draining,
    /// Every thread has been joined.
    Stopped,
}

mod dispatcher;
mod rayon_pool;
mod shared_queue;

pub use self::dispatcher::DispatcherThreadPool;
pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;

/// Locks a pool mutex.
///
/// Jobs never run while the lock is held, so a poisoned lock only means a
/// panic in pool code itself; the state is still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs one job on worker `id`, containing any panic.
///
/// Returns `true` if the job completed normally.
pub(crate) fn run_job(id: usize, job: Job) -> bool {
    debug!("Worker {id} executing job");
    // Catch panics so the worker loop continues
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("Worker {id} job panicked, continuing");
        return false;
    }
    true
}

/// Joins every handle in `handles`, leaving it empty.
///
/// The handle list stays locked until all joins finish, so a second
/// concurrent caller returns only after every thread is gone.
pub(crate) fn join_all(handles: &Mutex<Vec<JoinHandle<()>>>) {
    let mut handles = lock(handles);
    for handle in handles.drain(..) {
        let name = handle.thread().name().unwrap_or("<unnamed>").to_owned();
        if handle.join().is_err() {
            error!("Thread {name} panicked outside of a job");
        }
    }
}
