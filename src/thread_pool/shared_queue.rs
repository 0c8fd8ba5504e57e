use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use super::{join_all, lock, run_job, Job, Lifecycle, PoolStats, ThreadPool};
use crate::{PoolError, Result};

/// A thread pool using a shared job queue.
///
/// Idle workers pull the next job from the front of a single queue
/// themselves. The queue, the per-worker occupancy flags and the
/// lifecycle all sit behind one mutex, so the "queue empty and nobody
/// busy" check made by [`wait`](ThreadPool::wait) is atomic with respect
/// to both [`schedule`](ThreadPool::schedule) and job completion.
///
/// Dropping the pool drains it: queued jobs still run before the workers
/// are joined. Use [`shutdown_now`](Self::shutdown_now) to discard the
/// backlog instead.
pub struct SharedQueueThreadPool {
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

struct Shared {
    state: Mutex<State>,
    /// Signalled when a job is queued or shutdown begins.
    available: Condvar,
    /// Signalled when the pool may have become quiescent.
    quiescent: Condvar,
}

struct State {
    queue: VecDeque<Job>,
    /// One flag per worker; `true` while that worker runs a job.
    occupied: Vec<bool>,
    active: usize,
    completed: u64,
    panicked: u64,
    lifecycle: Lifecycle,
}

impl State {
    fn is_quiescent(&self) -> bool {
        self.queue.is_empty() && self.active == 0
    }

    fn check_active(&self) {
        debug_assert_eq!(
            self.active,
            self.occupied.iter().filter(|busy| **busy).count()
        );
    }
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(threads: u32) -> Result<Self> {
        let threads = threads as usize;
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                occupied: vec![false; threads],
                active: 0,
                completed: 0,
                panicked: 0,
                lifecycle: Lifecycle::Running,
            }),
            available: Condvar::new(),
            quiescent: Condvar::new(),
        });

        // On a spawn error the partially built pool is dropped, which joins
        // the workers already running.
        let pool = SharedQueueThreadPool {
            shared,
            handles: Mutex::new(Vec::with_capacity(threads)),
        };
        for id in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("pool-worker-{id}"))
                .spawn(move || run_worker(id, &shared))?;
            lock(&pool.handles).push(handle);
        }

        info!("Started shared-queue pool with {threads} workers");
        Ok(pool)
    }

    fn schedule<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = lock(&self.shared.state);
        if state.lifecycle != Lifecycle::Running {
            return Err(PoolError::ShutDown);
        }
        if state.occupied.is_empty() {
            return Err(PoolError::NoWorkers);
        }
        state.queue.push_back(Box::new(job));
        drop(state);

        self.shared.available.notify_one();
        Ok(())
    }

    fn wait(&self) {
        let state = lock(&self.shared.state);
        let _state = self
            .shared
            .quiescent
            .wait_while(state, |state| !state.is_quiescent())
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn stats(&self) -> PoolStats {
        let state = lock(&self.shared.state);
        PoolStats {
            workers: state.occupied.len(),
            queued: state.queue.len(),
            active: state.active,
            completed: state.completed,
            panicked: state.panicked,
        }
    }
}

impl SharedQueueThreadPool {
    /// Stops accepting jobs, runs everything already queued, then joins
    /// every worker.
    ///
    /// Calling it again is a no-op. Must not be called from inside a job.
    pub fn shutdown(&self) {
        self.stop(false);
    }

    /// Stops accepting jobs, discards the ones still queued, lets running
    /// jobs finish, then joins every worker.
    ///
    /// Returns the number of discarded jobs.
    pub fn shutdown_now(&self) -> usize {
        self.stop(true)
    }

    /// Returns where the pool is in its lifecycle.
    pub fn lifecycle(&self) -> Lifecycle {
        lock(&self.shared.state).lifecycle
    }

    fn stop(&self, discard: bool) -> usize {
        let mut state = lock(&self.shared.state);
        let discarded = if discard {
            mem::take(&mut state.queue)
        } else {
            VecDeque::new()
        };
        if state.lifecycle == Lifecycle::Running {
            info!("Shutting down shared-queue pool");
            state.lifecycle = Lifecycle::Draining;
        }
        drop(state);

        // Dropped outside the lock: a job's captures may run arbitrary code.
        let count = discarded.len();
        drop(discarded);
        if count > 0 {
            warn!("Discarded {count} queued jobs at shutdown");
        }

        self.shared.available.notify_all();
        self.shared.quiescent.notify_all();
        join_all(&self.handles);

        lock(&self.shared.state).lifecycle = Lifecycle::Stopped;
        count
    }
}

impl Drop for SharedQueueThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop: take the front job, run it outside the lock, report back.
///
/// Exits once the pool is no longer running and the queue is empty.
fn run_worker(id: usize, shared: &Shared) {
    let mut state = lock(&shared.state);
    loop {
        state = shared
            .available
            .wait_while(state, |state| {
                state.queue.is_empty() && state.lifecycle == Lifecycle::Running
            })
            .unwrap_or_else(PoisonError::into_inner);

        let Some(job) = state.queue.pop_front() else {
            break;
        };
        state.occupied[id] = true;
        state.active += 1;
        state.check_active();
        drop(state);

        let ok = run_job(id, job);

        state = lock(&shared.state);
        state.occupied[id] = false;
        state.active -= 1;
        if ok {
            state.completed += 1;
        } else {
            state.panicked += 1;
        }
        state.check_active();
        if state.is_quiescent() {
            shared.quiescent.notify_all();
        }
    }
    drop(state);
    debug!("Worker {id}: queue closed, shutting down");
}
