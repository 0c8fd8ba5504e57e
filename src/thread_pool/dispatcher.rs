use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use super::{join_all, lock, run_job, Job, Lifecycle, PoolStats, ThreadPool};
use crate::{PoolError, Result};

/// A thread pool where a dispatcher thread hands each job to a chosen
/// idle worker.
///
/// Every worker owns a slot and a private condition variable. The
/// dispatcher binds the front job to the lowest-numbered idle slot and
/// wakes only that worker, so a new job never wakes the whole pool.
/// Admission is bounded by the number of idle slots: the dispatcher
/// parks while every worker is occupied.
///
/// All state, including every slot, is guarded by one mutex. Shutdown
/// behaves exactly like [`SharedQueueThreadPool`](super::SharedQueueThreadPool):
/// dropping drains, [`shutdown_now`](Self::shutdown_now) discards.
pub struct DispatcherThreadPool {
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

struct Shared {
    state: Mutex<State>,
    /// Wakes the dispatcher: a job arrived, a worker went idle, or shutdown.
    dispatch: Condvar,
    /// Signalled when the pool may have become quiescent.
    quiescent: Condvar,
    /// Private wake signal per worker, indexed like `State::slots`.
    wake: Vec<Condvar>,
}

#[derive(Default)]
struct Slot {
    /// Set by the dispatcher on bind, cleared by the worker when the job ends.
    occupied: bool,
    /// The bound job; taken by the worker just before it runs.
    job: Option<Job>,
}

struct State {
    queue: VecDeque<Job>,
    slots: Vec<Slot>,
    active: usize,
    completed: u64,
    panicked: u64,
    lifecycle: Lifecycle,
}

impl State {
    fn is_quiescent(&self) -> bool {
        self.queue.is_empty() && self.active == 0
    }

    /// Once true this stays true: a stopping pool never queues again.
    fn may_exit(&self) -> bool {
        self.lifecycle != Lifecycle::Running && self.queue.is_empty()
    }

    fn idle_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| !slot.occupied)
    }

    fn can_dispatch(&self) -> bool {
        !self.queue.is_empty() && self.idle_slot().is_some()
    }

    fn check_active(&self) {
        debug_assert_eq!(
            self.active,
            self.slots.iter().filter(|slot| slot.occupied).count()
        );
    }
}

impl ThreadPool for DispatcherThreadPool {
    fn new(threads: u32) -> Result<Self> {
        let threads = threads as usize;
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                slots: (0..threads).map(|_| Slot::default()).collect(),
                active: 0,
                completed: 0,
                panicked: 0,
                lifecycle: Lifecycle::Running,
            }),
            dispatch: Condvar::new(),
            quiescent: Condvar::new(),
            wake: (0..threads).map(|_| Condvar::new()).collect(),
        });

        let pool = DispatcherThreadPool {
            shared,
            handles: Mutex::new(Vec::with_capacity(threads + 1)),
        };
        for id in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("pool-worker-{id}"))
                .spawn(move || run_worker(id, &shared))?;
            lock(&pool.handles).push(handle);
        }
        let shared = Arc::clone(&pool.shared);
        let handle = thread::Builder::new()
            .name("pool-dispatcher".to_owned())
            .spawn(move || run_dispatcher(&shared))?;
        lock(&pool.handles).push(handle);

        info!("Started dispatcher pool with {threads} workers");
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
        if state.slots.is_empty() {
            return Err(PoolError::NoWorkers);
        }
        state.queue.push_back(Box::new(job));
        drop(state);

        self.shared.dispatch.notify_one();
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
            workers: state.slots.len(),
            queued: state.queue.len(),
            active: state.active,
            completed: state.completed,
            panicked: state.panicked,
        }
    }
}

impl DispatcherThreadPool {
    /// Stops accepting jobs, runs everything already queued, then joins
    /// every worker and the dispatcher.
    ///
    /// Calling it again is a no-op. Must not be called from inside a job.
    pub fn shutdown(&self) {
        self.stop(false);
    }

    /// Stops accepting jobs and discards the ones not yet bound to a
    /// worker. Jobs already bound or running still finish.
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
            info!("Shutting down dispatcher pool");
            state.lifecycle = Lifecycle::Draining;
        }
        drop(state);

        let count = discarded.len();
        drop(discarded);
        if count > 0 {
            warn!("Discarded {count} queued jobs at shutdown");
        }

        self.shared.dispatch.notify_all();
        for wake in &self.shared.wake {
            wake.notify_all();
        }
        self.shared.quiescent.notify_all();
        join_all(&self.handles);

        lock(&self.shared.state).lifecycle = Lifecycle::Stopped;
        count
    }
}

impl Drop for DispatcherThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Dispatcher loop: bind queued jobs to idle slots until the pool stops
/// and the queue is empty.
fn run_dispatcher(shared: &Shared) {
    let mut state = lock(&shared.state);
    loop {
        state = shared
            .dispatch
            .wait_while(state, |state| !state.may_exit() && !state.can_dispatch())
            .unwrap_or_else(PoisonError::into_inner);

        // Draining still dispatches; only an empty queue ends the loop.
        let Some(id) = state.idle_slot().filter(|_| !state.queue.is_empty()) else {
            break;
        };
        let Some(job) = state.queue.pop_front() else {
            break;
        };
        let slot = &mut state.slots[id];
        slot.job = Some(job);
        slot.occupied = true;
        state.active += 1;
        state.check_active();
        shared.wake[id].notify_one();
        debug!("Dispatcher bound job to worker {id}");
    }
    drop(state);

    // Idle workers parked while the queue was still draining.
    for wake in &shared.wake {
        wake.notify_all();
    }
    debug!("Dispatcher: queue closed, shutting down");
}

/// Worker loop: park on the private signal until a job is bound, run it,
/// then free the slot.
fn run_worker(id: usize, shared: &Shared) {
    let mut state = lock(&shared.state);
    loop {
        state = shared.wake[id]
            .wait_while(state, |state| {
                state.slots[id].job.is_none() && !state.may_exit()
            })
            .unwrap_or_else(PoisonError::into_inner);

        let Some(job) = state.slots[id].job.take() else {
            break;
        };
        drop(state);

        let ok = run_job(id, job);

        state = lock(&shared.state);
        state.slots[id].occupied = false;
        state.active -= 1;
        if ok {
            state.completed += 1;
        } else {
            state.panicked += 1;
        }
        state.check_active();
        shared.dispatch.notify_one();
        if state.is_quiescent() {
            shared.quiescent.notify_all();
        }
    }
    drop(state);
    debug!("Worker {id}: shutting down");
}
