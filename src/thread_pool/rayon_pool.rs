use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::{join_all, lock, run_job, PoolStats, ThreadPool};
use crate::{PoolError, Result};

/// A thread pool backed by the `rayon` library.
///
/// Uses rayon's work-stealing scheduler for task distribution, so jobs
/// are not guaranteed to start in submission order. Completion is tracked
/// on the side to give [`wait`](ThreadPool::wait) the same meaning as for
/// the other pools. Worker threads are spawned here rather than by rayon
/// so that dropping the pool can wait for outstanding jobs and then join
/// every thread.
pub struct RayonThreadPool {
    /// Taken on drop so rayon's registry terminates before the joins.
    pool: Option<rayon::ThreadPool>,
    workers: usize,
    tracker: Arc<Tracker>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Default)]
struct Tracker {
    counts: Mutex<Counts>,
    quiescent: Condvar,
}

#[derive(Default)]
struct Counts {
    queued: usize,
    active: usize,
    completed: u64,
    panicked: u64,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: u32) -> Result<Self> {
        let workers = threads as usize;
        let mut handles = Vec::with_capacity(workers.max(1));
        // rayon reads zero as "pick a default", so keep one idle thread and
        // reject jobs instead.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|id| format!("rayon-worker-{id}"))
            .spawn_handler(|worker| {
                let mut builder = thread::Builder::new();
                if let Some(name) = worker.name() {
                    builder = builder.name(name.to_owned());
                }
                handles.push(builder.spawn(move || worker.run())?);
                Ok(())
            })
            .build()
            .map_err(|e| PoolError::StringError(e.to_string()))?;
        Ok(RayonThreadPool {
            pool: Some(pool),
            workers,
            tracker: Arc::default(),
            handles: Mutex::new(handles),
        })
    }

    fn schedule<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(pool) = &self.pool else {
            return Err(PoolError::ShutDown);
        };
        if self.workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        lock(&self.tracker.counts).queued += 1;

        let tracker = Arc::clone(&self.tracker);
        pool.spawn(move || {
            {
                let mut counts = lock(&tracker.counts);
                counts.queued -= 1;
                counts.active += 1;
            }
            let ok = run_job(rayon::current_thread_index().unwrap_or_default(), Box::new(job));

            let mut counts = lock(&tracker.counts);
            counts.active -= 1;
            if ok {
                counts.completed += 1;
            } else {
                counts.panicked += 1;
            }
            if counts.queued == 0 && counts.active == 0 {
                tracker.quiescent.notify_all();
            }
        });
        Ok(())
    }

    fn wait(&self) {
        let counts = lock(&self.tracker.counts);
        let _counts = self
            .tracker
            .quiescent
            .wait_while(counts, |counts| counts.queued > 0 || counts.active > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn stats(&self) -> PoolStats {
        let counts = lock(&self.tracker.counts);
        PoolStats {
            workers: self.workers,
            queued: counts.queued,
            active: counts.active,
            completed: counts.completed,
            panicked: counts.panicked,
        }
    }
}

impl Drop for RayonThreadPool {
    fn drop(&mut self) {
        self.wait();
        // Dropping the rayon pool only asks its threads to stop.
        drop(self.pool.take());
        join_all(&self.handles);
    }
}
