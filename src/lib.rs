#![deny(missing_docs)]

//! A fixed-size worker thread pool.
//!
//! Jobs are queued in submission order and run by a bounded set of
//! long-lived worker threads. Callers can block until the pool is
//! quiescent (queue empty, no worker busy) and shut it down cleanly,
//! either draining or discarding the backlog.

mod error;
/// Demonstration workloads and smoke checks driven by the binary.
pub mod scenarios;
/// Thread pool implementations.
pub mod thread_pool;

pub use error::{PoolError, Result};
pub use thread_pool::{
    DispatcherThreadPool, Job, Lifecycle, PoolStats, RayonThreadPool, SharedQueueThreadPool,
    ThreadPool,
};
