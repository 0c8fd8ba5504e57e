use std::io;
use thiserror::Error;

/// Error type for thread pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// IO error, e.g. the OS refused to spawn a worker thread.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error while writing a report.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The pool has begun shutting down and accepts no more tasks.
    #[error("Thread pool is shutting down")]
    ShutDown,

    /// The pool was built with zero workers, so a task could never run.
    #[error("Thread pool has no worker threads")]
    NoWorkers,

    /// Error with a string message.
    #[error("{0}")]
    StringError(String),
}

/// Result type alias for thread pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
