//! Error types for the scheduling layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("invalid worker count: {0}")]
    InvalidWorkerCount(usize),

    #[error("expected {expected} fatigue factors, got {actual}")]
    FatigueFactorCount { expected: usize, actual: usize },

    #[error("fatigue factor {0} must be finite and positive")]
    InvalidFatigueFactor(f64),

    #[error("worker {0} is not ready to accept a task")]
    WorkerNotReady(usize),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
