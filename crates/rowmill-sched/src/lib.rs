//! # rowmill-sched
//!
//! Fatigue-aware thread pool for the rowmill engine.
//!
//! Each pooled worker tracks how long it has spent running tasks; its
//! fatigue is that busy time scaled by a per-worker factor drawn at
//! construction. Dispatch always picks the least-fatigued idle worker, so
//! over time the pool behaves like a weighted round-robin where cheap
//! workers absorb more of the load.
//!
//! The executor guarantees:
//! - every submitted task runs exactly once;
//! - [`TiredExecutor::submit_all`] returns only after all of its tasks have
//!   finished;
//! - [`TiredExecutor::shutdown`] returns only after every worker thread has
//!   exited.

mod error;
mod executor;
mod idle;
mod worker;

pub use error::SchedError;
pub use executor::{ExecutorConfig, FatiguePolicy, TiredExecutor, WorkerReport};
pub use worker::{Task, TiredWorker, WorkerStats};
