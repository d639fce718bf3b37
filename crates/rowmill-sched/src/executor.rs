//! The fatigue-aware executor.
//!
//! A fixed pool of [`TiredWorker`]s fronted by an ordered idle set. Every
//! dispatch pops the least-fatigued idle worker, so steady-state load is
//! inversely proportional to each worker's fatigue factor: a natural
//! weighted round-robin.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rand::Rng;

use crate::error::SchedError;
use crate::idle::{IdleEntry, IdleSet};
use crate::worker::{Task, TiredWorker, WorkerShared, WorkerStats};

/// How per-worker fatigue factors are chosen at pool construction.
#[derive(Clone, Debug)]
pub enum FatiguePolicy {
    /// Each worker draws a factor uniformly from `[0.5, 1.5)`.
    Random,
    /// Explicit per-worker factors, one per worker. Useful when tests need
    /// deterministic throughput ratios.
    Fixed(Vec<f64>),
}

/// Pool construction parameters.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    pub workers: usize,
    pub fatigue: FatiguePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            workers: num_cpus::get(),
            fatigue: FatiguePolicy::Random,
        }
    }
}

impl ExecutorConfig {
    pub fn new(workers: usize) -> Self {
        ExecutorConfig {
            workers,
            ..Default::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_fatigue(mut self, fatigue: FatiguePolicy) -> Self {
        self.fatigue = fatigue;
        self
    }
}

struct Completion {
    lock: Mutex<()>,
    done: Condvar,
}

/// Thread pool that always hands the next task to the least-tired worker.
pub struct TiredExecutor {
    workers: Vec<TiredWorker>,
    idle: Arc<IdleSet>,
    in_flight: Arc<AtomicUsize>,
    completion: Arc<Completion>,
    down: bool,
}

impl TiredExecutor {
    /// Creates a pool of `workers` threads with random fatigue factors.
    pub fn new(workers: usize) -> Result<Self, SchedError> {
        Self::with_config(ExecutorConfig::new(workers))
    }

    pub fn with_config(config: ExecutorConfig) -> Result<Self, SchedError> {
        if config.workers == 0 {
            return Err(SchedError::InvalidWorkerCount(0));
        }
        let factors = match config.fatigue {
            FatiguePolicy::Random => {
                let mut rng = rand::thread_rng();
                (0..config.workers).map(|_| rng.gen_range(0.5..1.5)).collect()
            }
            FatiguePolicy::Fixed(factors) => {
                if factors.len() != config.workers {
                    return Err(SchedError::FatigueFactorCount {
                        expected: config.workers,
                        actual: factors.len(),
                    });
                }
                if let Some(&bad) = factors.iter().find(|f| !f.is_finite() || **f <= 0.0) {
                    return Err(SchedError::InvalidFatigueFactor(bad));
                }
                factors
            }
        };

        let idle = Arc::new(IdleSet::new());
        let mut workers = Vec::with_capacity(factors.len());
        for (id, fatigue_factor) in factors.into_iter().enumerate() {
            let worker = TiredWorker::spawn(id, fatigue_factor)?;
            idle.put(IdleEntry {
                fatigue: worker.fatigue(),
                worker: id,
            });
            workers.push(worker);
        }

        Ok(TiredExecutor {
            workers,
            idle,
            in_flight: Arc::new(AtomicUsize::new(0)),
            completion: Arc::new(Completion {
                lock: Mutex::new(()),
                done: Condvar::new(),
            }),
            down: false,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Dispatches one task to the least-fatigued idle worker, blocking until
    /// a worker is available.
    ///
    /// The in-flight counter is incremented before the task reaches the
    /// worker. Incrementing afterwards would let a fast task finish and
    /// decrement first, driving the counter negative and waking the
    /// `submit_all` barrier against a count that was never registered.
    pub fn submit(&self, task: Task) -> Result<(), SchedError> {
        let entry = self.idle.take();
        let worker = &self.workers[entry.worker];

        let guard = CompletionGuard {
            shared: worker.shared(),
            idle: Arc::clone(&self.idle),
            in_flight: Arc::clone(&self.in_flight),
            completion: Arc::clone(&self.completion),
        };
        let wrapped: Task = Box::new(move || {
            let _guard = guard;
            task();
        });

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        // Under the pool protocol this offer cannot fail: the worker was
        // just removed from the idle set, so its slot is empty. If it fails
        // anyway, the rejected wrapper is dropped inside `offer`, and its
        // completion guard rolls everything back (idle entry restored,
        // counter decremented).
        worker.offer(wrapped)
    }

    /// Submits every task and blocks until all of them have finished.
    ///
    /// The completion lock is held across the whole submission loop. That
    /// closes the race where every task completes, and signals, before this
    /// thread reaches its wait: a completing task can only grab the lock
    /// once the barrier is already waiting on it.
    pub fn submit_all<I>(&self, tasks: I) -> Result<(), SchedError>
    where
        I: IntoIterator<Item = Task>,
    {
        let mut held = self.completion.lock.lock();
        for task in tasks {
            self.submit(task)?;
        }
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            self.completion.done.wait(&mut held);
        }
        Ok(())
    }

    /// Waits for in-flight work to drain, pills every worker, and joins the
    /// threads. Safe to call more than once; `Drop` calls it as well.
    pub fn shutdown(&mut self) {
        if self.down {
            return;
        }
        self.down = true;

        {
            let mut held = self.completion.lock.lock();
            while self.in_flight.load(Ordering::SeqCst) > 0 {
                self.completion.done.wait(&mut held);
            }
        }
        for worker in &self.workers {
            worker.shutdown();
        }
        for worker in &mut self.workers {
            worker.join();
        }
    }

    /// Per-worker counter snapshots.
    pub fn stats(&self) -> Vec<WorkerStats> {
        self.workers.iter().map(TiredWorker::stats).collect()
    }

    /// Formatted report over all workers.
    pub fn worker_report(&self) -> WorkerReport {
        WorkerReport {
            workers: self.stats(),
        }
    }
}

impl Drop for TiredExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Completion bookkeeping for one dispatched task. Runs on drop so that it
/// fires on every outcome, a panic included: the worker is returned to the
/// idle set with its refreshed fatigue, the in-flight counter drops, and the
/// barrier is signalled when the counter reaches zero.
///
/// The idle re-insertion strictly precedes the completion signal; a barrier
/// thread blocked inside `submit` is released by the former before anyone
/// can contend on the latter.
struct CompletionGuard {
    shared: Arc<WorkerShared>,
    idle: Arc<IdleSet>,
    in_flight: Arc<AtomicUsize>,
    completion: Arc<Completion>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.idle.put(IdleEntry {
            fatigue: self.shared.fatigue(),
            worker: self.shared.id(),
        });
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _held = self.completion.lock.lock();
            self.completion.done.notify_all();
        }
    }
}

/// Point-in-time view over the whole pool, printable for diagnostics.
#[derive(Clone, Debug)]
pub struct WorkerReport {
    pub workers: Vec<WorkerStats>,
}

impl std::fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Worker Report")?;
        writeln!(f, "=============")?;
        for stats in &self.workers {
            writeln!(
                f,
                "worker {}: factor={:.2} fatigue={:.0} busy={:.3}ms idle={:.3}ms running={}",
                stats.id,
                stats.fatigue_factor,
                stats.fatigue,
                stats.busy_nanos as f64 / 1_000_000.0,
                stats.idle_nanos as f64 / 1_000_000.0,
                stats.busy,
            )?;
        }
        Ok(())
    }
}
