//! Fatigue-tracking worker threads.
//!
//! Each worker owns a capacity-1 handoff channel. The executor hands it at
//! most one task at a time; the worker runs the task to completion, adds the
//! elapsed time to its busy counter, and only then clears its busy flag.
//! That ordering is the visibility contract: an observer that sees
//! `busy == false` is guaranteed to see the busy time of the task that just
//! finished.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::SchedError;

/// A unit of work accepted by the pool.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    /// Poison pill: the worker exits its run loop on receipt.
    Shutdown,
}

pub(crate) struct WorkerShared {
    id: usize,
    fatigue_factor: f64,
    alive: AtomicBool,
    busy: AtomicBool,
    busy_nanos: AtomicU64,
    idle_nanos: AtomicU64,
    /// Nanoseconds since `started` at which the worker last became idle.
    idle_since_nanos: AtomicU64,
    started: Instant,
}

impl WorkerShared {
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Fatigue is the stored busy time scaled by the worker's factor. No
    /// live clock is consulted, so comparisons are stable while the worker
    /// sits in the idle set.
    pub(crate) fn fatigue(&self) -> f64 {
        self.fatigue_factor * self.busy_nanos.load(Ordering::Acquire) as f64
    }
}

/// One pooled worker thread.
pub struct TiredWorker {
    shared: Arc<WorkerShared>,
    sender: Sender<Message>,
    handle: Option<JoinHandle<()>>,
}

impl TiredWorker {
    /// Spawns a worker with the given id and fatigue factor.
    pub fn spawn(id: usize, fatigue_factor: f64) -> Result<Self, SchedError> {
        let (sender, receiver) = bounded(1);
        let shared = Arc::new(WorkerShared {
            id,
            fatigue_factor,
            alive: AtomicBool::new(true),
            busy: AtomicBool::new(false),
            busy_nanos: AtomicU64::new(0),
            idle_nanos: AtomicU64::new(0),
            idle_since_nanos: AtomicU64::new(0),
            started: Instant::now(),
        });
        let handle = thread::Builder::new()
            .name(format!("rowmill-worker-{id}"))
            .spawn({
                let shared = Arc::clone(&shared);
                move || run_loop(shared, receiver)
            })?;
        Ok(TiredWorker {
            shared,
            sender,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> usize {
        self.shared.id
    }

    pub fn fatigue_factor(&self) -> f64 {
        self.shared.fatigue_factor
    }

    /// Current fatigue score.
    pub fn fatigue(&self) -> f64 {
        self.shared.fatigue()
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Total nanoseconds spent running tasks.
    pub fn busy_nanos(&self) -> u64 {
        self.shared.busy_nanos.load(Ordering::Acquire)
    }

    /// Total nanoseconds spent waiting between tasks.
    pub fn idle_nanos(&self) -> u64 {
        self.shared.idle_nanos.load(Ordering::Acquire)
    }

    /// Non-blocking task handoff. Fails when the slot already holds a
    /// pending task. The executor only offers to workers it has taken from
    /// the idle set, so under that protocol the offer always lands.
    pub fn offer(&self, task: Task) -> Result<(), SchedError> {
        self.sender
            .try_send(Message::Run(task))
            .map_err(|_| SchedError::WorkerNotReady(self.shared.id))
    }

    /// Asks the worker to exit after the task it may be holding. The pill is
    /// delivered with a blocking send, so it cannot be lost even when the
    /// handoff slot is momentarily full.
    pub fn shutdown(&self) {
        self.shared.alive.store(false, Ordering::Release);
        // A send error means the worker is already gone.
        let _ = self.sender.send(Message::Shutdown);
    }

    /// Waits for the worker thread to terminate.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Snapshot of the worker's counters.
    pub fn stats(&self) -> WorkerStats {
        // Read the busy flag first; the run loop publishes counters before
        // clearing it.
        let busy = self.shared.busy.load(Ordering::Acquire);
        WorkerStats {
            id: self.shared.id,
            fatigue_factor: self.shared.fatigue_factor,
            fatigue: self.shared.fatigue(),
            busy_nanos: self.busy_nanos(),
            idle_nanos: self.idle_nanos(),
            busy,
        }
    }

    pub(crate) fn shared(&self) -> Arc<WorkerShared> {
        Arc::clone(&self.shared)
    }
}

/// Point-in-time counters for one worker.
#[derive(Clone, Debug)]
pub struct WorkerStats {
    pub id: usize,
    pub fatigue_factor: f64,
    pub fatigue: f64,
    pub busy_nanos: u64,
    pub idle_nanos: u64,
    pub busy: bool,
}

fn run_loop(shared: Arc<WorkerShared>, receiver: Receiver<Message>) {
    while shared.alive.load(Ordering::Acquire) {
        let task = match receiver.recv() {
            Ok(Message::Run(task)) => task,
            Ok(Message::Shutdown) | Err(_) => break,
        };

        shared.busy.store(true, Ordering::Release);
        let now = shared.started.elapsed().as_nanos() as u64;
        let idle_since = shared.idle_since_nanos.load(Ordering::Acquire);
        shared
            .idle_nanos
            .fetch_add(now.saturating_sub(idle_since), Ordering::AcqRel);

        let begun = Instant::now();
        // A panicking task must not take the worker down with it; the
        // executor's completion guard unwinds inside the task box.
        let _ = panic::catch_unwind(AssertUnwindSafe(task));
        let elapsed = begun.elapsed().as_nanos() as u64;

        // Counters are published before the busy flag clears.
        shared.busy_nanos.fetch_add(elapsed, Ordering::AcqRel);
        shared
            .idle_since_nanos
            .store(shared.started.elapsed().as_nanos() as u64, Ordering::Release);
        shared.busy.store(false, Ordering::Release);
    }
}
