//! Worker pool executor backing the computation and I/O schedulers.
//!
//! The pool owns an unbounded submission queue (a `crossbeam-channel`) and a set of named OS
//! threads that block on it. Two policies exist:
//!
//! - **Bounded** (computation): workers are started lazily, one per submission that finds no
//!   idle worker, until `max_workers` are alive. They never retire.
//! - **Elastic** (I/O): a submission that cannot claim an idle worker always starts a new one, so
//!   blocking work never starves queued work. Workers idle for longer than the keep-alive retire.
//!
//! # Idle accounting
//!
//! `idle_workers` counts parked workers minus submissions that already claimed one of them. A
//! submission claims by decrementing it; a worker re-parks by incrementing it after each task,
//! capped at `live_workers`; a timed-out worker may only retire by decrementing it, which fails
//! once every parked worker has been claimed.
//!
//! ```rust,ignore
//! use rx_schedulers::config::WorkerPoolConfig;
//! use rx_schedulers::core::{Scheduler, WorkerPool};
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::io().with_thread_name_prefix("uploads"))?;
//! let scheduler = Scheduler::from_pool(pool.clone());
//! scheduler.schedule(|| { /* blocking upload */ Ok(Subscription::empty()) })?;
//! pool.shutdown();
//! ```

mod worker;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{PoolPolicy, WorkerPoolConfig};

use super::error::SchedulerError;
use super::scheduler::{Executor, Scheduler, SchedulerKind, WorkUnit};

/// A submission travelling through the queue with the handle it will observe.
pub(crate) type Job = (Scheduler, WorkUnit);

/// How long `shutdown` waits for each worker to exit.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Thread name prefix identifying the pool.
    pub name: String,
    /// Worker threads currently alive.
    pub live_workers: usize,
    /// Workers parked and not yet claimed by a submission.
    pub idle_workers: usize,
    /// Highest number of simultaneously alive workers.
    pub peak_workers: usize,
    /// Total units submitted.
    pub submitted_tasks: u64,
    /// Units waiting in the queue.
    pub queued_tasks: u64,
    /// Units currently executing.
    pub active_tasks: u64,
    /// Units that ran to completion.
    pub completed_tasks: u64,
    /// Units whose continuation failed.
    pub failed_tasks: u64,
    /// Units dropped because they were cancelled before starting.
    pub skipped_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted_tasks: AtomicU64,
    pub queued_tasks: AtomicU64,
    pub active_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub skipped_tasks: AtomicU64,
}

/// State shared between the pool handle and its worker threads.
#[derive(Debug)]
pub(crate) struct PoolShared {
    pub name: String,
    pub keep_alive: Option<Duration>,
    pub shutdown: AtomicBool,
    pub live_workers: AtomicUsize,
    pub idle_workers: AtomicUsize,
    pub peak_workers: AtomicUsize,
    pub counters: PoolCounters,
    next_thread_id: AtomicUsize,
}

impl PoolShared {
    fn new(name: String, keep_alive: Option<Duration>) -> Self {
        Self {
            name,
            keep_alive,
            shutdown: AtomicBool::new(false),
            live_workers: AtomicUsize::new(0),
            idle_workers: AtomicUsize::new(0),
            peak_workers: AtomicUsize::new(0),
            counters: PoolCounters::default(),
            next_thread_id: AtomicUsize::new(1),
        }
    }

    fn next_thread_name(&self) -> String {
        let id = self.next_thread_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{id}", self.name)
    }

    /// Decrement `idle_workers` if positive. Used both to claim a parked worker and to retire one.
    pub(crate) fn take_idle(&self) -> bool {
        self.idle_workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idle| idle.checked_sub(1))
            .is_ok()
    }

    /// Count the calling worker as parked again, never beyond the number of live workers.
    ///
    /// A submission to a saturated bounded pool claims no parked worker, so the finishing worker
    /// would otherwise count itself idle once per such submission.
    pub(crate) fn park(&self) {
        let live = self.live_workers.load(Ordering::Acquire);
        let _ = self
            .idle_workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idle| {
                Some((idle + 1).min(live))
            });
    }

    /// Reserve a slot for a new worker, honoring `max_workers` when bounded.
    fn reserve_worker(&self, max_workers: Option<usize>) -> bool {
        let reserved = self
            .live_workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| match max_workers {
                Some(max) if live >= max => None,
                _ => Some(live + 1),
            });
        match reserved {
            Ok(previous) => {
                self.peak_workers.fetch_max(previous + 1, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            name: self.name.clone(),
            live_workers: self.live_workers.load(Ordering::Relaxed),
            idle_workers: self.idle_workers.load(Ordering::Relaxed),
            peak_workers: self.peak_workers.load(Ordering::Relaxed),
            submitted_tasks: self.counters.submitted_tasks.load(Ordering::Relaxed),
            queued_tasks: self.counters.queued_tasks.load(Ordering::Relaxed),
            active_tasks: self.counters.active_tasks.load(Ordering::Relaxed),
            completed_tasks: self.counters.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.counters.failed_tasks.load(Ordering::Relaxed),
            skipped_tasks: self.counters.skipped_tasks.load(Ordering::Relaxed),
        }
    }
}

/// Pool of named worker threads draining an unbounded submission queue.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    task_tx: Mutex<Option<Sender<Job>>>,
    task_rx: Receiver<Job>,
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool from `config`. No thread is started until the first submission.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: WorkerPoolConfig) -> Result<Arc<Self>, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        Ok(Self::from_validated(config))
    }

    pub(crate) fn from_validated(config: WorkerPoolConfig) -> Arc<Self> {
        let (task_tx, task_rx) = unbounded::<Job>();
        let keep_alive = match config.policy {
            PoolPolicy::Bounded { .. } => None,
            PoolPolicy::Elastic { keep_alive_ms } => Some(Duration::from_millis(keep_alive_ms)),
        };
        let shared = Arc::new(PoolShared::new(config.thread_name_prefix.clone(), keep_alive));

        info!(
            pool = %config.thread_name_prefix,
            kind = %config.kind(),
            max_workers = ?config.max_workers(),
            keep_alive_ms = ?keep_alive.map(|d| d.as_millis()),
            "WorkerPool initialized"
        );

        Arc::new(Self {
            config,
            task_tx: Mutex::new(Some(task_tx)),
            task_rx,
            shared,
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Scheduler handle submitting to this pool.
    #[must_use]
    pub fn scheduler(self: &Arc<Self>) -> Scheduler {
        Scheduler::from_pool(Arc::clone(self))
    }

    /// Thread name prefix identifying this pool.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The configuration this pool was built from.
    #[must_use]
    pub const fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.snapshot()
    }

    /// Whether `shutdown` has been called (or the pool dropped).
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Make sure some worker will pick up the next submission.
    fn ensure_worker(&self) -> Result<(), SchedulerError> {
        if self.shared.take_idle() {
            return Ok(());
        }
        if !self.shared.reserve_worker(self.config.max_workers()) {
            // Bounded and saturated: a busy worker takes it next.
            return Ok(());
        }

        let name = self.shared.next_thread_name();
        match worker::spawn(
            name.clone(),
            self.task_rx.clone(),
            Arc::clone(&self.shared),
            self.config.thread_stack_size,
        ) {
            Ok(handle) => {
                let mut workers = self.workers.lock();
                workers.retain(|h| !h.is_finished());
                workers.push(handle);
                Ok(())
            }
            Err(err) => {
                let live = self.shared.live_workers.fetch_sub(1, Ordering::AcqRel) - 1;
                if live > 0 {
                    warn!(pool = %self.shared.name, thread = %name, error = %err, live, "Worker spawn failed, queueing on live workers");
                    Ok(())
                } else {
                    Err(SchedulerError::WorkerSpawn {
                        name,
                        reason: err.to_string(),
                    })
                }
            }
        }
    }

    /// Shut down the pool gracefully with timeout.
    ///
    /// Drops the task sender to unblock idle workers, then joins each worker for up to two
    /// seconds. Workers that don't exit in time are detached. Units still queued are dropped
    /// without running. Calling this from one of the pool's own workers skips joining that worker.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(pool = %self.shared.name, "Shutting down worker pool");

        {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
        }

        let current = thread::current().id();
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        let worker_count = handles.len();

        for handle in handles {
            let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
            if handle.thread().id() == current {
                debug!(thread = %name, "Not joining the calling worker");
                continue;
            }

            let (tx, rx) = mpsc::channel();
            let joiner = thread::spawn(move || {
                let _ = tx.send(handle.join().is_ok());
            });

            match rx.recv_timeout(JOIN_TIMEOUT) {
                Ok(true) => debug!(thread = %name, "Worker joined successfully"),
                Ok(false) => warn!(thread = %name, "Worker panicked"),
                Err(_) => warn!(thread = %name, "Worker did not exit within timeout - detaching"),
            }

            // The joiner either finished or is detached with the worker.
            drop(joiner);
        }

        self.shared.idle_workers.store(0, Ordering::Release);

        // Queued jobs hold scheduler handles to this pool; release them.
        let dropped = self.task_rx.try_iter().count() as u64;
        if dropped > 0 {
            let counters = &self.shared.counters;
            counters.queued_tasks.fetch_sub(dropped, Ordering::Relaxed);
            counters.skipped_tasks.fetch_add(dropped, Ordering::Relaxed);
        }

        info!(pool = %self.shared.name, worker_count, dropped, "Worker pool shut down complete");
    }
}

impl Executor for WorkerPool {
    fn kind(&self) -> SchedulerKind {
        self.config.kind()
    }

    fn execute(&self, scheduler: &Scheduler, unit: WorkUnit) -> Result<(), SchedulerError> {
        if self.is_shutdown() {
            return Err(SchedulerError::PoolShutdown(self.shared.name.clone()));
        }

        self.ensure_worker()?;

        let task_tx = self.task_tx.lock();
        let Some(task_tx) = task_tx.as_ref() else {
            return Err(SchedulerError::PoolShutdown(self.shared.name.clone()));
        };

        let counters = &self.shared.counters;
        counters.queued_tasks.fetch_add(1, Ordering::Relaxed);
        if task_tx.send((scheduler.clone(), unit)).is_err() {
            counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
            return Err(SchedulerError::PoolShutdown(self.shared.name.clone()));
        }
        counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal shutdown but don't join: this may run on one of our own workers.
        if !self.shared.shutdown.swap(true, Ordering::AcqRel) {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
            debug!(pool = %self.shared.name, "WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}
