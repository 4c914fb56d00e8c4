//! Worker thread loop.

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::debug;

use crate::core::scheduler::RunOutcome;

use super::{Job, PoolShared};

/// Start a worker thread named `name`.
///
/// The caller has already counted the worker in `live_workers`; the thread removes itself on
/// exit. A freshly started worker is not counted idle: it was started for the submission that
/// follows.
pub(super) fn spawn(
    name: String,
    task_rx: Receiver<Job>,
    shared: Arc<PoolShared>,
    stack_size: Option<usize>,
) -> io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(name.clone());
    if let Some(size) = stack_size {
        builder = builder.stack_size(size);
    }

    builder.spawn(move || {
        debug!(thread = %name, "Worker thread started");
        let _exit = ExitGuard(Arc::clone(&shared));
        run(&name, &task_rx, &shared);
        debug!(thread = %name, "Worker thread exiting");
    })
}

struct ExitGuard(Arc<PoolShared>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.live_workers.fetch_sub(1, Ordering::AcqRel);
    }
}

fn next_job(task_rx: &Receiver<Job>, shared: &PoolShared) -> Result<Job, RecvTimeoutError> {
    match shared.keep_alive {
        Some(keep_alive) => task_rx.recv_timeout(keep_alive),
        None => task_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    }
}

fn run(name: &str, task_rx: &Receiver<Job>, shared: &PoolShared) {
    loop {
        match next_job(task_rx, shared) {
            Ok(job) => {
                if shared.shutdown.load(Ordering::Acquire) {
                    debug!(thread = %name, "Worker shutdown with work queued, exiting");
                    shared.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
                    shared.counters.skipped_tasks.fetch_add(1, Ordering::Relaxed);
                    break;
                }
                execute(name, job, shared);
            }
            Err(RecvTimeoutError::Timeout) => {
                // Every parked worker may already be claimed; then keep waiting.
                if !shared.take_idle() {
                    continue;
                }
                match task_rx.try_recv() {
                    Ok(job) => execute(name, job, shared),
                    Err(_) => {
                        debug!(thread = %name, "Idle worker retiring after keep-alive");
                        return;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!(thread = %name, "Worker channel closed, exiting");
                break;
            }
        }
    }
}

/// Run one job and park the worker again.
fn execute(name: &str, (scheduler, unit): Job, shared: &PoolShared) {
    let counters = &shared.counters;
    counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
    counters.active_tasks.fetch_add(1, Ordering::Relaxed);

    let outcome = unit.run(&scheduler);
    drop(scheduler);

    counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
    match outcome {
        RunOutcome::Completed => counters.completed_tasks.fetch_add(1, Ordering::Relaxed),
        RunOutcome::Failed => counters.failed_tasks.fetch_add(1, Ordering::Relaxed),
        RunOutcome::Skipped => counters.skipped_tasks.fetch_add(1, Ordering::Relaxed),
    };
    debug!(thread = %name, ?outcome, "Worker finished unit");

    shared.park();
}
