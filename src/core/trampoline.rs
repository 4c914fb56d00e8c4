//! Current-thread trampoline.
//!
//! Each thread owns at most one FIFO queue, created by the first `schedule` on that thread. The
//! call that created the queue becomes the *drain loop*: it pops and runs units until the queue is
//! empty, then tears the queue down. A `schedule` issued while a drain loop is active (typically
//! from inside a running step) only pushes onto the queue and returns, so a self-rescheduling
//! chain runs as a loop instead of a recursion and the stack stays flat however long it gets.
//!
//! The queue lives in a `thread_local!` cell and is never reachable from another thread.

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::trace;

use super::error::SchedulerError;
use super::scheduler::{Executor, RunOutcome, Scheduler, SchedulerKind, WorkUnit};

type Queue = VecDeque<(Scheduler, WorkUnit)>;

thread_local! {
    static QUEUE: RefCell<Option<Queue>> = const { RefCell::new(None) };
}

/// Executor backing [`SchedulerKind::CurrentThread`].
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TrampolineExecutor;

impl TrampolineExecutor {
    /// Whether a drain loop is active on the calling thread.
    pub(crate) fn is_draining() -> bool {
        QUEUE.with(|queue| queue.borrow().is_some())
    }

    /// Push onto the active queue, or install a new one. Returns `true` when the caller must drain.
    fn enqueue(scheduler: &Scheduler, unit: WorkUnit) -> bool {
        QUEUE.with(|cell| {
            let mut slot = cell.borrow_mut();
            match slot.as_mut() {
                Some(queue) => {
                    queue.push_back((scheduler.clone(), unit));
                    trace!(depth = queue.len(), "Deferred unit onto active trampoline");
                    false
                }
                None => {
                    let mut queue = VecDeque::new();
                    queue.push_back((scheduler.clone(), unit));
                    *slot = Some(queue);
                    true
                }
            }
        })
    }

    fn pop() -> Option<(Scheduler, WorkUnit)> {
        QUEUE.with(|cell| cell.borrow_mut().as_mut().and_then(VecDeque::pop_front))
    }

    fn drain() {
        let _guard = DrainGuard;
        let mut ran = 0_usize;
        let mut skipped = 0_usize;

        // The borrow is released before each unit runs so nested schedules can push.
        while let Some((scheduler, unit)) = Self::pop() {
            match unit.run(&scheduler) {
                RunOutcome::Skipped => skipped += 1,
                RunOutcome::Completed | RunOutcome::Failed => ran += 1,
            }
        }

        trace!(ran, skipped, "Trampoline drained");
    }
}

/// Tears the thread's queue down when the drain loop exits, including by unwinding.
///
/// Units left behind by an unwinding step are dropped after the cell is released, so a `Drop`
/// that schedules on this thread starts a fresh drain loop instead of hitting the borrow.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        let leftover = QUEUE.with(|cell| {
            cell.try_borrow_mut()
                .ok()
                .and_then(|mut slot| slot.take())
        });
        if let Some(queue) = leftover {
            trace!(dropped = queue.len(), "Discarding units of an unwound trampoline");
            drop(queue);
        }
    }
}

impl Executor for TrampolineExecutor {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::CurrentThread
    }

    fn execute(&self, scheduler: &Scheduler, unit: WorkUnit) -> Result<(), SchedulerError> {
        if Self::enqueue(scheduler, unit) {
            Self::drain();
        }
        Ok(())
    }
}
