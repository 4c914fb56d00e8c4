//! Synchronous execution on the calling thread.

use super::error::SchedulerError;
use super::scheduler::{Executor, Scheduler, SchedulerKind, WorkUnit};

/// Runs every unit before `schedule` returns. Nested scheduling recurses on the caller's stack.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ImmediateExecutor;

impl Executor for ImmediateExecutor {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Immediate
    }

    fn execute(&self, scheduler: &Scheduler, unit: WorkUnit) -> Result<(), SchedulerError> {
        unit.run(scheduler);
        Ok(())
    }
}
