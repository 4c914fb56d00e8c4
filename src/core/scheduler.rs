//! The scheduler contract and the work units executors run.
//!
//! A [`Scheduler`] is a cheap, cloneable handle that decides *where* a unit of work runs:
//!
//! | kind | executes on | nested `schedule` |
//! |------|-------------|-------------------|
//! | [`SchedulerKind::Immediate`] | calling thread, before `schedule` returns | direct nested call |
//! | [`SchedulerKind::CurrentThread`] | calling thread, via a per-thread FIFO trampoline | enqueued, runs after the current step |
//! | [`SchedulerKind::Computation`] | bounded worker pool | fresh pool submission |
//! | [`SchedulerKind::Io`] | elastic worker pool | fresh pool submission |
//!
//! `schedule` never blocks beyond enqueueing. It only returns `Err` for submission-time failures
//! (pool shut down, no worker thread could be started); failures raised *by* the work go to the
//! chain's failure sink instead.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use super::continuation::{ChainState, Continuation, FailureSink};
use super::error::{AppResult, SchedulerError};
use super::immediate::ImmediateExecutor;
use super::subscription::Subscription;
use super::trampoline::TrampolineExecutor;
use super::worker_pool::WorkerPool;

/// Execution policy of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// Synchronous execution on the calling thread.
    Immediate,
    /// Trampolined execution on the calling thread.
    CurrentThread,
    /// Bounded pool sized for CPU-bound work.
    Computation,
    /// Elastic pool for blocking work.
    Io,
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Immediate => "immediate",
            Self::CurrentThread => "current_thread",
            Self::Computation => "computation",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Boxed body of a unit of work.
pub(crate) type WorkBody = Box<dyn FnOnce(&Scheduler) -> AppResult<Subscription> + Send>;

/// What happened when an executor ran a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    /// The body ran to completion.
    Completed,
    /// The body failed; the chain was terminated.
    Failed,
    /// The unit was cancelled or its chain terminated before it started.
    Skipped,
}

/// Where a unit's returned token is published: the head token of its run and the step's depth.
#[derive(Clone)]
pub(crate) struct Anchor {
    head: Subscription,
    generation: u64,
}

impl Anchor {
    /// Anchor for a unit scheduled from a step of `chain` on this thread, else one rooted at
    /// `token`.
    pub(crate) fn for_submission(chain: Uuid, token: &Subscription) -> Self {
        RUNNING
            .with(|running| {
                running.borrow().as_ref().and_then(|(id, anchor)| {
                    (*id == chain).then(|| Self {
                        head: anchor.head.clone(),
                        generation: anchor.generation + 1,
                    })
                })
            })
            .unwrap_or_else(|| Self::root(token))
    }

    fn root(token: &Subscription) -> Self {
        Self {
            head: token.clone(),
            generation: 0,
        }
    }
}

thread_local! {
    // Chain and anchor of the step executing on this thread.
    static RUNNING: RefCell<Option<(Uuid, Anchor)>> = const { RefCell::new(None) };
}

/// Marks a step as running on this thread; restores the outer step (immediate nesting) on drop.
struct RunningGuard(Option<(Uuid, Anchor)>);

impl RunningGuard {
    fn enter(chain: Uuid, anchor: Anchor) -> Self {
        Self(RUNNING.with(|running| running.replace(Some((chain, anchor)))))
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let outer = self.0.take();
        RUNNING.with(|running| {
            if let Ok(mut slot) = running.try_borrow_mut() {
                *slot = outer;
            }
        });
    }
}

/// One submission: the body plus the token that can still prevent it from starting.
pub(crate) struct WorkUnit {
    token: Subscription,
    anchor: Anchor,
    chain: Arc<ChainState>,
    body: WorkBody,
}

impl WorkUnit {
    pub(crate) fn new(
        token: Subscription,
        anchor: Anchor,
        chain: Arc<ChainState>,
        body: WorkBody,
    ) -> Self {
        Self {
            token,
            anchor,
            chain,
            body,
        }
    }

    /// Run the body unless cancelled, converting errors and panics into a chain failure.
    ///
    /// The token the body returns replaces the forwarding target of the run's head token, so the
    /// head always reaches the chain's pending step and executed steps hold nothing.
    pub(crate) fn run(self, scheduler: &Scheduler) -> RunOutcome {
        let Self {
            token,
            anchor,
            chain,
            body,
        } = self;

        if token.is_cancelled() || anchor.head.is_cancelled() || chain.is_terminated() {
            trace!(chain = %chain.id(), "Skipping cancelled unit");
            return RunOutcome::Skipped;
        }

        let result = {
            let _running = RunningGuard::enter(chain.id(), anchor.clone());
            catch_unwind(AssertUnwindSafe(|| body(scheduler)))
        };
        match result {
            Ok(Ok(next)) => {
                anchor.head.forward_to(anchor.generation, next);
                RunOutcome::Completed
            }
            Ok(Err(err)) => {
                chain.fail(SchedulerError::continuation_failed(&err));
                RunOutcome::Failed
            }
            Err(payload) => {
                chain.fail(SchedulerError::ContinuationPanicked(panic_message(&*payload)));
                RunOutcome::Failed
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Execution backend behind a [`Scheduler`] handle.
pub(crate) trait Executor: Send + Sync + 'static {
    /// Policy implemented by this executor.
    fn kind(&self) -> SchedulerKind;

    /// Run or enqueue `unit`; `scheduler` is the handle the unit will observe.
    fn execute(&self, scheduler: &Scheduler, unit: WorkUnit) -> Result<(), SchedulerError>;
}

/// Handle deciding on which execution context submitted work runs.
#[derive(Clone)]
pub struct Scheduler {
    executor: Arc<dyn Executor>,
}

impl Scheduler {
    pub(crate) fn from_executor(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    /// A scheduler that runs work synchronously on the calling thread.
    #[must_use]
    pub fn immediate() -> Self {
        Self::from_executor(Arc::new(ImmediateExecutor))
    }

    /// A scheduler that trampolines work through the calling thread's queue.
    #[must_use]
    pub fn current_thread() -> Self {
        Self::from_executor(Arc::new(TrampolineExecutor))
    }

    /// A scheduler that submits work to `pool`.
    #[must_use]
    pub fn from_pool(pool: Arc<WorkerPool>) -> Self {
        Self::from_executor(pool)
    }

    /// Execution policy of this scheduler.
    #[must_use]
    pub fn kind(&self) -> SchedulerKind {
        self.executor.kind()
    }

    /// Whether the calling thread is inside a current-thread drain loop, i.e. a
    /// current-thread `schedule` made now would be deferred rather than run.
    #[must_use]
    pub fn is_trampolining() -> bool {
        TrampolineExecutor::is_draining()
    }

    /// Schedule a one-shot action.
    ///
    /// Cancelling the returned token before the action starts prevents it from running;
    /// afterwards it cancels the token the action returned.
    ///
    /// # Errors
    ///
    /// Returns an error only when the work could not be submitted.
    ///
    /// A failure of `action` is only logged; use [`schedule_with_sink`](Self::schedule_with_sink)
    /// to receive it.
    pub fn schedule<F>(&self, action: F) -> Result<Subscription, SchedulerError>
    where
        F: FnOnce() -> AppResult<Subscription> + Send + 'static,
    {
        self.submit(action, None)
    }

    /// Schedule a one-shot action whose failure (error or panic) is delivered to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the work could not be submitted.
    pub fn schedule_with_sink<F, K>(
        &self,
        action: F,
        sink: K,
    ) -> Result<Subscription, SchedulerError>
    where
        F: FnOnce() -> AppResult<Subscription> + Send + 'static,
        K: Fn(SchedulerError) + Send + Sync + 'static,
    {
        self.submit(action, Some(Arc::new(sink)))
    }

    fn submit<F>(
        &self,
        action: F,
        sink: Option<FailureSink>,
    ) -> Result<Subscription, SchedulerError>
    where
        F: FnOnce() -> AppResult<Subscription> + Send + 'static,
    {
        let token = Subscription::new();
        let unit = WorkUnit::new(
            token.clone(),
            Anchor::root(&token),
            ChainState::new(sink),
            Box::new(move |_: &Scheduler| action()),
        );
        self.executor.execute(self, unit)?;
        Ok(token)
    }

    /// Schedule one step of `continuation` with `state`.
    ///
    /// Calling this from inside the continuation with `this.clone()` continues the chain.
    ///
    /// # Errors
    ///
    /// Returns an error only when the work could not be submitted.
    pub fn schedule_with<S>(
        &self,
        state: S,
        continuation: Continuation<S>,
    ) -> Result<Subscription, SchedulerError>
    where
        S: Send + 'static,
    {
        let token = Subscription::new();
        self.executor
            .execute(self, continuation.into_unit(state, token.clone()))?;
        Ok(token)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler").field("kind", &self.kind()).finish()
    }
}
