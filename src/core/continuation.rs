//! Work continuations: one step of a potentially unbounded, self-rescheduling loop.
//!
//! A [`Continuation`] wraps a step function `(scheduler, state, this) -> Subscription`. The
//! executor hands the step its own handle (`this`) on every invocation, so continuing the loop is
//! just `scheduler.schedule_with(next_state, this.clone())`.
//!
//! All clones of a continuation belong to one *chain*. When a step fails (returns `Err` or
//! panics) the chain is terminated: the failure is delivered once to the chain's sink and every
//! step of the chain still waiting in a queue is discarded.
//!
//! ```
//! use rx_schedulers::core::{Continuation, Scheduler, Subscription};
//!
//! let countdown = Continuation::new(|scheduler: &Scheduler, n: u32, this: &Continuation<u32>| {
//!     if n == 0 {
//!         return Ok(Subscription::empty());
//!     }
//!     Ok(scheduler.schedule_with(n - 1, this.clone())?)
//! });
//!
//! Scheduler::current_thread().schedule_with(10, countdown).unwrap();
//! ```

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use super::error::{AppResult, SchedulerError};
use super::scheduler::{Anchor, Scheduler, WorkUnit};
use super::subscription::Subscription;

/// Receiver of a chain's terminal failure.
pub type FailureSink = Arc<dyn Fn(SchedulerError) + Send + Sync>;

/// Step function stored in a [`Continuation`].
pub type StepFn<S> =
    dyn Fn(&Scheduler, S, &Continuation<S>) -> AppResult<Subscription> + Send + Sync;

/// State shared by every step of one chain.
pub(crate) struct ChainState {
    id: Uuid,
    terminated: AtomicBool,
    sink: Option<FailureSink>,
}

impl ChainState {
    pub(crate) fn new(sink: Option<FailureSink>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            terminated: AtomicBool::new(false),
            sink,
        })
    }

    pub(crate) const fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Terminate the chain and deliver `err` to the sink. Only the first failure is delivered.
    pub(crate) fn fail(&self, err: SchedulerError) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            debug!(chain = %self.id, error = %err, "Dropping failure of terminated chain");
            return;
        }

        let Some(sink) = &self.sink else {
            error!(chain = %self.id, error = %err, "Chain failed without a failure sink");
            return;
        };

        if catch_unwind(AssertUnwindSafe(|| sink(err))).is_err() {
            error!(chain = %self.id, "Failure sink panicked");
        }
    }
}

/// A self-referencing unit of work closed over its step function.
pub struct Continuation<S> {
    step: Arc<StepFn<S>>,
    chain: Arc<ChainState>,
}

impl<S> Clone for Continuation<S> {
    fn clone(&self) -> Self {
        Self {
            step: Arc::clone(&self.step),
            chain: Arc::clone(&self.chain),
        }
    }
}

impl<S> fmt::Debug for Continuation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("chain", &self.chain.id)
            .field("terminated", &self.chain.is_terminated())
            .finish_non_exhaustive()
    }
}

impl<S: Send + 'static> Continuation<S> {
    /// Create a continuation whose failures are only logged.
    pub fn new<F>(step: F) -> Self
    where
        F: Fn(&Scheduler, S, &Self) -> AppResult<Subscription> + Send + Sync + 'static,
    {
        Self {
            step: Arc::new(step),
            chain: ChainState::new(None),
        }
    }

    /// Create a continuation that reports its terminal failure to `sink`.
    pub fn with_failure_sink<F, K>(step: F, sink: K) -> Self
    where
        F: Fn(&Scheduler, S, &Self) -> AppResult<Subscription> + Send + Sync + 'static,
        K: Fn(SchedulerError) + Send + Sync + 'static,
    {
        Self {
            step: Arc::new(step),
            chain: ChainState::new(Some(Arc::new(sink))),
        }
    }

    /// Whether the chain was terminated by a failure.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.chain.is_terminated()
    }

    /// Identifier shared by every step of this chain; appears in log records.
    #[must_use]
    pub fn chain_id(&self) -> Uuid {
        self.chain.id()
    }

    /// Package one invocation of this continuation for an executor.
    pub(crate) fn into_unit(self, state: S, token: Subscription) -> WorkUnit {
        let chain = Arc::clone(&self.chain);
        let anchor = Anchor::for_submission(chain.id(), &token);
        WorkUnit::new(
            token,
            anchor,
            chain,
            Box::new(move |scheduler: &Scheduler| (self.step)(scheduler, state, &self)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_clones_share_chain() {
        let cont = Continuation::new(|_: &Scheduler, (): (), _: &Continuation<()>| {
            Ok(Subscription::empty())
        });
        let other = cont.clone();
        assert_eq!(cont.chain_id(), other.chain_id());
        assert!(!other.is_terminated());
    }

    #[test]
    fn test_fail_delivers_once() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&delivered);
        let chain = ChainState::new(Some(Arc::new(move |_err| {
            seen.fetch_add(1, Ordering::SeqCst);
        })));

        chain.fail(SchedulerError::ContinuationFailed("first".into()));
        chain.fail(SchedulerError::ContinuationFailed("second".into()));

        assert!(chain.is_terminated());
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let chain = ChainState::new(Some(Arc::new(|_err| panic!("sink blew up"))));
        chain.fail(SchedulerError::ContinuationPanicked("boom".into()));
        assert!(chain.is_terminated());
    }
}
