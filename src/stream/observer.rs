//! The observer side of the subscription bridge.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::core::{SchedulerError, Subscription};

/// Receiver of a stream's values and terminal signal.
///
/// Observers are shared with whichever worker ends up emitting, so they must be `Send + Sync`.
pub trait Observer<T>: Send + Sync {
    /// Deliver one value.
    fn on_next(&self, value: T);

    /// Deliver the terminal failure.
    fn on_error(&self, error: SchedulerError);

    /// Deliver successful termination.
    fn on_completed(&self);

    /// Whether the subscriber has cancelled; sources check this between emissions.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared observer handle passed to sources.
pub type ObserverRef<T> = Arc<dyn Observer<T>>;

type NextFn<T> = Box<dyn Fn(T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(SchedulerError) + Send + Sync>;
type CompletedFn = Box<dyn Fn() + Send + Sync>;

/// Observer assembled from closures.
///
/// ```
/// use rx_schedulers::stream::CallbackObserver;
///
/// let observer = CallbackObserver::new(|v: i32| println!("value {v}"))
///     .with_error(|e| eprintln!("failed: {e}"))
///     .with_completed(|| println!("done"));
/// # drop(observer);
/// ```
pub struct CallbackObserver<T> {
    next: NextFn<T>,
    error: Option<ErrorFn>,
    completed: Option<CompletedFn>,
}

impl<T> CallbackObserver<T> {
    /// Observer that forwards values to `next` and ignores terminal signals.
    pub fn new<F>(next: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            next: Box::new(next),
            error: None,
            completed: None,
        }
    }

    /// Handle the terminal failure.
    #[must_use]
    pub fn with_error<F>(mut self, error: F) -> Self
    where
        F: Fn(SchedulerError) + Send + Sync + 'static,
    {
        self.error = Some(Box::new(error));
        self
    }

    /// Handle successful termination.
    #[must_use]
    pub fn with_completed<F>(mut self, completed: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.completed = Some(Box::new(completed));
        self
    }
}

impl<T> Observer<T> for CallbackObserver<T> {
    fn on_next(&self, value: T) {
        (self.next)(value);
    }

    fn on_error(&self, error: SchedulerError) {
        match &self.error {
            Some(handler) => handler(error),
            None => trace!(%error, "Unhandled stream error"),
        }
    }

    fn on_completed(&self) {
        if let Some(handler) = &self.completed {
            handler();
        }
    }
}

/// Enforces the observer contract around a user observer.
///
/// At most one terminal signal is delivered and nothing is delivered after it. The terminal
/// signal also cancels the subscription, which stops any chain still linked to it. Values
/// emitted after a cancel but before the source noticed are still delivered.
pub struct SafeObserver<T> {
    inner: ObserverRef<T>,
    token: Subscription,
    terminated: AtomicBool,
    _values: PhantomData<fn(T)>,
}

impl<T> SafeObserver<T> {
    /// Wrap `inner`; `token` is the subscription handed back to the subscriber.
    pub fn new(inner: ObserverRef<T>, token: Subscription) -> Self {
        Self {
            inner,
            token,
            terminated: AtomicBool::new(false),
            _values: PhantomData,
        }
    }

    /// Whether a terminal signal has been delivered.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    fn terminate(&self) -> bool {
        let first = !self.terminated.swap(true, Ordering::AcqRel);
        if first {
            self.token.cancel();
        }
        first
    }
}

impl<T> fmt::Debug for SafeObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeObserver")
            .field("terminated", &self.is_terminated())
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl<T> Observer<T> for SafeObserver<T> {
    fn on_next(&self, value: T) {
        if !self.is_terminated() {
            self.inner.on_next(value);
        }
    }

    fn on_error(&self, error: SchedulerError) {
        if self.terminate() {
            self.inner.on_error(error);
        }
    }

    fn on_completed(&self) {
        if self.terminate() {
            self.inner.on_completed();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
