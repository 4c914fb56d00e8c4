//! Minimal observable used as the stream pipeline's side of the scheduler boundary.
//!
//! Only the pieces the scheduler interacts with exist here: creating a source from a subscribe
//! action, subscribing, and [`subscribe_on`](Observable::subscribe_on), which moves the whole
//! subscribe action (side effects and emissions) onto a scheduler.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::core::{AppResult, Continuation, Scheduler, SchedulerError, Subscription};

use super::observer::{Observer, ObserverRef, SafeObserver};

type OnSubscribe<T> = dyn Fn(ObserverRef<T>) -> AppResult<Subscription> + Send + Sync;

/// A cold source: every subscription runs the subscribe action anew.
pub struct Observable<T> {
    on_subscribe: Arc<OnSubscribe<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            on_subscribe: Arc::clone(&self.on_subscribe),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Source backed by a subscribe action.
    ///
    /// The action receives the observer and returns the subscription of whatever work it
    /// started; an `Err` is delivered to the observer's `on_error`.
    pub fn create<F>(on_subscribe: F) -> Self
    where
        F: Fn(ObserverRef<T>) -> AppResult<Subscription> + Send + Sync + 'static,
    {
        Self {
            on_subscribe: Arc::new(on_subscribe),
        }
    }

    /// Source emitting each item of `items` synchronously, then completing.
    ///
    /// Emission stops early if the subscriber cancels.
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    {
        Self::create(move |observer: ObserverRef<T>| {
            for item in items.clone() {
                if observer.is_cancelled() {
                    return Ok(Subscription::empty());
                }
                observer.on_next(item);
            }
            observer.on_completed();
            Ok(Subscription::empty())
        })
    }

    /// Subscribe on the calling thread.
    ///
    /// Without a `subscribe_on` upstream, the whole source runs before this returns.
    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: Observer<T> + 'static,
    {
        self.subscribe_shared(Arc::new(observer))
    }

    /// Subscribe an already shared observer.
    pub fn subscribe_shared(&self, observer: ObserverRef<T>) -> Subscription {
        let token = Subscription::new();
        let safe: ObserverRef<T> = Arc::new(SafeObserver::new(observer, token.clone()));

        match (self.on_subscribe)(Arc::clone(&safe)) {
            Ok(upstream) => token.add(upstream),
            Err(err) => {
                debug!(error = %err, "Subscribe action failed");
                safe.on_error(SchedulerError::continuation_failed(&err));
            }
        }
        token
    }

    /// Run the subscribe action of this source as a unit of work on `scheduler`.
    ///
    /// The observer's `on_error` is the chain's failure sink: a failing or panicking subscribe
    /// action, or a submission the scheduler rejects, terminates the subscription with an error.
    #[must_use]
    pub fn subscribe_on(&self, scheduler: Scheduler) -> Self {
        let source = self.clone();
        Self::create(move |observer: ObserverRef<T>| {
            let source = source.clone();
            let sink = Arc::clone(&observer);
            let rejected = Arc::clone(&observer);
            let action = Continuation::with_failure_sink(
                move |_: &Scheduler, observer: ObserverRef<T>, _: &Continuation<ObserverRef<T>>| {
                    (source.on_subscribe)(observer)
                },
                move |err| sink.on_error(err),
            );
            match scheduler.schedule_with(observer, action) {
                Ok(token) => Ok(token),
                Err(err) => {
                    debug!(error = %err, scheduler = %scheduler.kind(), "Subscribe action rejected");
                    rejected.on_error(err);
                    Ok(Subscription::empty())
                }
            }
        })
    }

    /// Subscribe with the subscribe action running on `scheduler`.
    pub fn subscribe_with<O>(&self, observer: O, scheduler: Scheduler) -> Subscription
    where
        O: Observer<T> + 'static,
    {
        self.subscribe_on(scheduler).subscribe(observer)
    }
}
