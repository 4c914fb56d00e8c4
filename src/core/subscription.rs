//! Cancellation tokens shared between the issuer of work and its executors.
//!
//! A [`Subscription`] is a one-way flag: active until the first [`cancel`](Subscription::cancel),
//! cancelled forever after. Reading the flag never has side effects, and cancelling twice is a
//! no-op, so any number of threads may hold a clone and race on it.
//!
//! Tokens can be linked with [`add`](Subscription::add): cancelling the upstream token cancels
//! every token linked below it. A token also has one replaceable forwarding slot: schedulers
//! point a chain's head token at the handle of the chain's *next* unit of work and overwrite it on
//! every step, so the head reaches the pending step while the tokens of executed steps are
//! released.
//!
//! ```
//! use rx_schedulers::core::Subscription;
//!
//! let outer = Subscription::new();
//! let inner = Subscription::new();
//! outer.add(inner.clone());
//!
//! assert!(outer.cancel());
//! assert!(!outer.cancel());
//! assert!(inner.is_cancelled());
//! ```

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

struct Inner {
    cancelled: AtomicBool,
    linked: Mutex<Vec<Subscription>>,
    forward: Mutex<Forward>,
}

/// Forwarding target plus the step generation that installed it.
#[derive(Default)]
struct Forward {
    generation: u64,
    target: Option<Subscription>,
}

impl Drop for Inner {
    // Links and forwards may nest arbitrarily deep; unlink iteratively so
    // dropping the head never recurses once per token.
    fn drop(&mut self) {
        let mut pending = mem::take(self.linked.get_mut());
        pending.extend(self.forward.get_mut().target.take());
        while let Some(sub) = pending.pop() {
            if let Ok(mut inner) = Arc::try_unwrap(sub.inner) {
                pending.append(inner.linked.get_mut());
                pending.extend(inner.forward.get_mut().target.take());
            }
        }
    }
}

/// Cancellation handle for scheduled work.
///
/// Cloning yields another handle to the same flag.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

impl Subscription {
    /// Create an active token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                linked: Mutex::new(Vec::new()),
                forward: Mutex::new(Forward::default()),
            }),
        }
    }

    /// A token nobody else observes; returned by steps that end their chain.
    #[must_use]
    pub fn empty() -> Self {
        Self::new()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    ///
    /// Returns `true` for the call that performed the transition and `false` for
    /// every later call. Linked tokens are cancelled as well.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }

        let mut pending = mem::take(&mut *self.inner.linked.lock());
        pending.extend(self.inner.forward.lock().target.take());
        while let Some(sub) = pending.pop() {
            if !sub.inner.cancelled.swap(true, Ordering::AcqRel) {
                pending.append(&mut sub.inner.linked.lock());
                pending.extend(sub.inner.forward.lock().target.take());
            }
        }
        true
    }

    /// Link `other` below this token.
    ///
    /// If this token is already cancelled, `other` is cancelled immediately.
    pub fn add(&self, other: Self) {
        if self.ptr_eq(&other) {
            return;
        }
        {
            let mut linked = self.inner.linked.lock();
            if !self.is_cancelled() {
                linked.push(other);
                return;
            }
        }
        other.cancel();
    }

    /// Replace the forwarding target with `next`, releasing the previous one.
    ///
    /// Cancelling this token cancels whatever it forwards to at that moment. If this token is
    /// already cancelled, `next` is cancelled immediately. A target installed by an older
    /// `generation` than the current one is stale and ignored.
    pub(crate) fn forward_to(&self, generation: u64, next: Self) {
        if self.ptr_eq(&next) {
            return;
        }
        let mut slot = self.inner.forward.lock();
        if self.is_cancelled() {
            drop(slot);
            next.cancel();
            return;
        }
        if generation < slot.generation {
            return;
        }
        slot.generation = generation;
        let released = slot.target.replace(next);
        drop(slot);
        drop(released);
    }

    /// Whether both handles point at the same flag.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
impl Subscription {
    /// Number of tokens reachable from this one through links and forwarding.
    pub(crate) fn retained(&self) -> usize {
        let mut seen = 0;
        let mut pending = vec![self.clone()];
        while let Some(sub) = pending.pop() {
            pending.extend(sub.inner.linked.lock().iter().cloned());
            pending.extend(sub.inner.forward.lock().target.iter().cloned());
            seen += 1;
        }
        seen - 1
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .field("linked", &self.inner.linked.lock().len())
            .finish()
    }
}
