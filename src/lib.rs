//! # rx_schedulers
//!
//! Scheduling core of a reactive stream library.
//!
//! A [`Scheduler`](core::Scheduler) decides on which execution context a unit of work runs.
//! Four variants exist per process, reachable through [`Schedulers`](core::Schedulers):
//!
//! - **Immediate**: runs work synchronously on the calling thread before `schedule` returns.
//! - **CurrentThread**: runs work on the calling thread through a per-thread FIFO trampoline,
//!   so a step that schedules its own successor never grows the stack.
//! - **Computation**: a bounded pool of `RxComputationThreadPool-{n}` threads, one per
//!   processor by default.
//! - **IO**: an elastic pool of `RxIOThreadPool-{n}` threads that grows on demand and reclaims
//!   idle workers.
//!
//! Every submission returns a [`Subscription`](core::Subscription). Cancelling it before the
//! work starts prevents it from running; once running, cancellation is cooperative: a
//! [`Continuation`](core::Continuation) checks a token it can see and stops rescheduling itself.
//!
//! ## Recursive scheduling
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use rx_schedulers::core::{Continuation, Scheduler, Subscription};
//!
//! let last = Arc::new(AtomicU32::new(0));
//! let seen = Arc::clone(&last);
//!
//! let step = Continuation::new(move |scheduler: &Scheduler, i: u32, this: &Continuation<u32>| {
//!     seen.store(i, Ordering::SeqCst);
//!     if i == 42 {
//!         return Ok(Subscription::empty());
//!     }
//!     Ok(scheduler.schedule_with(i + 1, this.clone())?)
//! });
//!
//! Scheduler::current_thread().schedule_with(0, step)?;
//! assert_eq!(last.load(Ordering::SeqCst), 42);
//! # Ok::<(), rx_schedulers::core::SchedulerError>(())
//! ```
//!
//! ## Subscribing on a pool
//!
//! ```rust
//! use std::time::Duration;
//! use std::sync::Arc;
//! use rx_schedulers::core::Schedulers;
//! use rx_schedulers::stream::{CallbackObserver, Observable};
//! use rx_schedulers::util::CountDownLatch;
//!
//! let done = Arc::new(CountDownLatch::new(1));
//! let signal = Arc::clone(&done);
//!
//! Observable::from_iter(1..=5).subscribe_with(
//!     CallbackObserver::new(|v: i32| println!("got {v}"))
//!         .with_completed(move || signal.count_down()),
//!     Schedulers::computation(),
//! );
//!
//! assert!(done.wait_timeout(Duration::from_secs(5)));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Scheduling core: tokens, continuations, schedulers and their executors.
pub mod core;
/// Configuration models for worker pools and the scheduler registry.
pub mod config;
/// Builders to construct pools and scheduler sets from configuration.
pub mod builders;
/// Observer/observable bridge running subscribe actions on a scheduler.
pub mod stream;
/// Shared utilities.
pub mod util;
