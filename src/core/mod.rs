//! Scheduling core: tokens, continuations, the scheduler contract and its executors.

pub mod continuation;
pub mod error;
mod immediate;
pub mod registry;
pub mod scheduler;
pub mod subscription;
mod trampoline;
pub mod worker_pool;

pub use continuation::{Continuation, FailureSink, StepFn};
pub use error::{AppResult, SchedulerError};
pub use registry::Schedulers;
pub use scheduler::{Scheduler, SchedulerKind};
pub use subscription::Subscription;
pub use worker_pool::{PoolStats, WorkerPool};
