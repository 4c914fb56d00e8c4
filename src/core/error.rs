//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler components.
///
/// Continuation failures reach the chain's failure sink; submission-time
/// failures are returned to the caller of `schedule`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A continuation returned an error.
    #[error("continuation failed: {0}")]
    ContinuationFailed(String),
    /// A continuation panicked while executing.
    #[error("continuation panicked: {0}")]
    ContinuationPanicked(String),
    /// A worker thread could not be started and no live worker can take the task.
    #[error("failed to spawn worker thread `{name}`: {reason}")]
    WorkerSpawn {
        /// Name the worker thread would have carried.
        name: String,
        /// OS-level reason reported by the thread builder.
        reason: String,
    },
    /// The pool no longer accepts work.
    #[error("pool `{0}` has been shut down")]
    PoolShutdown(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The process-wide schedulers were already configured or already in use.
    #[error("schedulers already configured")]
    AlreadyConfigured,
}

impl SchedulerError {
    /// Build a continuation failure from an `anyhow` error, keeping the context chain.
    #[must_use]
    pub fn continuation_failed(err: &anyhow::Error) -> Self {
        Self::ContinuationFailed(format!("{err:#}"))
    }

    /// Whether the error terminated a chain (as opposed to rejecting a submission).
    #[must_use]
    pub const fn is_chain_failure(&self) -> bool {
        matches!(self, Self::ContinuationFailed(_) | Self::ContinuationPanicked(_))
    }
}

/// Application-facing result using anyhow for continuation bodies and subscribe actions.
pub type AppResult<T> = Result<T, anyhow::Error>;
