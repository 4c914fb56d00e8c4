//! Builders to construct worker pools and scheduler sets from configuration.

use std::sync::Arc;

use crate::config::{SchedulersConfig, WorkerPoolConfig};
use crate::core::{Scheduler, SchedulerError, WorkerPool};

/// Build a standalone worker pool from `cfg`.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` if `cfg` does not validate.
pub fn build_pool(cfg: &WorkerPoolConfig) -> Result<Arc<WorkerPool>, SchedulerError> {
    WorkerPool::new(cfg.clone())
}

/// Computation and I/O pools owned by the caller rather than the process registry.
#[derive(Clone)]
pub struct SchedulerSet {
    computation: Arc<WorkerPool>,
    io: Arc<WorkerPool>,
}

impl SchedulerSet {
    /// Scheduler over the bounded pool.
    #[must_use]
    pub fn computation(&self) -> Scheduler {
        self.computation.scheduler()
    }

    /// Scheduler over the elastic pool.
    #[must_use]
    pub fn io(&self) -> Scheduler {
        self.io.scheduler()
    }

    /// The bounded pool.
    #[must_use]
    pub const fn computation_pool(&self) -> &Arc<WorkerPool> {
        &self.computation
    }

    /// The elastic pool.
    #[must_use]
    pub const fn io_pool(&self) -> &Arc<WorkerPool> {
        &self.io
    }

    /// Shut down both pools.
    pub fn shutdown(&self) {
        self.computation.shutdown();
        self.io.shutdown();
    }
}

impl std::fmt::Debug for SchedulerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerSet")
            .field("computation", &self.computation.name())
            .field("io", &self.io.name())
            .finish()
    }
}

/// Build both pools from a scheduler configuration.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` if `cfg` does not validate.
pub fn build_schedulers(cfg: &SchedulersConfig) -> Result<SchedulerSet, SchedulerError> {
    cfg.validate()
        .map_err(|e| SchedulerError::InvalidConfig(format!("config invalid: {e}")))?;

    Ok(SchedulerSet {
        computation: build_pool(&cfg.computation)?,
        io: build_pool(&cfg.io)?,
    })
}
