//! Process-wide scheduler registry.
//!
//! Exactly four named schedulers exist per process. The pool-backed ones are created on first
//! use and live until the process exits; their configuration comes from
//! [`Schedulers::configure`] if it was called first, otherwise from
//! [`SchedulersConfig::from_env`].

use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::config::SchedulersConfig;

use super::error::SchedulerError;
use super::scheduler::Scheduler;
use super::worker_pool::WorkerPool;

static CONFIG: OnceLock<SchedulersConfig> = OnceLock::new();
static IMMEDIATE: OnceLock<Scheduler> = OnceLock::new();
static CURRENT_THREAD: OnceLock<Scheduler> = OnceLock::new();
static COMPUTATION: OnceLock<Arc<WorkerPool>> = OnceLock::new();
static IO: OnceLock<Arc<WorkerPool>> = OnceLock::new();

/// Entry point to the process-wide schedulers.
#[derive(Debug, Clone, Copy)]
pub struct Schedulers;

impl Schedulers {
    /// Install the pool configuration.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` if `config` does not validate
    /// - `SchedulerError::AlreadyConfigured` if configuration was already installed or resolved
    ///   by a first use of a pool scheduler
    pub fn configure(config: SchedulersConfig) -> Result<(), SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        CONFIG
            .set(config)
            .map_err(|_| SchedulerError::AlreadyConfigured)
    }

    /// The configuration the pools use (resolving it now if needed).
    pub fn config() -> &'static SchedulersConfig {
        CONFIG.get_or_init(|| {
            SchedulersConfig::from_env().unwrap_or_else(|err| {
                warn!(error = %err, "Ignoring invalid scheduler environment, using defaults");
                SchedulersConfig::default()
            })
        })
    }

    /// Runs work synchronously on the calling thread.
    pub fn immediate() -> Scheduler {
        IMMEDIATE.get_or_init(Scheduler::immediate).clone()
    }

    /// Trampolines work through the calling thread's queue.
    pub fn current_thread() -> Scheduler {
        CURRENT_THREAD.get_or_init(Scheduler::current_thread).clone()
    }

    /// Bounded pool sized to the number of processors.
    pub fn computation() -> Scheduler {
        Self::computation_pool().scheduler()
    }

    /// Elastic pool for blocking work.
    pub fn io() -> Scheduler {
        Self::io_pool().scheduler()
    }

    /// The pool behind [`Schedulers::computation`], e.g. for statistics.
    pub fn computation_pool() -> &'static Arc<WorkerPool> {
        COMPUTATION.get_or_init(|| WorkerPool::from_validated(Self::config().computation.clone()))
    }

    /// The pool behind [`Schedulers::io`].
    pub fn io_pool() -> &'static Arc<WorkerPool> {
        IO.get_or_init(|| WorkerPool::from_validated(Self::config().io.clone()))
    }
}
