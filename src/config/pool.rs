//! Worker pool and scheduler registry configuration.

use std::env;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::SchedulerKind;

/// Thread name prefix of the computation pool.
pub const COMPUTATION_THREAD_PREFIX: &str = "RxComputationThreadPool";
/// Thread name prefix of the I/O pool.
pub const IO_THREAD_PREFIX: &str = "RxIOThreadPool";
/// Default keep-alive of idle I/O workers.
pub const DEFAULT_IO_KEEP_ALIVE_MS: u64 = 60_000;
/// Smallest stack size accepted for worker threads.
pub const MIN_THREAD_STACK_SIZE: usize = 16 * 1024;

/// Environment variable overriding the computation pool size.
pub const ENV_COMPUTATION_THREADS: &str = "RX_COMPUTATION_THREADS";
/// Environment variable overriding the I/O keep-alive in milliseconds.
pub const ENV_IO_KEEP_ALIVE_MS: &str = "RX_IO_KEEP_ALIVE_MS";
/// Environment variable overriding the computation thread prefix.
pub const ENV_COMPUTATION_THREAD_PREFIX: &str = "RX_COMPUTATION_THREAD_PREFIX";
/// Environment variable overriding the I/O thread prefix.
pub const ENV_IO_THREAD_PREFIX: &str = "RX_IO_THREAD_PREFIX";
/// Environment variable setting the worker stack size in bytes.
pub const ENV_THREAD_STACK_SIZE: &str = "RX_THREAD_STACK_SIZE";

/// How a pool grows and shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PoolPolicy {
    /// At most `max_workers` threads, started on demand and never retired.
    Bounded {
        /// Upper bound on live workers.
        max_workers: usize,
    },
    /// A new thread whenever no idle one is available; idle threads retire after the keep-alive.
    Elastic {
        /// Idle time before a worker retires.
        keep_alive_ms: u64,
    },
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Worker threads are named `{prefix}-{n}`.
    pub thread_name_prefix: String,
    /// Growth policy.
    pub policy: PoolPolicy,
    /// Stack size for worker threads; platform default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_stack_size: Option<usize>,
}

impl WorkerPoolConfig {
    /// Compute-bound defaults: one worker per available processor.
    #[must_use]
    pub fn computation() -> Self {
        Self {
            thread_name_prefix: COMPUTATION_THREAD_PREFIX.to_string(),
            policy: PoolPolicy::Bounded {
                max_workers: num_cpus::get(),
            },
            thread_stack_size: None,
        }
    }

    /// I/O-bound defaults: elastic with a one minute keep-alive.
    #[must_use]
    pub fn io() -> Self {
        Self {
            thread_name_prefix: IO_THREAD_PREFIX.to_string(),
            policy: PoolPolicy::Elastic {
                keep_alive_ms: DEFAULT_IO_KEEP_ALIVE_MS,
            },
            thread_stack_size: None,
        }
    }

    /// Set the thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Make the pool bounded with `max_workers` threads.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.policy = PoolPolicy::Bounded { max_workers };
        self
    }

    /// Make the pool elastic with the given keep-alive.
    #[must_use]
    pub const fn with_keep_alive_ms(mut self, keep_alive_ms: u64) -> Self {
        self.policy = PoolPolicy::Elastic { keep_alive_ms };
        self
    }

    /// Set the worker stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Scheduler kind implemented by a pool with this configuration.
    #[must_use]
    pub const fn kind(&self) -> SchedulerKind {
        match self.policy {
            PoolPolicy::Bounded { .. } => SchedulerKind::Computation,
            PoolPolicy::Elastic { .. } => SchedulerKind::Io,
        }
    }

    /// Worker bound, if any.
    #[must_use]
    pub const fn max_workers(&self) -> Option<usize> {
        match self.policy {
            PoolPolicy::Bounded { max_workers } => Some(max_workers),
            PoolPolicy::Elastic { .. } => None,
        }
    }

    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        match self.policy {
            PoolPolicy::Bounded { max_workers: 0 } => {
                return Err("max_workers must be greater than 0".into());
            }
            PoolPolicy::Elastic { keep_alive_ms: 0 } => {
                return Err("keep_alive_ms must be greater than 0".into());
            }
            _ => {}
        }
        if let Some(size) = self.thread_stack_size {
            if size < MIN_THREAD_STACK_SIZE {
                return Err(format!(
                    "thread_stack_size must be at least {MIN_THREAD_STACK_SIZE} bytes"
                ));
            }
        }
        Ok(())
    }
}

/// Configuration of the process-wide computation and I/O pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulersConfig {
    /// Computation pool.
    pub computation: WorkerPoolConfig,
    /// I/O pool.
    pub io: WorkerPoolConfig,
}

impl Default for SchedulersConfig {
    fn default() -> Self {
        Self {
            computation: WorkerPoolConfig::computation(),
            io: WorkerPoolConfig::io(),
        }
    }
}

impl SchedulersConfig {
    /// Validate both pools and make sure their threads are distinguishable.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        self.computation
            .validate()
            .map_err(|e| format!("pool `computation` invalid: {e}"))?;
        self.io
            .validate()
            .map_err(|e| format!("pool `io` invalid: {e}"))?;
        if self.computation.thread_name_prefix == self.io.thread_name_prefix {
            return Err("computation and io pools must use distinct thread name prefixes".into());
        }
        if self.computation.kind() != SchedulerKind::Computation {
            return Err("pool `computation` must be bounded".into());
        }
        if self.io.kind() != SchedulerKind::Io {
            return Err("pool `io` must be elastic".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by the process environment.
    ///
    /// A `.env` file in the working directory (or a parent) is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns a message naming the malformed variable, or the validation failure.
    pub fn from_env() -> Result<Self, String> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded scheduler settings from .env");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from defaults overridden by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the malformed variable, or the validation failure.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(threads) = parse_var::<usize, _>(&lookup, ENV_COMPUTATION_THREADS)? {
            cfg.computation = cfg.computation.with_max_workers(threads);
        }
        if let Some(keep_alive) = parse_var::<u64, _>(&lookup, ENV_IO_KEEP_ALIVE_MS)? {
            cfg.io = cfg.io.with_keep_alive_ms(keep_alive);
        }
        if let Some(prefix) = lookup(ENV_COMPUTATION_THREAD_PREFIX) {
            cfg.computation.thread_name_prefix = prefix;
        }
        if let Some(prefix) = lookup(ENV_IO_THREAD_PREFIX) {
            cfg.io.thread_name_prefix = prefix;
        }
        if let Some(size) = parse_var::<usize, _>(&lookup, ENV_THREAD_STACK_SIZE)? {
            cfg.computation.thread_stack_size = Some(size);
            cfg.io.thread_stack_size = Some(size);
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| format!("{key}={raw:?} is invalid: {e}"))
        })
        .transpose()
}
