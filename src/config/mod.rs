//! Configuration models for worker pools and the scheduler registry.

pub mod pool;

pub use pool::{PoolPolicy, SchedulersConfig, WorkerPoolConfig};
