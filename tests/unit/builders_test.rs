//! Tests for pool builders

use rx_schedulers::builders::{build_pool, build_schedulers};
use rx_schedulers::config::{SchedulersConfig, WorkerPoolConfig};
use rx_schedulers::core::{SchedulerError, SchedulerKind, Subscription};
use rx_schedulers::util::{current_thread_name, CountDownLatch};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_build_pool_uses_prefix() {
    let pool = build_pool(&WorkerPoolConfig::io().with_thread_name_prefix("BuilderIo"))
        .expect("Failed to build pool");
    let name = Arc::new(Mutex::new(String::new()));
    let done = Arc::new(CountDownLatch::new(1));

    let (seen, signal) = (Arc::clone(&name), Arc::clone(&done));
    pool.scheduler()
        .schedule(move || {
            *seen.lock() = current_thread_name();
            signal.count_down();
            Ok(Subscription::empty())
        })
        .expect("Failed to submit");

    assert!(done.wait_timeout(Duration::from_secs(10)));
    assert_eq!(*name.lock(), "BuilderIo-1");
    pool.shutdown();
}

#[test]
fn test_build_schedulers_isolated_from_registry() {
    let cfg = SchedulersConfig {
        computation: WorkerPoolConfig::computation()
            .with_thread_name_prefix("SetComp")
            .with_max_workers(2),
        io: WorkerPoolConfig::io().with_thread_name_prefix("SetIo"),
    };
    let set = build_schedulers(&cfg).expect("Failed to build schedulers");

    assert_eq!(set.computation().kind(), SchedulerKind::Computation);
    assert_eq!(set.io().kind(), SchedulerKind::Io);
    assert_eq!(set.computation_pool().config().max_workers(), Some(2));

    set.shutdown();
    assert!(matches!(
        set.io().schedule(|| Ok(Subscription::empty())),
        Err(SchedulerError::PoolShutdown(_))
    ));
}

#[test]
fn test_build_schedulers_rejects_invalid() {
    let cfg = SchedulersConfig {
        computation: WorkerPoolConfig::computation().with_thread_name_prefix("Same"),
        io: WorkerPoolConfig::io().with_thread_name_prefix("Same"),
    };
    assert!(matches!(
        build_schedulers(&cfg),
        Err(SchedulerError::InvalidConfig(_))
    ));
}
