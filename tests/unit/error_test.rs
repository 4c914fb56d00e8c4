//! Tests for error types

use rx_schedulers::core::{AppResult, SchedulerError, Subscription};

#[test]
fn test_pool_shutdown_error() {
    let err = SchedulerError::PoolShutdown("RxIOThreadPool".to_string());
    assert_eq!(format!("{}", err), "pool `RxIOThreadPool` has been shut down");
}

#[test]
fn test_worker_spawn_error() {
    let err = SchedulerError::WorkerSpawn {
        name: "RxComputationThreadPool-3".to_string(),
        reason: "Resource temporarily unavailable".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "failed to spawn worker thread `RxComputationThreadPool-3`: Resource temporarily unavailable"
    );
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("max_workers must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_workers must be greater than 0"
    );
}

#[test]
fn test_already_configured_error() {
    assert_eq!(
        format!("{}", SchedulerError::AlreadyConfigured),
        "schedulers already configured"
    );
}

#[test]
fn test_chain_failure_classification() {
    assert!(SchedulerError::ContinuationFailed("x".into()).is_chain_failure());
    assert!(SchedulerError::ContinuationPanicked("x".into()).is_chain_failure());
    assert!(!SchedulerError::InvalidConfig("x".into()).is_chain_failure());
}

#[test]
fn test_scheduler_error_converts_into_app_result() {
    fn submit() -> AppResult<Subscription> {
        let rejected: Result<Subscription, SchedulerError> =
            Err(SchedulerError::PoolShutdown("io".to_string()));
        Ok(rejected?)
    }

    let err = submit().unwrap_err();
    assert_eq!(
        err.downcast_ref::<SchedulerError>(),
        Some(&SchedulerError::PoolShutdown("io".to_string()))
    );
}
