//! Tests for configuration validation

use rx_schedulers::config::pool::{
    COMPUTATION_THREAD_PREFIX, DEFAULT_IO_KEEP_ALIVE_MS, IO_THREAD_PREFIX, MIN_THREAD_STACK_SIZE,
};
use rx_schedulers::config::{PoolPolicy, SchedulersConfig, WorkerPoolConfig};
use rx_schedulers::core::SchedulerKind;

#[test]
fn test_pool_config_defaults() {
    let computation = WorkerPoolConfig::computation();
    assert_eq!(computation.thread_name_prefix, COMPUTATION_THREAD_PREFIX);
    assert_eq!(computation.kind(), SchedulerKind::Computation);
    assert!(computation.max_workers().unwrap_or(0) >= 1);

    let io = WorkerPoolConfig::io();
    assert_eq!(io.thread_name_prefix, IO_THREAD_PREFIX);
    assert_eq!(
        io.policy,
        PoolPolicy::Elastic {
            keep_alive_ms: DEFAULT_IO_KEEP_ALIVE_MS
        }
    );
    assert_eq!(io.max_workers(), None);
}

#[test]
fn test_pool_config_invalid_max_workers() {
    let invalid = WorkerPoolConfig::computation().with_max_workers(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_invalid_keep_alive() {
    let invalid = WorkerPoolConfig::io().with_keep_alive_ms(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_invalid_prefix() {
    let invalid = WorkerPoolConfig::io().with_thread_name_prefix("   ");
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_stack_size_floor() {
    let small = WorkerPoolConfig::computation().with_thread_stack_size(MIN_THREAD_STACK_SIZE - 1);
    assert!(small.validate().is_err());
    let ok = WorkerPoolConfig::computation().with_thread_stack_size(MIN_THREAD_STACK_SIZE);
    assert!(ok.validate().is_ok());
}

#[test]
fn test_schedulers_config_requires_distinct_prefixes() {
    let cfg = SchedulersConfig {
        computation: WorkerPoolConfig::computation().with_thread_name_prefix("Shared"),
        io: WorkerPoolConfig::io().with_thread_name_prefix("Shared"),
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_schedulers_config_requires_matching_policies() {
    let cfg = SchedulersConfig {
        computation: WorkerPoolConfig::computation().with_keep_alive_ms(10),
        io: WorkerPoolConfig::io(),
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_schedulers_config_from_json() {
    let json = r#"
    {
        "computation": {
            "thread_name_prefix": "Crunch",
            "policy": { "type": "bounded", "max_workers": 4 }
        },
        "io": {
            "thread_name_prefix": "Blocking",
            "policy": { "type": "elastic", "keep_alive_ms": 1500 },
            "thread_stack_size": 524288
        }
    }
    "#;

    let cfg = SchedulersConfig::from_json_str(json).expect("valid json config");
    assert_eq!(cfg.computation.max_workers(), Some(4));
    assert_eq!(cfg.computation.thread_stack_size, None);
    assert_eq!(cfg.io.policy, PoolPolicy::Elastic { keep_alive_ms: 1500 });
    assert_eq!(cfg.io.thread_stack_size, Some(524_288));
}

#[test]
fn test_schedulers_config_from_json_rejects_invalid() {
    let json = r#"
    {
        "computation": { "thread_name_prefix": "A", "policy": { "type": "bounded", "max_workers": 0 } },
        "io": { "thread_name_prefix": "B", "policy": { "type": "elastic", "keep_alive_ms": 10 } }
    }
    "#;
    let err = SchedulersConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("computation"), "got {err}");

    assert!(SchedulersConfig::from_json_str("{ not json").is_err());
}

#[test]
fn test_schedulers_config_json_roundtrip_keeps_policy_tag() {
    let json = serde_json::to_string(&SchedulersConfig::default()).expect("serialize");
    assert!(json.contains(r#""type":"bounded""#));
    assert!(json.contains(r#""type":"elastic""#));
}

#[test]
fn test_from_lookup_stack_size_applies_to_both_pools() {
    let cfg = SchedulersConfig::from_lookup(|key| {
        (key == "RX_THREAD_STACK_SIZE").then(|| "1048576".to_string())
    })
    .expect("valid lookup");
    assert_eq!(cfg.computation.thread_stack_size, Some(1_048_576));
    assert_eq!(cfg.io.thread_stack_size, Some(1_048_576));
}
