//! Tests for cancellation tokens

use rx_schedulers::core::Subscription;
use std::sync::Arc;
use std::thread;

#[test]
fn test_cancel_is_idempotent() {
    let token = Subscription::new();
    assert!(!token.is_cancelled());
    assert!(token.cancel());
    assert!(!token.cancel());
    assert!(token.is_cancelled());
}

#[test]
fn test_clones_share_state() {
    let token = Subscription::new();
    let other = token.clone();
    assert!(token.ptr_eq(&other));
    other.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn test_empty_is_independent() {
    let a = Subscription::empty();
    let b = Subscription::empty();
    assert!(!a.ptr_eq(&b));
    a.cancel();
    assert!(!b.is_cancelled());
}

#[test]
fn test_add_after_cancel_cancels_immediately() {
    let outer = Subscription::new();
    outer.cancel();
    let inner = Subscription::new();
    outer.add(inner.clone());
    assert!(inner.is_cancelled());
}

#[test]
fn test_cancel_does_not_propagate_upwards() {
    let outer = Subscription::new();
    let inner = Subscription::new();
    outer.add(inner.clone());
    inner.cancel();
    assert!(!outer.is_cancelled());
}

#[test]
fn test_cancel_from_many_threads() {
    let token = Subscription::new();
    let watchers: Vec<_> = (0..4).map(|_| Subscription::new()).collect();
    for w in &watchers {
        token.add(w.clone());
    }

    let token = Arc::new(token);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let token = Arc::clone(&token);
            thread::spawn(move || token.cancel())
        })
        .collect();
    let transitions = handles
        .into_iter()
        .map(|h| h.join().expect("join"))
        .filter(|won| *won)
        .count();

    assert_eq!(transitions, 1);
    assert!(watchers.iter().all(Subscription::is_cancelled));
}
