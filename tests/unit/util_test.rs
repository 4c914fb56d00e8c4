//! Tests for shared utilities

use rx_schedulers::util::{current_thread_name, init_tracing, CountDownLatch};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_latch_counts_down_to_zero() {
    let latch = CountDownLatch::new(2);
    assert_eq!(latch.count(), 2);
    latch.count_down();
    latch.count_down();
    latch.count_down();
    assert_eq!(latch.count(), 0);
    assert!(latch.wait_timeout(Duration::from_millis(1)));
}

#[test]
fn test_latch_wakes_multiple_waiters() {
    let latch = Arc::new(CountDownLatch::new(1));
    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let latch = Arc::clone(&latch);
            thread::spawn(move || {
                latch.wait();
                true
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(10));
    latch.count_down();
    for w in waiters {
        assert!(w.join().expect("waiter"));
    }
}

#[test]
fn test_current_thread_name_in_named_thread() {
    let name = thread::Builder::new()
        .name("RxWorker-7".to_string())
        .spawn(current_thread_name)
        .expect("spawn")
        .join()
        .expect("join");
    assert_eq!(name, "RxWorker-7");
}

#[test]
fn test_init_tracing_twice() {
    init_tracing();
    init_tracing();
}
