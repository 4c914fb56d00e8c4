//! One-shot countdown latch built on `parking_lot` primitives.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Blocks waiters until `count_down` has been called `count` times.
///
/// Used to hand-shake between the thread that subscribes and the context the work lands on.
#[derive(Debug)]
pub struct CountDownLatch {
    remaining: Mutex<usize>,
    released: Condvar,
}

impl CountDownLatch {
    /// Latch that opens after `count` decrements; a zero count starts open.
    #[must_use]
    pub const fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    /// Decrement, releasing all waiters when the count reaches zero. Saturates at zero.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.released.notify_all();
        }
    }

    /// Current count.
    #[must_use]
    pub fn count(&self) -> usize {
        *self.remaining.lock()
    }

    /// Block until the count reaches zero.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.released.wait(&mut remaining);
        }
    }

    /// Block until the count reaches zero or `timeout` elapses; returns whether it opened.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.released.wait_until(&mut remaining, deadline).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_zero_count_is_open() {
        let latch = CountDownLatch::new(0);
        latch.wait();
        assert!(latch.wait_timeout(Duration::ZERO));
        latch.count_down();
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn test_times_out_while_closed() {
        let latch = CountDownLatch::new(2);
        latch.count_down();
        assert!(!latch.wait_timeout(Duration::from_millis(20)));
        assert_eq!(latch.count(), 1);
    }

    #[test]
    fn test_releases_waiter_across_threads() {
        let latch = Arc::new(CountDownLatch::new(3));
        let waiter = {
            let latch = Arc::clone(&latch);
            std::thread::spawn(move || latch.wait_timeout(Duration::from_secs(5)))
        };
        for _ in 0..3 {
            latch.count_down();
        }
        assert!(waiter.join().expect("waiter"));
    }
}
