//! Auto-reset kernel event.
//!
//! `set` latches the event; exactly one `wait` consumes the latch. A `set`
//! that happens before the matching `wait` is not lost.

use core::time::Duration;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct KernelEvent {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl KernelEvent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the event and wake one waiter.
    pub fn set(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.cond.notify_one();
    }

    /// Wait for the latch, consuming it. `None` waits forever.
    ///
    /// Returns `false` on timeout.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut signaled = self.signaled.lock();
        while !*signaled {
            match (timeout, deadline) {
                (Some(_), Some(at)) => {
                    if self.cond.wait_until(&mut signaled, at).timed_out() && !*signaled {
                        return false;
                    }
                }
                // No timeout, or one too large to represent.
                _ => self.cond.wait(&mut signaled),
            }
        }
        *signaled = false;
        true
    }

    /// True when a `set` is latched and not yet consumed.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.signaled.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn set_before_wait_is_not_lost() {
        let ev = KernelEvent::new();
        ev.set();
        assert!(ev.is_set());
        assert!(ev.wait(Some(Duration::ZERO)));
        assert!(!ev.is_set());
    }

    #[test]
    fn wait_times_out_without_set() {
        let ev = KernelEvent::new();
        let start = Instant::now();
        assert!(!ev.wait(Some(Duration::from_millis(20))));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn multiple_sets_coalesce() {
        let ev = KernelEvent::new();
        ev.set();
        ev.set();
        assert!(ev.wait(Some(Duration::ZERO)));
        assert!(!ev.wait(Some(Duration::ZERO)));
    }

    #[test]
    fn set_wakes_blocked_waiter() {
        let ev = Arc::new(KernelEvent::new());
        let waiter = {
            let ev = Arc::clone(&ev);
            std::thread::spawn(move || ev.wait(None))
        };
        std::thread::sleep(Duration::from_millis(10));
        ev.set();
        assert!(waiter.join().unwrap());
    }
}
