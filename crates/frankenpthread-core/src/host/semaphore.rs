//! Kernel counting semaphore with a fixed upper bound.

use core::time::Duration;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::error::{PthreadError, PthreadResult};

#[derive(Debug)]
struct Counts {
    value: u32,
    waiters: u32,
}

#[derive(Debug)]
pub struct KernelSemaphore {
    counts: Mutex<Counts>,
    cond: Condvar,
    max: u32,
}

impl KernelSemaphore {
    /// Create with `initial` permits; `initial` must not exceed `max`.
    pub fn new(initial: u32, max: u32) -> PthreadResult<Self> {
        if max == 0 || initial > max {
            return Err(PthreadError::InvalidArgument);
        }
        Ok(Self {
            counts: Mutex::new(Counts {
                value: initial,
                waiters: 0,
            }),
            cond: Condvar::new(),
            max,
        })
    }

    /// Take a permit if one is available.
    pub fn try_acquire(&self) -> bool {
        let mut counts = self.counts.lock();
        if counts.value > 0 {
            counts.value -= 1;
            true
        } else {
            false
        }
    }

    /// Block for a permit. `None` waits forever; returns `false` on timeout.
    pub fn acquire(&self, timeout: Option<Duration>) -> bool {
        self.register().acquire(timeout)
    }

    /// Count the caller as a waiter until the returned guard drops, so a
    /// wait split into several timed slices stays visible to [`waiters`]
    /// between slices.
    ///
    /// [`waiters`]: Self::waiters
    pub fn register(&self) -> Registration<'_> {
        self.counts.lock().waiters += 1;
        Registration { sem: self }
    }

    /// Add `n` permits. Fails without changing the count if the bound would
    /// be exceeded.
    pub fn release(&self, n: u32) -> PthreadResult<()> {
        if n == 0 {
            return Ok(());
        }
        let mut counts = self.counts.lock();
        match counts.value.checked_add(n) {
            Some(next) if next <= self.max => counts.value = next,
            _ => return Err(PthreadError::Overflow),
        }
        let wake = n.min(counts.waiters);
        drop(counts);
        for _ in 0..wake {
            self.cond.notify_one();
        }
        Ok(())
    }

    /// Available permits.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.counts.lock().value
    }

    /// Threads currently blocked in [`acquire`](Self::acquire).
    #[must_use]
    pub fn waiters(&self) -> u32 {
        self.counts.lock().waiters
    }

    #[must_use]
    pub fn max(&self) -> u32 {
        self.max
    }
}

/// A registered waiter on a [`KernelSemaphore`].
#[derive(Debug)]
pub struct Registration<'a> {
    sem: &'a KernelSemaphore,
}

impl Registration<'_> {
    /// Block for a permit. `None` waits forever; returns `false` on timeout.
    pub fn acquire(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut counts = self.sem.counts.lock();
        loop {
            if counts.value > 0 {
                counts.value -= 1;
                return true;
            }
            match (timeout, deadline) {
                (Some(_), Some(at)) => {
                    if self.sem.cond.wait_until(&mut counts, at).timed_out() && counts.value == 0 {
                        return false;
                    }
                }
                _ => self.sem.cond.wait(&mut counts),
            }
        }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.sem.counts.lock().waiters -= 1;
    }
}
