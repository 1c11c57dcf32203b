//! Run-once initialization.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::sched::sched_yield;

const UNSTARTED: u32 = 0;
const RUNNING: u32 = 1;
const DONE: u32 = 2;

/// `pthread_once_t`. The all-zero value is an unstarted token.
#[derive(Debug, Default)]
#[repr(C)]
pub struct Once {
    state: AtomicU32,
}

impl Once {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(UNSTARTED),
        }
    }

    /// Run `init` if no caller has completed it yet.
    ///
    /// Callers arriving while another runs `init` yield until it is done, so
    /// everything `init` wrote is visible when any caller returns. If `init`
    /// unwinds (panic, exit or cancellation), the token returns to unstarted
    /// and the next caller runs it.
    pub fn call_once(&self, init: impl FnOnce()) {
        if self.state.load(Ordering::Acquire) == DONE {
            return;
        }
        loop {
            match self.state.compare_exchange(
                UNSTARTED,
                RUNNING,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let reset = ResetOnUnwind { state: &self.state };
                    init();
                    core::mem::forget(reset);
                    self.state.store(DONE, Ordering::Release);
                    return;
                }
                Err(DONE) => return,
                Err(_) => {
                    while self.state.load(Ordering::Acquire) == RUNNING {
                        sched_yield();
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }
}

struct ResetOnUnwind<'a> {
    state: &'a AtomicU32,
}

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        self.state.store(UNSTARTED, Ordering::Release);
    }
}
