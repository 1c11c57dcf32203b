//! Spin-wait helpers shared by the lock implementations.
//!
//! Every busy-wait in the crate goes through [`spin_until`] so that waiters
//! issue the CPU relax hint and periodically give up their time slice. The
//! latter matters on oversubscribed hosts: a preempted ticket holder otherwise
//! stalls every spinner queued behind it for a full quantum.

use core::sync::atomic::{AtomicU32, Ordering};

/// Spin iterations between voluntary yields.
pub const YIELD_INTERVAL: u32 = 128;

/// Spin-wait hint (`pause` on x86, `yield` on aarch64).
#[inline(always)]
pub fn cpu_relax() {
    core::hint::spin_loop();
}

/// Busy-wait until `done` returns true.
#[inline]
pub fn spin_until(mut done: impl FnMut() -> bool) {
    let mut spins: u32 = 0;
    while !done() {
        spins = spins.wrapping_add(1);
        if spins % YIELD_INTERVAL == 0 {
            std::thread::yield_now();
        } else {
            cpu_relax();
        }
    }
}

/// Single compare-and-exchange with acquire ordering on success.
#[inline]
pub fn try_transition(word: &AtomicU32, from: u32, to: u32) -> bool {
    word.compare_exchange(from, to, Ordering::Acquire, Ordering::Relaxed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn transition_only_from_expected_value() {
        let word = AtomicU32::new(0);
        assert!(try_transition(&word, 0, 1));
        assert!(!try_transition(&word, 0, 1));
        assert_eq!(word.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn spin_until_observes_other_thread() {
        let flag = Arc::new(AtomicBool::new(false));
        let setter = {
            let flag = Arc::clone(&flag);
            std::thread::spawn(move || flag.store(true, Ordering::Release))
        };
        spin_until(|| flag.load(Ordering::Acquire));
        setter.join().unwrap();
    }
}
