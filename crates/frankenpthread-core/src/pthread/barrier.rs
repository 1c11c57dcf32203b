//! Reusable barrier over two alternating kernel semaphores.
//!
//! Each generation blocks on the semaphore selected by `index`. The last
//! arrival flips `index` before releasing the old one, so a thread that
//! races ahead into the next generation blocks on the other semaphore and
//! cannot consume a permit meant for a straggler of the previous one.

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use super::attr::BarrierAttr;
use crate::error::{PthreadError, PthreadResult};
use crate::host::KernelSemaphore;

/// Returned by `pthread_barrier_wait` to exactly one caller per generation.
pub const PTHREAD_BARRIER_SERIAL_THREAD: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierWaitResult {
    /// The last arrival of its generation.
    Serial,
    Participant,
}

impl BarrierWaitResult {
    #[must_use]
    pub const fn is_serial(self) -> bool {
        matches!(self, Self::Serial)
    }

    /// ABI return value: [`PTHREAD_BARRIER_SERIAL_THREAD`] or 0.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Serial => PTHREAD_BARRIER_SERIAL_THREAD,
            Self::Participant => 0,
        }
    }
}

#[derive(Debug)]
pub struct Barrier {
    sems: [KernelSemaphore; 2],
    total: u32,
    count: AtomicU32,
    index: AtomicUsize,
}

impl Barrier {
    /// `pthread_barrier_init`.
    pub fn new(count: u32, attr: &BarrierAttr) -> PthreadResult<Self> {
        attr.pshared.require_private()?;
        if count < 1 {
            return Err(PthreadError::InvalidArgument);
        }
        let sems = [
            KernelSemaphore::new(0, count).map_err(|_| PthreadError::ResourceExhausted)?,
            KernelSemaphore::new(0, count).map_err(|_| PthreadError::ResourceExhausted)?,
        ];
        Ok(Self {
            sems,
            total: count,
            count: AtomicU32::new(count),
            index: AtomicUsize::new(0),
        })
    }

    /// `pthread_barrier_wait`.
    pub fn wait(&self) -> PthreadResult<BarrierWaitResult> {
        let index = self.index.load(Ordering::SeqCst);
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.index.store(index ^ 1, Ordering::SeqCst);
            self.count.store(self.total, Ordering::SeqCst);
            self.sems[index].release(self.total - 1)?;
            return Ok(BarrierWaitResult::Serial);
        }
        self.sems[index].acquire(None);
        Ok(BarrierWaitResult::Participant)
    }

    /// Party size.
    #[must_use]
    pub fn parties(&self) -> u32 {
        self.total
    }

    /// `pthread_barrier_destroy`. The caller guarantees no thread is still
    /// inside [`wait`](Self::wait).
    pub fn destroy(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pthread::attr::ProcessShared;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn rejects_zero_parties_and_shared() {
        assert_eq!(
            Barrier::new(0, &BarrierAttr::default()).err(),
            Some(PthreadError::InvalidArgument)
        );
        let shared = BarrierAttr {
            pshared: ProcessShared::Shared,
        };
        assert_eq!(Barrier::new(2, &shared).err(), Some(PthreadError::Unsupported));
    }

    #[test]
    fn single_party_is_always_serial() {
        let barrier = Barrier::new(1, &BarrierAttr::default()).unwrap();
        for _ in 0..3 {
            assert_eq!(barrier.wait(), Ok(BarrierWaitResult::Serial));
        }
        barrier.destroy();
    }

    #[test]
    fn one_serial_thread_per_generation() {
        const PARTIES: u32 = 4;
        const ROUNDS: usize = 50;
        let barrier = Arc::new(Barrier::new(PARTIES, &BarrierAttr::default()).unwrap());
        let serials = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..PARTIES)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let serials = Arc::clone(&serials);
                std::thread::spawn(move || {
                    for _ in 0..ROUNDS {
                        if barrier.wait().unwrap().is_serial() {
                            serials.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(serials.load(Ordering::SeqCst), ROUNDS);
    }

    #[test]
    fn raw_result_values() {
        assert_eq!(BarrierWaitResult::Serial.as_raw(), -1);
        assert_eq!(BarrierWaitResult::Participant.as_raw(), 0);
    }
}
