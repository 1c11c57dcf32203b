//! Spinning read-write lock.
//!
//! Admission goes through the ticket lock: readers take a ticket, wait for
//! their turn, register in `readers` and immediately serve the next ticket;
//! writers take a ticket, wait for their turn, then wait for `readers` to
//! drain and keep the turn until they unlock. Writers are FIFO among
//! themselves. Readers that draw a ticket after a writer queue behind it.
//! Not recursive.

use core::sync::atomic::{AtomicU32, Ordering};

use super::attr::ProcessShared;
use super::spin::SpinLock;
use crate::atomic::spin_until;
use crate::error::{PthreadError, PthreadResult};

/// Busy-waiting reader/writer lock. The all-zero value is unlocked.
#[derive(Debug, Default)]
#[repr(C)]
pub struct SpinRwLock {
    admission: SpinLock,
    readers: AtomicU32,
}

impl SpinRwLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            admission: SpinLock::new(),
            readers: AtomicU32::new(0),
        }
    }

    pub fn with_pshared(pshared: ProcessShared) -> PthreadResult<Self> {
        pshared.require_private()?;
        Ok(Self::new())
    }

    pub fn read_lock(&self) {
        let ticket = self.admission.draw_ticket();
        self.admission.wait_turn(ticket);
        self.readers.fetch_add(1, Ordering::Acquire);
        self.admission.serve_next();
    }

    /// Succeeds only if the lock is immediately free for admission.
    pub fn try_read_lock(&self) -> PthreadResult<()> {
        self.admission.try_lock()?;
        self.readers.fetch_add(1, Ordering::Acquire);
        self.admission.serve_next();
        Ok(())
    }

    pub fn read_unlock(&self) -> PthreadResult<()> {
        self.readers
            .fetch_update(Ordering::Release, Ordering::Relaxed, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| PthreadError::PermissionDenied)
    }

    pub fn write_lock(&self) {
        let ticket = self.admission.draw_ticket();
        self.admission.wait_turn(ticket);
        spin_until(|| self.readers.load(Ordering::Acquire) == 0);
    }

    /// Succeeds only with no readers and no queued tickets.
    pub fn try_write_lock(&self) -> PthreadResult<()> {
        self.admission.try_lock()?;
        if self.readers.load(Ordering::Acquire) != 0 {
            self.admission.serve_next();
            return Err(PthreadError::Busy);
        }
        Ok(())
    }

    pub fn write_unlock(&self) -> PthreadResult<()> {
        self.admission.unlock()
    }

    /// Readers currently inside.
    #[must_use]
    pub fn reader_count(&self) -> u32 {
        self.readers.load(Ordering::Relaxed)
    }

    /// A held or queued lock is `Busy`.
    pub fn destroy(&mut self) -> PthreadResult<()> {
        if self.admission.is_locked() || self.reader_count() != 0 {
            return Err(PthreadError::Busy);
        }
        *self = Self::new();
        Ok(())
    }
}
