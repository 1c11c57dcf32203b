//! Ticket spinlock.
//!
//! Each acquirer draws a ticket with fetch-and-add and spins until the
//! "now serving" counter reaches it, so admission is FIFO. Both counters
//! wrap; only their equality matters. Never blocks in the kernel: hold it for
//! a handful of instructions only.

use core::sync::atomic::{AtomicU32, Ordering};

use super::attr::ProcessShared;
use crate::atomic::spin_until;
use crate::error::{PthreadError, PthreadResult};

/// Fair spinlock. The all-zero value is an unlocked lock.
#[derive(Debug, Default)]
#[repr(C)]
pub struct SpinLock {
    /// Ticket currently being served.
    owner: AtomicU32,
    /// Next ticket to hand out.
    ticket: AtomicU32,
}

impl SpinLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            owner: AtomicU32::new(0),
            ticket: AtomicU32::new(0),
        }
    }

    /// `pthread_spin_init`: process-shared locks are not supported.
    pub fn with_pshared(pshared: ProcessShared) -> PthreadResult<Self> {
        pshared.require_private()?;
        Ok(Self::new())
    }

    /// Draw a ticket and spin until it is served.
    pub fn lock(&self) {
        let mine = self.ticket.fetch_add(1, Ordering::Relaxed);
        spin_until(|| self.owner.load(Ordering::Acquire) == mine);
    }

    /// Take the lock only if nobody holds or awaits it.
    pub fn try_lock(&self) -> PthreadResult<()> {
        let serving = self.owner.load(Ordering::Acquire);
        // Advancing the ticket from exactly `serving` proves no ticket is
        // outstanding; one CAS, no separate read-then-write.
        self.ticket
            .compare_exchange(
                serving,
                serving.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .map(|_| ())
            .map_err(|_| PthreadError::Busy)
    }

    /// Serve the next ticket. Unlocking a free lock reports `PermissionDenied`.
    pub fn unlock(&self) -> PthreadResult<()> {
        if !self.is_locked() {
            return Err(PthreadError::PermissionDenied);
        }
        self.serve_next();
        Ok(())
    }

    /// True while held or contended.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.owner.load(Ordering::Relaxed) != self.ticket.load(Ordering::Relaxed)
    }

    /// Tickets drawn but not yet retired: the holder plus every spinner.
    #[must_use]
    pub fn outstanding(&self) -> u32 {
        self.ticket
            .load(Ordering::Relaxed)
            .wrapping_sub(self.owner.load(Ordering::Relaxed))
    }

    /// `pthread_spin_destroy`: a held lock is `Busy`.
    pub fn destroy(&mut self) -> PthreadResult<()> {
        if self.is_locked() {
            return Err(PthreadError::Busy);
        }
        *self = Self::new();
        Ok(())
    }

    pub(crate) fn draw_ticket(&self) -> u32 {
        self.ticket.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn wait_turn(&self, ticket: u32) {
        spin_until(|| self.owner.load(Ordering::Acquire) == ticket);
    }

    pub(crate) fn serve_next(&self) {
        self.owner.fetch_add(1, Ordering::Release);
    }
}
