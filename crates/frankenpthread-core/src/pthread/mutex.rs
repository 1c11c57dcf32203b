//! Adaptive mutex: spin briefly, then block on a kernel event.
//!
//! ## Layout
//!
//! [`Mutex`] is a single pointer. Null (the all-zero bit pattern) means
//! "unconstructed"; the first real operation builds the backing
//! [`MutexInner`] with a compare-and-swap race in which the loser frees its
//! copy. The kernel event is created the same way, and only when a thread
//! actually has to block.
//!
//! ## Handoff
//!
//! A blocking thread bumps `wait_count` before its final acquisition
//! attempt, and `unlock` clears `lock_status` before reading `wait_count`.
//! With sequentially consistent ordering on both sides, either the unlocker
//! sees the waiter and sets the event, or the waiter's attempt sees the lock
//! free. The event latches, so a set that lands before the wait is not lost.
//! Uncontended `unlock` never touches the event.
//!
//! Acquisition order is best-effort, not FIFO.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::attr::{MutexAttr, MutexKind};
use crate::atomic::cpu_relax;
use crate::context::Context;
use crate::error::{PthreadError, PthreadResult};
use crate::host::KernelEvent;
use crate::lazy::{Install, LazyBox};
use crate::structured_log::LogLevel;
use crate::time::{ClockId, Timespec, relative_timeout};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// Backing object of a constructed mutex.
#[derive(Debug)]
pub struct MutexInner {
    lock_status: AtomicU32,
    wait_count: AtomicU32,
    spin_count: u32,
    kind: MutexKind,
    event: LazyBox<KernelEvent>,
    ctx: Arc<Context>,
}

impl MutexInner {
    fn new(ctx: Arc<Context>, kind: MutexKind) -> Self {
        Self {
            lock_status: AtomicU32::new(UNLOCKED),
            wait_count: AtomicU32::new(0),
            spin_count: ctx.spin_count(),
            kind,
            event: LazyBox::new(),
            ctx,
        }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.lock_status
            .compare_exchange(UNLOCKED, LOCKED, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
    }

    fn spin_acquire(&self) -> bool {
        for _ in 0..self.spin_count {
            if self.lock_status.load(Ordering::Relaxed) == UNLOCKED && self.try_acquire() {
                return true;
            }
            cpu_relax();
        }
        false
    }

    fn wait_event(&self) -> PthreadResult<&KernelEvent> {
        let (event, install) = self.event.get_or_try_init(|| Ok(KernelEvent::new()))?;
        if install == Install::Won {
            self.ctx.log().emit_with(LogLevel::Debug, "wait_object_created", |e| {
                e.with_op("mutex", "lock")
            });
        }
        Ok(event)
    }

    /// Slow path: register as a waiter and sleep on the event until the lock
    /// is taken or `deadline` passes.
    fn block(&self, deadline: Option<&Timespec>) -> PthreadResult<()> {
        let event = self.wait_event()?;
        self.wait_count.fetch_add(1, Ordering::SeqCst);
        let outcome = loop {
            if self.try_acquire() {
                break Ok(());
            }
            let timeout = match deadline {
                None => None,
                Some(deadline) => {
                    match relative_timeout(self.ctx.clock(), ClockId::Realtime, deadline) {
                        Ok(rel) if rel.is_zero() => break Err(PthreadError::TimedOut),
                        Ok(rel) => Some(rel),
                        Err(e) => break Err(e),
                    }
                }
            };
            event.wait(timeout);
        };
        self.wait_count.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// `pthread_mutex_t`.
#[derive(Debug, Default)]
#[repr(C)]
pub struct Mutex {
    inner: LazyBox<MutexInner>,
}

impl Mutex {
    /// Unconstructed mutex (`PTHREAD_MUTEX_INITIALIZER`). Built on first use
    /// against the global context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: LazyBox::new(),
        }
    }

    /// `pthread_mutex_init` against the global context.
    pub fn with_attr(attr: &MutexAttr) -> PthreadResult<Self> {
        Self::with_attr_in(Arc::clone(Context::global()), attr)
    }

    /// Default-kind mutex bound to `ctx`.
    pub fn with_context(ctx: Arc<Context>) -> PthreadResult<Self> {
        Self::with_attr_in(ctx, &MutexAttr::default())
    }

    /// `pthread_mutex_init` bound to `ctx`.
    pub fn with_attr_in(ctx: Arc<Context>, attr: &MutexAttr) -> PthreadResult<Self> {
        attr.validate()?;
        let inner = crate::lazy::try_box(MutexInner::new(ctx, attr.kind))?;
        Ok(Self {
            inner: LazyBox::from_box(inner),
        })
    }

    fn inner(&self) -> PthreadResult<&MutexInner> {
        let (inner, install) = self.inner.get_or_try_init(|| {
            Ok(MutexInner::new(Arc::clone(Context::global()), MutexKind::Normal))
        })?;
        if install == Install::Lost {
            inner.ctx.log().emit_with(LogLevel::Debug, "lazy_init_race_lost", |e| {
                e.with_op("mutex", "init")
            });
        }
        Ok(inner)
    }

    /// `pthread_mutex_lock`.
    pub fn lock(&self) -> PthreadResult<()> {
        let inner = self.inner()?;
        if inner.try_acquire() || inner.spin_acquire() {
            return Ok(());
        }
        inner.block(None)
    }

    /// `pthread_mutex_trylock`: fast path only.
    pub fn try_lock(&self) -> PthreadResult<()> {
        if self.inner()?.try_acquire() {
            Ok(())
        } else {
            Err(PthreadError::Busy)
        }
    }

    /// `pthread_mutex_timedlock` with an absolute realtime deadline.
    ///
    /// An available lock is taken even if the deadline has passed; otherwise
    /// a past deadline fails with `TimedOut` without blocking.
    pub fn timed_lock(&self, deadline: &Timespec) -> PthreadResult<()> {
        let inner = self.inner()?;
        if inner.try_acquire() {
            return Ok(());
        }
        if !deadline.is_valid() {
            return Err(PthreadError::InvalidArgument);
        }
        if inner.spin_acquire() {
            return Ok(());
        }
        inner.block(Some(deadline))
    }

    /// `pthread_mutex_unlock`.
    ///
    /// Unconstructed or destroyed mutexes are `InvalidArgument`; an unlocked
    /// one is `PermissionDenied`.
    pub fn unlock(&self) -> PthreadResult<()> {
        let inner = self.inner.get().ok_or(PthreadError::InvalidArgument)?;
        if inner.lock_status.swap(UNLOCKED, Ordering::SeqCst) == UNLOCKED {
            return Err(PthreadError::PermissionDenied);
        }
        if inner.wait_count.load(Ordering::SeqCst) > 0 {
            if let Some(event) = inner.event.get() {
                event.set();
            }
        }
        Ok(())
    }

    /// `pthread_mutex_destroy`: returns to the unconstructed state. A held
    /// mutex is `Busy`.
    pub fn destroy(&mut self) -> PthreadResult<()> {
        if self.is_locked() {
            return Err(PthreadError::Busy);
        }
        drop(self.inner.take());
        Ok(())
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner
            .get()
            .is_some_and(|i| i.lock_status.load(Ordering::SeqCst) == LOCKED)
    }

    #[must_use]
    pub fn is_constructed(&self) -> bool {
        self.inner.is_constructed()
    }

    /// Configured kind; `Normal` until constructed.
    #[must_use]
    pub fn kind(&self) -> MutexKind {
        self.inner.get().map_or(MutexKind::Normal, |i| i.kind)
    }

    /// Threads currently registered as blocked.
    #[must_use]
    pub fn waiters(&self) -> u32 {
        self.inner
            .get()
            .map_or(0, |i| i.wait_count.load(Ordering::SeqCst))
    }
}
