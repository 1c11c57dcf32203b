//! Condition variable.
//!
//! Waiters register under an internal lock before releasing the user mutex,
//! so a signal issued after the user mutex is dropped always finds them.
//! `signal` hands out at most one wakeup per registered waiter and tags it
//! with a generation; a waiter only consumes wakeups issued after it
//! registered.

use core::time::Duration;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex as RawMutex};

use super::attr::CondAttr;
use super::cancel::{poll_slice, requested, testcancel};
use super::mutex::Mutex;
use crate::context::Context;
use crate::error::{PthreadError, PthreadResult};
use crate::lazy::{Install, LazyBox};
use crate::structured_log::LogLevel;
use crate::time::{ClockId, Timespec, relative_timeout};

#[derive(Debug, Default)]
struct WaitState {
    waiters: u32,
    /// Wakeups issued but not yet consumed.
    pending: u32,
    generation: u64,
}

#[derive(Debug)]
pub struct CondInner {
    state: RawMutex<WaitState>,
    cv: Condvar,
    clock: ClockId,
    ctx: Arc<Context>,
}

enum Woke {
    Signalled,
    Cancelled,
}

impl CondInner {
    fn new(ctx: Arc<Context>, clock: ClockId) -> Self {
        Self {
            state: RawMutex::new(WaitState::default()),
            cv: Condvar::new(),
            clock,
            ctx,
        }
    }

    fn wait(&self, mutex: &Mutex, deadline: Option<&Timespec>) -> PthreadResult<()> {
        if let Some(deadline) = deadline {
            if !deadline.is_valid() {
                return Err(PthreadError::InvalidArgument);
            }
        }
        testcancel();

        let mut state = self.state.lock();
        mutex.unlock()?;
        state.waiters += 1;
        let registered = state.generation;

        let outcome = loop {
            if state.pending > 0 && state.generation != registered {
                state.pending -= 1;
                break Ok(Woke::Signalled);
            }
            if requested() {
                break Ok(Woke::Cancelled);
            }
            let remaining: Option<Duration> = match deadline {
                None => None,
                Some(deadline) => match relative_timeout(self.ctx.clock(), self.clock, deadline) {
                    Ok(rel) if rel.is_zero() => break Err(PthreadError::TimedOut),
                    Ok(rel) => Some(rel),
                    Err(e) => break Err(e),
                },
            };
            let _ = self.cv.wait_for(&mut state, poll_slice(remaining));
        };
        state.waiters -= 1;
        state.pending = state.pending.min(state.waiters);
        drop(state);

        mutex.lock()?;
        match outcome? {
            Woke::Signalled => Ok(()),
            Woke::Cancelled => {
                testcancel();
                Ok(())
            }
        }
    }

    fn signal(&self) {
        let mut state = self.state.lock();
        if state.waiters > state.pending {
            state.pending += 1;
            state.generation += 1;
            drop(state);
            self.cv.notify_one();
        }
    }

    fn broadcast(&self) {
        let mut state = self.state.lock();
        if state.waiters > state.pending {
            state.pending = state.waiters;
            state.generation += 1;
            drop(state);
            self.cv.notify_all();
        }
    }
}

/// `pthread_cond_t`. The all-zero value is an unconstructed condition
/// variable on the realtime clock.
#[derive(Debug, Default)]
#[repr(C)]
pub struct Cond {
    inner: LazyBox<CondInner>,
}

impl Cond {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: LazyBox::new(),
        }
    }

    /// `pthread_cond_init` against the global context.
    pub fn with_attr(attr: &CondAttr) -> PthreadResult<Self> {
        Self::with_attr_in(Arc::clone(Context::global()), attr)
    }

    pub fn with_context(ctx: Arc<Context>) -> PthreadResult<Self> {
        Self::with_attr_in(ctx, &CondAttr::default())
    }

    pub fn with_attr_in(ctx: Arc<Context>, attr: &CondAttr) -> PthreadResult<Self> {
        attr.pshared.require_private()?;
        let inner = crate::lazy::try_box(CondInner::new(ctx, attr.clock))?;
        Ok(Self {
            inner: LazyBox::from_box(inner),
        })
    }

    fn inner(&self) -> PthreadResult<&CondInner> {
        let (inner, install) = self.inner.get_or_try_init(|| {
            Ok(CondInner::new(Arc::clone(Context::global()), ClockId::Realtime))
        })?;
        if install == Install::Lost {
            inner.ctx.log().emit_with(LogLevel::Debug, "lazy_init_race_lost", |e| {
                e.with_op("cond", "init")
            });
        }
        Ok(inner)
    }

    /// `pthread_cond_wait`. The caller must hold `mutex`; it is held again
    /// on return, including on error and on cancellation.
    pub fn wait(&self, mutex: &Mutex) -> PthreadResult<()> {
        self.inner()?.wait(mutex, None)
    }

    /// `pthread_cond_timedwait`. `deadline` is measured on the clock chosen
    /// at construction.
    pub fn timed_wait(&self, mutex: &Mutex, deadline: &Timespec) -> PthreadResult<()> {
        self.inner()?.wait(mutex, Some(deadline))
    }

    /// `pthread_cond_signal`: wake at least one waiter, if any.
    pub fn signal(&self) -> PthreadResult<()> {
        if let Some(inner) = self.inner.get() {
            inner.signal();
        }
        Ok(())
    }

    /// `pthread_cond_broadcast`: wake every current waiter.
    pub fn broadcast(&self) -> PthreadResult<()> {
        if let Some(inner) = self.inner.get() {
            inner.broadcast();
        }
        Ok(())
    }

    /// `pthread_cond_destroy`. `Busy` while any thread waits.
    pub fn destroy(&mut self) -> PthreadResult<()> {
        if self.waiters() > 0 {
            return Err(PthreadError::Busy);
        }
        drop(self.inner.take());
        Ok(())
    }

    #[must_use]
    pub fn waiters(&self) -> u32 {
        self.inner.get().map_or(0, |i| i.state.lock().waiters)
    }

    /// Clock deadlines are measured against.
    #[must_use]
    pub fn clock(&self) -> ClockId {
        self.inner.get().map_or(ClockId::Realtime, |i| i.clock)
    }
}
