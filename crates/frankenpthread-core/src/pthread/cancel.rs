//! Deferred cancellation and signal probing.
//!
//! A cancellation request only sets a flag on the target. The target acts on
//! it at the next cancellation point: [`testcancel`], `join`, semaphore
//! waits, condition waits, and the sleeps. Blocking cancellation points wait
//! in slices of [`CANCEL_POLL`] so a request made while blocked is observed.
//! Acting on a request runs the cleanup handlers and ends the thread with
//! [`PTHREAD_CANCELED`]. Asynchronous cancellation is not provided.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use super::thread::{self, Pthread, current, current_or_adopt, lookup};
use crate::context::Context;
use crate::error::{PthreadError, PthreadResult};
use crate::structured_log::LogLevel;

/// Exit value of a cancelled thread.
pub const PTHREAD_CANCELED: usize = usize::MAX;

pub const PTHREAD_CANCEL_ENABLE: i32 = 0;
pub const PTHREAD_CANCEL_DISABLE: i32 = 1;
pub const PTHREAD_CANCEL_DEFERRED: i32 = 0;
pub const PTHREAD_CANCEL_ASYNCHRONOUS: i32 = 1;

/// Longest uninterrupted block at a cancellation point.
pub const CANCEL_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CancelState {
    #[default]
    Enable,
    Disable,
}

impl CancelState {
    pub const fn from_raw(raw: i32) -> PthreadResult<Self> {
        match raw {
            PTHREAD_CANCEL_ENABLE => Ok(Self::Enable),
            PTHREAD_CANCEL_DISABLE => Ok(Self::Disable),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Enable => PTHREAD_CANCEL_ENABLE,
            Self::Disable => PTHREAD_CANCEL_DISABLE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CancelType {
    #[default]
    Deferred,
    Asynchronous,
}

impl CancelType {
    pub const fn from_raw(raw: i32) -> PthreadResult<Self> {
        match raw {
            PTHREAD_CANCEL_DEFERRED => Ok(Self::Deferred),
            PTHREAD_CANCEL_ASYNCHRONOUS => Ok(Self::Asynchronous),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Deferred => PTHREAD_CANCEL_DEFERRED,
            Self::Asynchronous => PTHREAD_CANCEL_ASYNCHRONOUS,
        }
    }
}

/// Cancellation flags carried by each control block.
#[derive(Debug, Default)]
pub(crate) struct CancelControl {
    pending: AtomicBool,
    disabled: AtomicBool,
    /// Set once the thread starts acting on a request.
    acting: AtomicBool,
}

impl CancelControl {
    fn request(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    fn actionable(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
            && !self.disabled.load(Ordering::SeqCst)
            && !self.acting.load(Ordering::SeqCst)
    }
}

/// `pthread_cancel`: queue a request on `thread`.
pub fn cancel(ctx: &Context, thread: Pthread) -> PthreadResult<()> {
    let block = lookup(ctx, thread).map_err(|_| PthreadError::NoSuchThread)?;
    if block.is_finished() {
        return Err(PthreadError::NoSuchThread);
    }
    block.cancel.request();
    ctx.log().emit_with(LogLevel::Debug, "cancel_requested", |e| {
        e.with_op("thread", "cancel").with_thread(thread.as_raw())
    });
    Ok(())
}

/// `pthread_setcancelstate`; returns the previous state.
pub fn set_cancel_state(state: CancelState) -> CancelState {
    let block = current_or_adopt();
    let was_disabled = block
        .cancel
        .disabled
        .swap(state == CancelState::Disable, Ordering::SeqCst);
    if was_disabled {
        CancelState::Disable
    } else {
        CancelState::Enable
    }
}

/// `pthread_setcanceltype`; returns the previous type. Only deferred
/// cancellation exists.
pub fn set_cancel_type(kind: CancelType) -> PthreadResult<CancelType> {
    match kind {
        CancelType::Deferred => Ok(CancelType::Deferred),
        CancelType::Asynchronous => Err(PthreadError::Unsupported),
    }
}

/// True when the calling thread has an actionable cancellation request.
#[must_use]
pub fn requested() -> bool {
    current().is_some_and(|block| block.cancel.actionable())
}

/// `pthread_testcancel`: act on a pending request, never returning if so.
pub fn testcancel() {
    let Some(block) = current() else {
        return;
    };
    if !block.cancel.actionable() {
        return;
    }
    block.cancel.acting.store(true, Ordering::SeqCst);
    thread::terminate(PTHREAD_CANCELED, true)
}

/// Wait slice at a cancellation point, given the time left (if bounded).
#[must_use]
pub fn poll_slice(remaining: Option<Duration>) -> Duration {
    remaining.map_or(CANCEL_POLL, |r| r.min(CANCEL_POLL))
}

/// `pthread_kill`. Signal 0 probes the target; delivering real signals is
/// not provided.
pub fn kill(ctx: &Context, thread: Pthread, signal: i32) -> PthreadResult<()> {
    let block = lookup(ctx, thread).map_err(|_| PthreadError::NoSuchThread)?;
    if block.is_finished() {
        return Err(PthreadError::NoSuchThread);
    }
    match signal {
        0 => Ok(()),
        s if s < 0 || s > 64 => Err(PthreadError::InvalidArgument),
        _ => Err(PthreadError::Unsupported),
    }
}
