//! Time sources.
//!
//! [`SystemClock`] reads the host wall clock and a process-anchored monotonic
//! clock. [`ManualClock`] is fully caller-driven for deterministic deadline
//! tests: `sleep` advances it instead of blocking.

use core::fmt::Debug;
use core::time::Duration;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use super::{ClockId, Timespec};
use crate::error::{PthreadError, PthreadResult};

/// A source of realtime and monotonic timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Current time on `clock_id`.
    fn now(&self, clock_id: ClockId) -> PthreadResult<Timespec>;

    /// Resolution of `clock_id`.
    fn resolution(&self, clock_id: ClockId) -> PthreadResult<Timespec>;

    /// Set `clock_id`. Clocks that cannot be set refuse.
    fn set(&self, _clock_id: ClockId, _ts: Timespec) -> PthreadResult<()> {
        Err(PthreadError::PermissionDenied)
    }

    /// Suspend the calling thread for `d`.
    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

// ---------------------------------------------------------------------------
// Host clock
// ---------------------------------------------------------------------------

/// Host-backed clock. The monotonic origin is the moment of construction.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self, clock_id: ClockId) -> PthreadResult<Timespec> {
        match clock_id {
            ClockId::Realtime => Ok(match SystemTime::now().duration_since(UNIX_EPOCH) {
                Ok(since) => Timespec::from_duration(since),
                Err(before) => Timespec::from_nanos(-(before.duration().as_nanos() as i128)),
            }),
            ClockId::Monotonic => Ok(Timespec::from_duration(self.origin.elapsed())),
        }
    }

    fn resolution(&self, clock_id: ClockId) -> PthreadResult<Timespec> {
        host_resolution(clock_id)
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn host_resolution(clock_id: ClockId) -> PthreadResult<Timespec> {
    let raw = match clock_id {
        ClockId::Realtime => libc::CLOCK_REALTIME,
        ClockId::Monotonic => libc::CLOCK_MONOTONIC,
    };
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_getres(raw, &mut ts) };
    if rc != 0 {
        return Err(PthreadError::InvalidArgument);
    }
    Ok(Timespec::new(i64::from(ts.tv_sec), i64::from(ts.tv_nsec)))
}

#[cfg(not(unix))]
fn host_resolution(clock_id: ClockId) -> PthreadResult<Timespec> {
    // 100ns ticks for the wall clock; the performance counter is finer.
    Ok(match clock_id {
        ClockId::Realtime => Timespec::new(0, 100),
        ClockId::Monotonic => Timespec::new(0, 1),
    })
}

// ---------------------------------------------------------------------------
// Manual clock
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ManualState {
    realtime_ns: i128,
    monotonic_ns: i128,
}

/// Caller-driven clock.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
    resolution: Timespec,
}

impl ManualClock {
    /// Start with the wall clock at `realtime` and the monotonic clock at zero.
    #[must_use]
    pub fn new(realtime: Timespec) -> Self {
        Self {
            state: Mutex::new(ManualState {
                realtime_ns: realtime.as_nanos(),
                monotonic_ns: 0,
            }),
            resolution: Timespec::new(0, 1),
        }
    }

    /// Move both clocks forward by `d`.
    pub fn advance(&self, d: Duration) {
        let step = d.as_nanos() as i128;
        let mut state = self.state.lock();
        state.realtime_ns = state.realtime_ns.saturating_add(step);
        state.monotonic_ns = state.monotonic_ns.saturating_add(step);
    }
}

impl Clock for ManualClock {
    fn now(&self, clock_id: ClockId) -> PthreadResult<Timespec> {
        let state = self.state.lock();
        Ok(Timespec::from_nanos(match clock_id {
            ClockId::Realtime => state.realtime_ns,
            ClockId::Monotonic => state.monotonic_ns,
        }))
    }

    fn resolution(&self, _clock_id: ClockId) -> PthreadResult<Timespec> {
        Ok(self.resolution)
    }

    fn set(&self, clock_id: ClockId, ts: Timespec) -> PthreadResult<()> {
        if clock_id != ClockId::Realtime {
            return Err(PthreadError::InvalidArgument);
        }
        self.state.lock().realtime_ns = ts.as_nanos();
        Ok(())
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
        std::thread::yield_now();
    }
}
