//! Clock service.
//!
//! Timestamps, clock identifiers, and the absolute-deadline to relative-wait
//! translation every timed operation relies on. The clocks themselves live in
//! [`clock`]; the cancellable sleeps in [`sleep`].

pub mod clock;
pub mod sleep;

use core::time::Duration;

use crate::error::{PthreadError, PthreadResult};

pub use clock::{Clock, ManualClock, SystemClock};
pub use sleep::{clock_nanosleep, nanosleep};

/// Clock identifier for the wall clock.
pub const CLOCK_REALTIME: i32 = 0;
/// Clock identifier for the monotonic clock.
pub const CLOCK_MONOTONIC: i32 = 1;
/// `clock_nanosleep` flag: the request is an absolute deadline.
pub const TIMER_ABSTIME: i32 = 1;

pub(crate) const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Represents a timespec value (seconds + nanoseconds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct Timespec {
    /// Seconds.
    pub tv_sec: i64,
    /// Nanoseconds (0 to 999_999_999).
    pub tv_nsec: i64,
}

impl Timespec {
    pub const ZERO: Self = Self::new(0, 0);

    #[must_use]
    pub const fn new(tv_sec: i64, tv_nsec: i64) -> Self {
        Self { tv_sec, tv_nsec }
    }

    /// True when `tv_nsec` lies in `0..1_000_000_000`.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.tv_nsec >= 0 && self.tv_nsec < NANOS_PER_SEC
    }

    /// Total nanoseconds; wide enough that no valid timespec overflows.
    #[must_use]
    pub const fn as_nanos(&self) -> i128 {
        self.tv_sec as i128 * NANOS_PER_SEC as i128 + self.tv_nsec as i128
    }

    /// Inverse of [`as_nanos`](Self::as_nanos), saturating at the `i64` seconds range.
    #[must_use]
    pub fn from_nanos(nanos: i128) -> Self {
        let per = i128::from(NANOS_PER_SEC);
        let secs = nanos.div_euclid(per);
        let nsec = nanos.rem_euclid(per) as i64;
        match i64::try_from(secs) {
            Ok(s) => Self::new(s, nsec),
            Err(_) if secs > 0 => Self::new(i64::MAX, NANOS_PER_SEC - 1),
            Err(_) => Self::new(i64::MIN, 0),
        }
    }

    #[must_use]
    pub fn from_duration(d: Duration) -> Self {
        Self::from_nanos(d.as_nanos() as i128)
    }

    /// Convert a non-negative, valid timespec into a `Duration`.
    pub fn to_duration(&self) -> PthreadResult<Duration> {
        if !self.is_valid() || self.tv_sec < 0 {
            return Err(PthreadError::InvalidArgument);
        }
        Ok(Duration::new(self.tv_sec as u64, self.tv_nsec as u32))
    }

    /// `self + d`, saturating.
    #[must_use]
    pub fn saturating_add(&self, d: Duration) -> Self {
        let extra = i128::try_from(d.as_nanos()).unwrap_or(i128::MAX / 2);
        Self::from_nanos(self.as_nanos().saturating_add(extra))
    }

    /// Milliseconds represented, rounded down (the unit kernel waits accept).
    #[must_use]
    pub const fn as_millis(&self) -> i128 {
        self.as_nanos() / 1_000_000
    }
}

/// Supported clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockId {
    /// Wall-clock time since the Unix epoch. May jump.
    Realtime,
    /// Monotonic time from an arbitrary origin. Never jumps.
    Monotonic,
}

impl ClockId {
    /// Map a raw `clockid_t`.
    pub const fn from_raw(raw: i32) -> PthreadResult<Self> {
        match raw {
            CLOCK_REALTIME => Ok(Self::Realtime),
            CLOCK_MONOTONIC => Ok(Self::Monotonic),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Realtime => CLOCK_REALTIME,
            Self::Monotonic => CLOCK_MONOTONIC,
        }
    }
}

/// Translate an absolute deadline on `clock_id` into a relative wait.
///
/// Deadlines at or before "now" yield `Duration::ZERO`, never an underflow.
/// Far-future deadlines saturate rather than wrap.
pub fn relative_timeout(
    clock: &dyn Clock,
    clock_id: ClockId,
    deadline: &Timespec,
) -> PthreadResult<Duration> {
    if !deadline.is_valid() {
        return Err(PthreadError::InvalidArgument);
    }
    let now = clock.now(clock_id)?;
    let delta = deadline.as_nanos() - now.as_nanos();
    if delta <= 0 {
        return Ok(Duration::ZERO);
    }
    let secs = delta / i128::from(NANOS_PER_SEC);
    let nanos = (delta % i128::from(NANOS_PER_SEC)) as u32;
    Ok(match u64::try_from(secs) {
        Ok(s) => Duration::new(s, nanos),
        Err(_) => Duration::MAX,
    })
}

/// Absolute deadline `rel` from now on `clock_id`.
pub fn deadline_after(clock: &dyn Clock, clock_id: ClockId, rel: Duration) -> PthreadResult<Timespec> {
    Ok(clock.now(clock_id)?.saturating_add(rel))
}

/// POSIX `clock_gettime`.
pub fn clock_gettime(clock: &dyn Clock, clock_id: ClockId) -> PthreadResult<Timespec> {
    clock.now(clock_id)
}

/// POSIX `clock_getres`.
pub fn clock_getres(clock: &dyn Clock, clock_id: ClockId) -> PthreadResult<Timespec> {
    clock.resolution(clock_id)
}

/// POSIX `clock_settime`. Only the wall clock may be set.
pub fn clock_settime(clock: &dyn Clock, clock_id: ClockId, ts: &Timespec) -> PthreadResult<()> {
    if clock_id != ClockId::Realtime || !ts.is_valid() {
        return Err(PthreadError::InvalidArgument);
    }
    clock.set(clock_id, *ts)
}
