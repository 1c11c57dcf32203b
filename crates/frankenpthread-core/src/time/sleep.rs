//! Cancellable sleeps.

use core::time::Duration;

use super::{Clock, ClockId, TIMER_ABSTIME, Timespec, deadline_after, relative_timeout};
use crate::error::{PthreadError, PthreadResult};
use crate::pthread::cancel::{poll_slice, testcancel};

/// Longest relative request accepted, in seconds.
const MAX_SLEEP_SECS: i64 = 4_294_967;

/// POSIX `nanosleep`: sleep for `req` on the monotonic clock.
pub fn nanosleep(clock: &dyn Clock, req: &Timespec) -> PthreadResult<()> {
    let rel = checked_request(req)?;
    let deadline = deadline_after(clock, ClockId::Monotonic, rel)?;
    sleep_until(clock, ClockId::Monotonic, &deadline)
}

/// POSIX `clock_nanosleep`. `flags` is 0 for a relative request or
/// [`TIMER_ABSTIME`] for an absolute deadline on `clock_id`; deadlines that
/// have already passed return at once.
pub fn clock_nanosleep(
    clock: &dyn Clock,
    clock_id: ClockId,
    flags: i32,
    req: &Timespec,
) -> PthreadResult<()> {
    match flags {
        0 => {
            let rel = checked_request(req)?;
            let deadline = deadline_after(clock, clock_id, rel)?;
            sleep_until(clock, clock_id, &deadline)
        }
        TIMER_ABSTIME => {
            if !req.is_valid() {
                return Err(PthreadError::InvalidArgument);
            }
            sleep_until(clock, clock_id, req)
        }
        _ => Err(PthreadError::InvalidArgument),
    }
}

fn checked_request(req: &Timespec) -> PthreadResult<Duration> {
    if !req.is_valid() || req.tv_sec < 0 || req.tv_sec > MAX_SLEEP_SECS {
        return Err(PthreadError::InvalidArgument);
    }
    req.to_duration()
}

fn sleep_until(clock: &dyn Clock, clock_id: ClockId, deadline: &Timespec) -> PthreadResult<()> {
    loop {
        testcancel();
        let remaining = relative_timeout(clock, clock_id, deadline)?;
        if remaining.is_zero() {
            return Ok(());
        }
        clock.sleep(poll_slice(Some(remaining)));
    }
}
