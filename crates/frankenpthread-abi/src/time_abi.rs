//! ABI layer for the clock half of `<time.h>`.
//!
//! All clocks read through the global context, so a process configured with
//! a different clock source sees it here too.

use std::ffi::c_int;

use frankenpthread_core::errno::EINVAL;
use frankenpthread_core::time::{self, ClockId, Timespec};
use frankenpthread_core::{Context, PthreadResult};

use crate::types::{clockid_t, timespec};
use crate::util::{errno_result, posix_fail, posix_result};

fn clock_op<T>(clock_id: clockid_t, f: impl FnOnce(ClockId) -> PthreadResult<T>) -> PthreadResult<T> {
    f(ClockId::from_raw(clock_id)?)
}

abi_fn! {
    fn clock_gettime(clock_id: clockid_t, tp: *mut timespec) -> c_int {
        if tp.is_null() {
            return posix_fail("clock", "gettime", EINVAL);
        }
        let result = clock_op(clock_id, |id| time::clock_gettime(Context::global().clock(), id));
        if let Ok(now) = result {
            *tp = now;
        }
        posix_result("clock", "gettime", &result)
    }
}

abi_fn! {
    /// POSIX `clock_getres`. A null `res` only validates `clock_id`.
    fn clock_getres(clock_id: clockid_t, res: *mut timespec) -> c_int {
        let result = clock_op(clock_id, |id| time::clock_getres(Context::global().clock(), id));
        if let Ok(r) = result
            && !res.is_null()
        {
            *res = r;
        }
        posix_result("clock", "getres", &result)
    }
}

abi_fn! {
    fn clock_settime(clock_id: clockid_t, tp: *const timespec) -> c_int {
        if tp.is_null() {
            return posix_fail("clock", "settime", EINVAL);
        }
        let result = clock_op(clock_id, |id| time::clock_settime(Context::global().clock(), id, &*tp));
        posix_result("clock", "settime", &result)
    }
}

abi_fn! {
    /// POSIX `nanosleep`. Sleeps are never interrupted, so `rem` is zeroed.
    fn nanosleep(req: *const timespec, rem: *mut timespec) -> c_int {
        if req.is_null() {
            return posix_fail("clock", "nanosleep", EINVAL);
        }
        let result = time::nanosleep(Context::global().clock(), &*req);
        if result.is_ok() && !rem.is_null() {
            *rem = Timespec::ZERO;
        }
        posix_result("clock", "nanosleep", &result)
    }
}

abi_fn! {
    /// POSIX `clock_nanosleep`. Returns the error number directly.
    fn clock_nanosleep(
        clock_id: clockid_t,
        flags: c_int,
        req: *const timespec,
        rem: *mut timespec,
    ) -> c_int {
        if req.is_null() {
            return EINVAL;
        }
        let result = clock_op(clock_id, |id| {
            time::clock_nanosleep(Context::global().clock(), id, flags, &*req)
        });
        if result.is_ok() && !rem.is_null() {
            *rem = Timespec::ZERO;
        }
        errno_result("clock", "clock_nanosleep", &result)
    }
}
