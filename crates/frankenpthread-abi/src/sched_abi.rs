//! ABI layer for `<sched.h>`.

use std::ffi::c_int;

use frankenpthread_core::errno::EINVAL;
use frankenpthread_core::sched::{self, Policy};

use crate::types::{pid_t, sched_param, timespec};
use crate::util::{posix_fail, posix_result};

abi_fn! {
    fn sched_yield() -> c_int {
        sched::sched_yield();
        0
    }
}

abi_fn! {
    fn sched_get_priority_min(policy: c_int) -> c_int {
        match Policy::from_raw(policy) {
            Ok(p) => sched::sched_get_priority_min(p),
            Err(_) => posix_fail("sched", "get_priority_min", EINVAL),
        }
    }
}

abi_fn! {
    fn sched_get_priority_max(policy: c_int) -> c_int {
        match Policy::from_raw(policy) {
            Ok(p) => sched::sched_get_priority_max(p),
            Err(_) => posix_fail("sched", "get_priority_max", EINVAL),
        }
    }
}

abi_fn! {
    /// POSIX `sched_getscheduler`: the policy, or -1 with errno set.
    fn sched_getscheduler(pid: pid_t) -> c_int {
        let result = sched::sched_getscheduler(pid);
        match result {
            Ok(policy) => policy.as_raw(),
            Err(_) => posix_result("sched", "getscheduler", &result),
        }
    }
}

abi_fn! {
    /// POSIX `sched_setscheduler`: the previous policy, or -1 with errno set.
    fn sched_setscheduler(pid: pid_t, policy: c_int, param: *const sched_param) -> c_int {
        if param.is_null() {
            return posix_fail("sched", "setscheduler", EINVAL);
        }
        let previous = match sched::sched_getscheduler(pid) {
            Ok(p) => p,
            Err(e) => return posix_result::<()>("sched", "setscheduler", &Err(e)),
        };
        let result =
            Policy::from_raw(policy).and_then(|p| sched::sched_setscheduler(pid, p, *param));
        match result {
            Ok(()) => previous.as_raw(),
            Err(_) => posix_result("sched", "setscheduler", &result),
        }
    }
}

abi_fn! {
    fn sched_getparam(pid: pid_t, param: *mut sched_param) -> c_int {
        if param.is_null() {
            return posix_fail("sched", "getparam", EINVAL);
        }
        let result = sched::sched_getparam(pid);
        if let Ok(p) = result {
            *param = p;
        }
        posix_result("sched", "getparam", &result)
    }
}

abi_fn! {
    fn sched_setparam(pid: pid_t, param: *const sched_param) -> c_int {
        if param.is_null() {
            return posix_fail("sched", "setparam", EINVAL);
        }
        posix_result("sched", "setparam", &sched::sched_setparam(pid, *param))
    }
}

abi_fn! {
    fn sched_rr_get_interval(pid: pid_t, tp: *mut timespec) -> c_int {
        if tp.is_null() {
            return posix_fail("sched", "rr_get_interval", EINVAL);
        }
        let result = sched::sched_rr_get_interval(pid);
        if let Ok(interval) = result {
            *tp = interval;
        }
        posix_result("sched", "rr_get_interval", &result)
    }
}
