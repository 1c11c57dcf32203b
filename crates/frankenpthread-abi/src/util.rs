//! Shared internal utilities for ABI adapters.

use std::ffi::{CStr, c_char, c_int};

use frankenpthread_core::structured_log::LogLevel;
use frankenpthread_core::{Context, PthreadResult, errno_of};

use crate::errno_abi::set_abi_errno;

/// Errno-returning convention (`pthread_*`): 0 or the error number.
pub(crate) fn errno_result<T>(primitive: &str, op: &str, result: &PthreadResult<T>) -> c_int {
    let code = errno_of(result);
    if code != 0 {
        trace_failure(primitive, op, code);
    }
    code
}

/// "-1 and errno" convention (`sem_*`, `clock_*`, `sched_*`).
pub(crate) fn posix_result<T>(primitive: &str, op: &str, result: &PthreadResult<T>) -> c_int {
    match errno_result(primitive, op, result) {
        0 => 0,
        code => {
            set_abi_errno(code);
            -1
        }
    }
}

/// Report an argument rejected before reaching the core.
pub(crate) fn posix_fail(primitive: &str, op: &str, code: c_int) -> c_int {
    trace_failure(primitive, op, code);
    set_abi_errno(code);
    -1
}

fn trace_failure(primitive: &str, op: &str, code: c_int) {
    Context::global()
        .log()
        .emit_with(LogLevel::Trace, "abi_error", |e| {
            e.with_op(primitive, op).with_errno(code)
        });
}

/// Borrow a C string as UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: caller guarantees NUL termination.
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}
