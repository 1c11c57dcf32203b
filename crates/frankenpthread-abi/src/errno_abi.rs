//! ABI layer for `<errno.h>`: thread-local errno storage.
//!
//! Functions that follow the "return -1 and set errno" convention
//! (`sem_*`, `clock_*`, `nanosleep`, `sched_*`) report through here.

use std::cell::UnsafeCell;
use std::ffi::c_int;

#[cfg_attr(feature = "interpose", unsafe(no_mangle))]
pub unsafe extern "C" fn __errno_location() -> *mut c_int {
    thread_local! {
        static ERRNO: UnsafeCell<c_int> = const { UnsafeCell::new(0) };
    }
    ERRNO.with(|cell| cell.get())
}

/// Set the ABI errno via `__errno_location`.
#[inline]
pub(crate) fn set_abi_errno(val: c_int) {
    // SAFETY: `__errno_location` returns the calling thread's live slot.
    unsafe { *__errno_location() = val };
}

/// Current ABI errno of the calling thread.
#[must_use]
pub fn abi_errno() -> c_int {
    // SAFETY: as above.
    unsafe { *__errno_location() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_is_per_thread() {
        set_abi_errno(22);
        let other = std::thread::spawn(|| {
            set_abi_errno(11);
            abi_errno()
        })
        .join()
        .unwrap();
        assert_eq!(other, 11);
        assert_eq!(abi_errno(), 22);
    }
}
