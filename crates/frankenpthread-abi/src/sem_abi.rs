//! ABI layer for `<semaphore.h>`.
//!
//! Every function returns 0 on success, or -1 with errno set. `sem_open`
//! returns a heap handle that only `sem_close` may release.

use std::ffi::{c_char, c_int, c_uint};
use std::ptr;

use frankenpthread_core::PthreadResult;
use frankenpthread_core::errno::EINVAL;
use frankenpthread_core::semaphore::{self, OpenFlags, Semaphore};

use crate::types::{SEM_FAILED, mode_t, sem_t, timespec};
use crate::util::{c_str, posix_fail, posix_result};

/// Resolve a handle to a live semaphore.
unsafe fn live<'a>(sem: *mut sem_t) -> Option<&'a Semaphore> {
    if sem.is_null() {
        return None;
    }
    // SAFETY: non-null handles point at a `sem_t` written by `sem_init` or
    // allocated by `sem_open`.
    unsafe { (*sem).as_deref() }
}

/// Run `op` on a live semaphore under the "-1 and errno" convention.
unsafe fn with_sem<T>(
    sem: *mut sem_t,
    op: &str,
    f: impl FnOnce(&Semaphore) -> PthreadResult<T>,
) -> c_int {
    // SAFETY: forwarded from the caller.
    match unsafe { live(sem) } {
        Some(s) => posix_result("semaphore", op, &f(s)),
        None => posix_fail("semaphore", op, EINVAL),
    }
}

abi_fn! {
    /// POSIX `sem_init`. Non-zero `pshared` fails with `EPERM`.
    fn sem_init(sem: *mut sem_t, pshared: c_int, value: c_uint) -> c_int {
        if sem.is_null() {
            return posix_fail("semaphore", "init", EINVAL);
        }
        let result = Semaphore::new(pshared != 0, value);
        let code = posix_result("semaphore", "init", &result);
        if let Ok(s) = result {
            ptr::write(sem, Some(Box::new(s)));
        }
        code
    }
}

abi_fn! {
    fn sem_destroy(sem: *mut sem_t) -> c_int {
        if sem.is_null() {
            return posix_fail("semaphore", "destroy", EINVAL);
        }
        let Some(s) = (*sem).as_deref_mut() else {
            return posix_fail("semaphore", "destroy", EINVAL);
        };
        let result = s.destroy();
        if result.is_ok() {
            *sem = None;
        }
        posix_result("semaphore", "destroy", &result)
    }
}

abi_fn! {
    fn sem_wait(sem: *mut sem_t) -> c_int {
        with_sem(sem, "wait", Semaphore::wait)
    }
}

abi_fn! {
    /// POSIX `sem_trywait`: -1 with `EAGAIN` when no permit is available.
    fn sem_trywait(sem: *mut sem_t) -> c_int {
        with_sem(sem, "trywait", Semaphore::try_wait)
    }
}

abi_fn! {
    fn sem_timedwait(sem: *mut sem_t, abstime: *const timespec) -> c_int {
        if abstime.is_null() {
            return posix_fail("semaphore", "timedwait", EINVAL);
        }
        with_sem(sem, "timedwait", |s| s.timed_wait(&*abstime))
    }
}

abi_fn! {
    fn sem_post(sem: *mut sem_t) -> c_int {
        with_sem(sem, "post", Semaphore::post)
    }
}

abi_fn! {
    fn sem_getvalue(sem: *mut sem_t, sval: *mut c_int) -> c_int {
        if sval.is_null() {
            return posix_fail("semaphore", "getvalue", EINVAL);
        }
        with_sem(sem, "getvalue", |s| {
            let value = s.value()?;
            *sval = c_int::try_from(value).unwrap_or(c_int::MAX);
            Ok(())
        })
    }
}

abi_fn! {
    /// POSIX `sem_open`. `mode` is accepted and ignored; `value` applies only
    /// when `O_CREAT` creates the name. Returns `SEM_FAILED` with errno set
    /// on failure.
    fn sem_open(name: *const c_char, oflag: c_int, mode: mode_t, value: c_uint) -> *mut sem_t {
        let _ = mode;
        let Some(name) = c_str(name) else {
            posix_fail("semaphore", "open", EINVAL);
            return SEM_FAILED;
        };
        let flags = OpenFlags {
            create: oflag & libc::O_CREAT != 0,
            exclusive: oflag & libc::O_EXCL != 0,
        };
        let result = Semaphore::open(name, flags, value);
        posix_result("semaphore", "open", &result);
        match result {
            Ok(s) => Box::into_raw(Box::new(Some(Box::new(s)))),
            Err(_) => SEM_FAILED,
        }
    }
}

abi_fn! {
    /// POSIX `sem_close`. Only handles returned by `sem_open` are accepted.
    fn sem_close(sem: *mut sem_t) -> c_int {
        if live(sem).and_then(Semaphore::name).is_none() {
            return posix_fail("semaphore", "close", EINVAL);
        }
        // SAFETY: named handles only come from `sem_open`'s `Box::into_raw`.
        let handle = Box::from_raw(sem);
        let result = match *handle {
            Some(s) => s.close(),
            None => Ok(()),
        };
        posix_result("semaphore", "close", &result)
    }
}

abi_fn! {
    fn sem_unlink(name: *const c_char) -> c_int {
        let Some(name) = c_str(name) else {
            return posix_fail("semaphore", "unlink", EINVAL);
        };
        posix_result("semaphore", "unlink", &semaphore::unlink(name))
    }
}
