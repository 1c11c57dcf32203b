//! ABI layer for the synchronization half of `<pthread.h>`.
//!
//! Mutexes, condition variables, ticket spinlocks, spinning reader-writer
//! locks and barriers, plus their attribute objects.

use std::ffi::{c_int, c_uint};
use std::ptr;

use frankenpthread_core::errno::EINVAL;
use frankenpthread_core::pthread::{
    Barrier, BarrierAttr, Cond, CondAttr, Mutex, MutexAttr, MutexKind, MutexProtocol,
    ProcessShared, SpinLock, SpinRwLock,
};
use frankenpthread_core::time::ClockId;

use crate::types::{
    clockid_t, pthread_barrier_t, pthread_barrierattr_t, pthread_cond_t, pthread_condattr_t,
    pthread_mutex_t, pthread_mutexattr_t, pthread_spin_rwlock_t, pthread_spinlock_t, timespec,
};
use crate::util::errno_result;

// ---------------------------------------------------------------------------
// Mutex
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_mutex_init`. A null `attr` gives a default mutex whose
    /// internals are built on first contention.
    fn pthread_mutex_init(mutex: *mut pthread_mutex_t, attr: *const pthread_mutexattr_t) -> c_int {
        if mutex.is_null() {
            return EINVAL;
        }
        let result = if attr.is_null() {
            Ok(Mutex::new())
        } else {
            Mutex::with_attr(&*attr)
        };
        let code = errno_result("mutex", "init", &result);
        if let Ok(m) = result {
            ptr::write(mutex, m);
        }
        code
    }
}

abi_fn! {
    fn pthread_mutex_destroy(mutex: *mut pthread_mutex_t) -> c_int {
        if mutex.is_null() {
            return EINVAL;
        }
        let result = (*mutex).destroy();
        errno_result("mutex", "destroy", &result)
    }
}

abi_fn! {
    fn pthread_mutex_lock(mutex: *mut pthread_mutex_t) -> c_int {
        if mutex.is_null() {
            return EINVAL;
        }
        let result = (*mutex).lock();
        errno_result("mutex", "lock", &result)
    }
}

abi_fn! {
    fn pthread_mutex_trylock(mutex: *mut pthread_mutex_t) -> c_int {
        if mutex.is_null() {
            return EINVAL;
        }
        let result = (*mutex).try_lock();
        errno_result("mutex", "trylock", &result)
    }
}

abi_fn! {
    /// POSIX `pthread_mutex_timedlock` with an absolute realtime deadline.
    fn pthread_mutex_timedlock(mutex: *mut pthread_mutex_t, abstime: *const timespec) -> c_int {
        if mutex.is_null() || abstime.is_null() {
            return EINVAL;
        }
        let result = (*mutex).timed_lock(&*abstime);
        errno_result("mutex", "timedlock", &result)
    }
}

abi_fn! {
    fn pthread_mutex_unlock(mutex: *mut pthread_mutex_t) -> c_int {
        if mutex.is_null() {
            return EINVAL;
        }
        let result = (*mutex).unlock();
        errno_result("mutex", "unlock", &result)
    }
}

// ---------------------------------------------------------------------------
// Mutex attributes
// ---------------------------------------------------------------------------

abi_fn! {
    fn pthread_mutexattr_init(attr: *mut pthread_mutexattr_t) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        ptr::write(attr, MutexAttr::default());
        0
    }
}

abi_fn! {
    fn pthread_mutexattr_destroy(attr: *mut pthread_mutexattr_t) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        *attr = MutexAttr::default();
        0
    }
}

abi_fn! {
    fn pthread_mutexattr_settype(attr: *mut pthread_mutexattr_t, kind: c_int) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = MutexKind::from_raw(kind).map(|k| (*attr).kind = k);
        errno_result("mutexattr", "settype", &result)
    }
}

abi_fn! {
    fn pthread_mutexattr_gettype(attr: *const pthread_mutexattr_t, kind: *mut c_int) -> c_int {
        if attr.is_null() || kind.is_null() {
            return EINVAL;
        }
        *kind = (*attr).kind.as_raw();
        0
    }
}

abi_fn! {
    /// Recorded as given; `pthread_mutex_init` refuses process-shared.
    fn pthread_mutexattr_setpshared(attr: *mut pthread_mutexattr_t, pshared: c_int) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = ProcessShared::from_raw(pshared).map(|p| (*attr).pshared = p);
        errno_result("mutexattr", "setpshared", &result)
    }
}

abi_fn! {
    fn pthread_mutexattr_getpshared(attr: *const pthread_mutexattr_t, pshared: *mut c_int) -> c_int {
        if attr.is_null() || pshared.is_null() {
            return EINVAL;
        }
        *pshared = (*attr).pshared.as_raw();
        0
    }
}

abi_fn! {
    fn pthread_mutexattr_setprotocol(attr: *mut pthread_mutexattr_t, protocol: c_int) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = MutexProtocol::from_raw(protocol).map(|p| (*attr).protocol = p);
        errno_result("mutexattr", "setprotocol", &result)
    }
}

abi_fn! {
    fn pthread_mutexattr_getprotocol(
        attr: *const pthread_mutexattr_t,
        protocol: *mut c_int,
    ) -> c_int {
        if attr.is_null() || protocol.is_null() {
            return EINVAL;
        }
        *protocol = (*attr).protocol.as_raw();
        0
    }
}

// ---------------------------------------------------------------------------
// Condition variable
// ---------------------------------------------------------------------------

abi_fn! {
    fn pthread_cond_init(cond: *mut pthread_cond_t, attr: *const pthread_condattr_t) -> c_int {
        if cond.is_null() {
            return EINVAL;
        }
        let result = if attr.is_null() {
            Ok(Cond::new())
        } else {
            Cond::with_attr(&*attr)
        };
        let code = errno_result("cond", "init", &result);
        if let Ok(c) = result {
            ptr::write(cond, c);
        }
        code
    }
}

abi_fn! {
    fn pthread_cond_destroy(cond: *mut pthread_cond_t) -> c_int {
        if cond.is_null() {
            return EINVAL;
        }
        let result = (*cond).destroy();
        errno_result("cond", "destroy", &result)
    }
}

abi_fn! {
    fn pthread_cond_wait(cond: *mut pthread_cond_t, mutex: *mut pthread_mutex_t) -> c_int {
        if cond.is_null() || mutex.is_null() {
            return EINVAL;
        }
        let result = (*cond).wait(&*mutex);
        errno_result("cond", "wait", &result)
    }
}

abi_fn! {
    fn pthread_cond_timedwait(
        cond: *mut pthread_cond_t,
        mutex: *mut pthread_mutex_t,
        abstime: *const timespec,
    ) -> c_int {
        if cond.is_null() || mutex.is_null() || abstime.is_null() {
            return EINVAL;
        }
        let result = (*cond).timed_wait(&*mutex, &*abstime);
        errno_result("cond", "timedwait", &result)
    }
}

abi_fn! {
    fn pthread_cond_signal(cond: *mut pthread_cond_t) -> c_int {
        if cond.is_null() {
            return EINVAL;
        }
        let result = (*cond).signal();
        errno_result("cond", "signal", &result)
    }
}

abi_fn! {
    fn pthread_cond_broadcast(cond: *mut pthread_cond_t) -> c_int {
        if cond.is_null() {
            return EINVAL;
        }
        let result = (*cond).broadcast();
        errno_result("cond", "broadcast", &result)
    }
}

abi_fn! {
    fn pthread_condattr_init(attr: *mut pthread_condattr_t) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        ptr::write(attr, CondAttr::default());
        0
    }
}

abi_fn! {
    fn pthread_condattr_destroy(attr: *mut pthread_condattr_t) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        *attr = CondAttr::default();
        0
    }
}

abi_fn! {
    fn pthread_condattr_setpshared(attr: *mut pthread_condattr_t, pshared: c_int) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = ProcessShared::from_raw(pshared).map(|p| (*attr).pshared = p);
        errno_result("condattr", "setpshared", &result)
    }
}

abi_fn! {
    fn pthread_condattr_getpshared(attr: *const pthread_condattr_t, pshared: *mut c_int) -> c_int {
        if attr.is_null() || pshared.is_null() {
            return EINVAL;
        }
        *pshared = (*attr).pshared.as_raw();
        0
    }
}

abi_fn! {
    fn pthread_condattr_setclock(attr: *mut pthread_condattr_t, clock_id: clockid_t) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = ClockId::from_raw(clock_id).map(|c| (*attr).clock = c);
        errno_result("condattr", "setclock", &result)
    }
}

abi_fn! {
    fn pthread_condattr_getclock(attr: *const pthread_condattr_t, clock_id: *mut clockid_t) -> c_int {
        if attr.is_null() || clock_id.is_null() {
            return EINVAL;
        }
        *clock_id = (*attr).clock.as_raw();
        0
    }
}

// ---------------------------------------------------------------------------
// Spinlock
// ---------------------------------------------------------------------------

abi_fn! {
    fn pthread_spin_init(lock: *mut pthread_spinlock_t, pshared: c_int) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        let result = ProcessShared::from_raw(pshared).and_then(SpinLock::with_pshared);
        let code = errno_result("spin", "init", &result);
        if let Ok(l) = result {
            ptr::write(lock, l);
        }
        code
    }
}

abi_fn! {
    fn pthread_spin_destroy(lock: *mut pthread_spinlock_t) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        let result = (*lock).destroy();
        errno_result("spin", "destroy", &result)
    }
}

abi_fn! {
    fn pthread_spin_lock(lock: *mut pthread_spinlock_t) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        (*lock).lock();
        0
    }
}

abi_fn! {
    fn pthread_spin_trylock(lock: *mut pthread_spinlock_t) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        let result = (*lock).try_lock();
        errno_result("spin", "trylock", &result)
    }
}

abi_fn! {
    fn pthread_spin_unlock(lock: *mut pthread_spinlock_t) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        let result = (*lock).unlock();
        errno_result("spin", "unlock", &result)
    }
}

// ---------------------------------------------------------------------------
// Spinning reader-writer lock
// ---------------------------------------------------------------------------

abi_fn! {
    fn pthread_spin_rwlock_init(lock: *mut pthread_spin_rwlock_t, pshared: c_int) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        let result = ProcessShared::from_raw(pshared).and_then(SpinRwLock::with_pshared);
        let code = errno_result("spin_rwlock", "init", &result);
        if let Ok(l) = result {
            ptr::write(lock, l);
        }
        code
    }
}

abi_fn! {
    fn pthread_spin_rwlock_destroy(lock: *mut pthread_spin_rwlock_t) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        let result = (*lock).destroy();
        errno_result("spin_rwlock", "destroy", &result)
    }
}

abi_fn! {
    fn pthread_spin_rwlock_reader_lock(lock: *mut pthread_spin_rwlock_t) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        (*lock).read_lock();
        0
    }
}

abi_fn! {
    fn pthread_spin_rwlock_reader_unlock(lock: *mut pthread_spin_rwlock_t) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        let result = (*lock).read_unlock();
        errno_result("spin_rwlock", "reader_unlock", &result)
    }
}

abi_fn! {
    fn pthread_spin_rwlock_writer_lock(lock: *mut pthread_spin_rwlock_t) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        (*lock).write_lock();
        0
    }
}

abi_fn! {
    fn pthread_spin_rwlock_writer_unlock(lock: *mut pthread_spin_rwlock_t) -> c_int {
        if lock.is_null() {
            return EINVAL;
        }
        let result = (*lock).write_unlock();
        errno_result("spin_rwlock", "writer_unlock", &result)
    }
}

// ---------------------------------------------------------------------------
// Barrier
// ---------------------------------------------------------------------------

abi_fn! {
    fn pthread_barrier_init(
        barrier: *mut pthread_barrier_t,
        attr: *const pthread_barrierattr_t,
        count: c_uint,
    ) -> c_int {
        if barrier.is_null() {
            return EINVAL;
        }
        let attr = if attr.is_null() { BarrierAttr::default() } else { *attr };
        let result = Barrier::new(count, &attr);
        let code = errno_result("barrier", "init", &result);
        if let Ok(b) = result {
            ptr::write(barrier, Some(Box::new(b)));
        }
        code
    }
}

abi_fn! {
    fn pthread_barrier_destroy(barrier: *mut pthread_barrier_t) -> c_int {
        if barrier.is_null() {
            return EINVAL;
        }
        match (*barrier).take() {
            Some(b) => {
                b.destroy();
                0
            }
            None => EINVAL,
        }
    }
}

abi_fn! {
    /// POSIX `pthread_barrier_wait`: `PTHREAD_BARRIER_SERIAL_THREAD` (-1) for
    /// one caller per generation, 0 for the rest.
    fn pthread_barrier_wait(barrier: *mut pthread_barrier_t) -> c_int {
        if barrier.is_null() {
            return EINVAL;
        }
        let Some(b) = (*barrier).as_deref() else {
            return EINVAL;
        };
        match b.wait() {
            Ok(outcome) => outcome.as_raw(),
            Err(e) => errno_result::<()>("barrier", "wait", &Err(e)),
        }
    }
}

abi_fn! {
    fn pthread_barrierattr_init(attr: *mut pthread_barrierattr_t) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        ptr::write(attr, BarrierAttr::default());
        0
    }
}

abi_fn! {
    fn pthread_barrierattr_destroy(attr: *mut pthread_barrierattr_t) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        *attr = BarrierAttr::default();
        0
    }
}

abi_fn! {
    fn pthread_barrierattr_setpshared(attr: *mut pthread_barrierattr_t, pshared: c_int) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = ProcessShared::from_raw(pshared).map(|p| (*attr).pshared = p);
        errno_result("barrierattr", "setpshared", &result)
    }
}

abi_fn! {
    fn pthread_barrierattr_getpshared(
        attr: *const pthread_barrierattr_t,
        pshared: *mut c_int,
    ) -> c_int {
        if attr.is_null() || pshared.is_null() {
            return EINVAL;
        }
        *pshared = (*attr).pshared.as_raw();
        0
    }
}
