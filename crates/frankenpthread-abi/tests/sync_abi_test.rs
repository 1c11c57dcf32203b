use std::ffi::c_int;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use frankenpthread_abi::sync_abi::{
    pthread_barrier_destroy, pthread_barrier_init, pthread_barrier_wait,
    pthread_barrierattr_init, pthread_barrierattr_setpshared, pthread_cond_broadcast,
    pthread_cond_destroy, pthread_cond_init, pthread_cond_signal, pthread_cond_timedwait,
    pthread_cond_wait, pthread_condattr_getclock, pthread_condattr_init,
    pthread_condattr_setclock, pthread_mutex_destroy, pthread_mutex_init, pthread_mutex_lock,
    pthread_mutex_timedlock, pthread_mutex_trylock, pthread_mutex_unlock,
    pthread_mutexattr_gettype, pthread_mutexattr_init, pthread_mutexattr_setprotocol,
    pthread_mutexattr_setpshared, pthread_mutexattr_settype, pthread_spin_destroy,
    pthread_spin_init, pthread_spin_lock, pthread_spin_rwlock_destroy,
    pthread_spin_rwlock_init, pthread_spin_rwlock_reader_lock,
    pthread_spin_rwlock_reader_unlock, pthread_spin_rwlock_writer_lock,
    pthread_spin_rwlock_writer_unlock, pthread_spin_trylock, pthread_spin_unlock,
};
use frankenpthread_abi::types::{
    PTHREAD_COND_INITIALIZER, PTHREAD_MUTEX_INITIALIZER, pthread_barrier_t,
    pthread_barrierattr_t, pthread_cond_t, pthread_condattr_t, pthread_mutex_t,
    pthread_mutexattr_t, pthread_spin_rwlock_t, pthread_spinlock_t, timespec,
};
use frankenpthread_core::errno::{EBUSY, EINVAL, ENOTSUP, EPERM, ETIMEDOUT};
use frankenpthread_core::pthread::attr::{
    PTHREAD_MUTEX_ERRORCHECK, PTHREAD_PRIO_INHERIT, PTHREAD_PROCESS_PRIVATE,
    PTHREAD_PROCESS_SHARED,
};
use frankenpthread_core::time::{CLOCK_MONOTONIC, Timespec};

/// Shareable raw pointer for handing C objects to test threads.
struct Shared<T>(*mut T);

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Shared<T> {}

// SAFETY: the pointees are thread-safe synchronization objects.
unsafe impl<T> Send for Shared<T> {}
unsafe impl<T> Sync for Shared<T> {}

impl<T> Shared<T> {
    fn get(self) -> *mut T {
        self.0
    }
}

fn boxed<T>(value: T) -> Shared<T> {
    Shared(Box::into_raw(Box::new(value)))
}

unsafe fn free<T>(ptr: Shared<T>) {
    // SAFETY: pointer was allocated with Box::into_raw in `boxed`.
    unsafe { drop(Box::from_raw(ptr.get())) };
}

fn past() -> timespec {
    Timespec::new(1, 0)
}

#[test]
fn mutex_roundtrip_and_error_codes() {
    let mutex = boxed::<pthread_mutex_t>(PTHREAD_MUTEX_INITIALIZER);
    let m = mutex.get();
    unsafe {
        assert_eq!(pthread_mutex_init(m, ptr::null()), 0);
        assert_eq!(pthread_mutex_lock(m), 0);
        assert_eq!(pthread_mutex_unlock(m), 0);
        assert_eq!(pthread_mutex_unlock(m), EPERM);
        assert_eq!(pthread_mutex_lock(m), 0);
        assert_eq!(pthread_mutex_trylock(m), EBUSY);
        assert_eq!(pthread_mutex_destroy(m), EBUSY);
        assert_eq!(pthread_mutex_timedlock(m, &past()), ETIMEDOUT);
        assert_eq!(pthread_mutex_unlock(m), 0);
        assert_eq!(pthread_mutex_timedlock(m, &past()), 0);
        assert_eq!(pthread_mutex_unlock(m), 0);
        assert_eq!(pthread_mutex_destroy(m), 0);
        free(mutex);
    }
}

#[test]
fn null_objects_are_invalid() {
    unsafe {
        assert_eq!(pthread_mutex_lock(ptr::null_mut()), EINVAL);
        assert_eq!(pthread_cond_signal(ptr::null_mut()), EINVAL);
        assert_eq!(pthread_spin_lock(ptr::null_mut()), EINVAL);
        assert_eq!(pthread_barrier_wait(ptr::null_mut()), EINVAL);
    }
}

#[test]
fn static_mutex_serializes_threads() {
    static MUTEX: pthread_mutex_t = PTHREAD_MUTEX_INITIALIZER;
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let m = || ptr::from_ref(&MUTEX).cast_mut();
    let threads: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(move || {
                for _ in 0..2_000 {
                    unsafe {
                        assert_eq!(pthread_mutex_lock(m()), 0);
                        let v = COUNTER.load(Ordering::Relaxed);
                        COUNTER.store(v + 1, Ordering::Relaxed);
                        assert_eq!(pthread_mutex_unlock(m()), 0);
                    }
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(COUNTER.load(Ordering::Relaxed), 8_000);
}

#[test]
fn mutex_attributes() {
    unsafe {
        let mut attr = MaybeUninit::<pthread_mutexattr_t>::uninit();
        let attr = attr.as_mut_ptr();
        assert_eq!(pthread_mutexattr_init(attr), 0);
        assert_eq!(pthread_mutexattr_settype(attr, 42), EINVAL);
        assert_eq!(pthread_mutexattr_settype(attr, PTHREAD_MUTEX_ERRORCHECK), 0);
        let mut kind: c_int = -1;
        assert_eq!(pthread_mutexattr_gettype(attr, &mut kind), 0);
        assert_eq!(kind, PTHREAD_MUTEX_ERRORCHECK);

        let mut mutex = MaybeUninit::<pthread_mutex_t>::uninit();
        assert_eq!(pthread_mutex_init(mutex.as_mut_ptr(), attr), 0);
        assert_eq!(pthread_mutex_destroy(mutex.as_mut_ptr()), 0);

        assert_eq!(pthread_mutexattr_setpshared(attr, PTHREAD_PROCESS_SHARED), 0);
        assert_eq!(pthread_mutex_init(mutex.as_mut_ptr(), attr), ENOTSUP);
        assert_eq!(pthread_mutexattr_setpshared(attr, PTHREAD_PROCESS_PRIVATE), 0);
        assert_eq!(pthread_mutexattr_setprotocol(attr, PTHREAD_PRIO_INHERIT), 0);
        assert_eq!(pthread_mutex_init(mutex.as_mut_ptr(), attr), ENOTSUP);
    }
}

#[test]
fn cond_signal_wakes_waiter_holding_mutex() {
    let mutex = boxed::<pthread_mutex_t>(PTHREAD_MUTEX_INITIALIZER);
    let cond = boxed::<pthread_cond_t>(PTHREAD_COND_INITIALIZER);
    let ready = Arc::new(AtomicUsize::new(0));

    let waiter = {
        let ready = Arc::clone(&ready);
        std::thread::spawn(move || unsafe {
            assert_eq!(pthread_mutex_lock(mutex.get()), 0);
            while ready.load(Ordering::SeqCst) == 0 {
                assert_eq!(pthread_cond_wait(cond.get(), mutex.get()), 0);
            }
            // Still the owner after waking.
            assert_eq!(pthread_mutex_unlock(mutex.get()), 0);
        })
    };

    std::thread::sleep(Duration::from_millis(20));
    unsafe {
        assert_eq!(pthread_mutex_lock(mutex.get()), 0);
        ready.store(1, Ordering::SeqCst);
        assert_eq!(pthread_cond_signal(cond.get()), 0);
        assert_eq!(pthread_mutex_unlock(mutex.get()), 0);
    }
    waiter.join().unwrap();
    unsafe {
        assert_eq!(pthread_cond_broadcast(cond.get()), 0);
        assert_eq!(pthread_cond_destroy(cond.get()), 0);
        assert_eq!(pthread_mutex_destroy(mutex.get()), 0);
        free(cond);
        free(mutex);
    }
}

#[test]
fn cond_timedwait_on_monotonic_clock_times_out() {
    unsafe {
        let mut attr = MaybeUninit::<pthread_condattr_t>::uninit();
        let attr = attr.as_mut_ptr();
        assert_eq!(pthread_condattr_init(attr), 0);
        assert_eq!(pthread_condattr_setclock(attr, 99), EINVAL);
        assert_eq!(pthread_condattr_setclock(attr, CLOCK_MONOTONIC), 0);
        let mut clock = -1;
        assert_eq!(pthread_condattr_getclock(attr, &mut clock), 0);
        assert_eq!(clock, CLOCK_MONOTONIC);

        let mut cond = MaybeUninit::<pthread_cond_t>::uninit();
        let mut mutex = MaybeUninit::<pthread_mutex_t>::uninit();
        assert_eq!(pthread_cond_init(cond.as_mut_ptr(), attr), 0);
        assert_eq!(pthread_mutex_init(mutex.as_mut_ptr(), ptr::null()), 0);

        let start = Instant::now();
        assert_eq!(pthread_mutex_lock(mutex.as_mut_ptr()), 0);
        assert_eq!(
            pthread_cond_timedwait(cond.as_mut_ptr(), mutex.as_mut_ptr(), &Timespec::ZERO),
            ETIMEDOUT
        );
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(pthread_mutex_unlock(mutex.as_mut_ptr()), 0);
        assert_eq!(pthread_cond_destroy(cond.as_mut_ptr()), 0);
        assert_eq!(pthread_mutex_destroy(mutex.as_mut_ptr()), 0);
    }
}

#[test]
fn spinlock_codes() {
    unsafe {
        let mut lock = MaybeUninit::<pthread_spinlock_t>::uninit();
        let l = lock.as_mut_ptr();
        assert_eq!(pthread_spin_init(l, PTHREAD_PROCESS_SHARED), ENOTSUP);
        assert_eq!(pthread_spin_init(l, 7), EINVAL);
        assert_eq!(pthread_spin_init(l, PTHREAD_PROCESS_PRIVATE), 0);
        assert_eq!(pthread_spin_unlock(l), EPERM);
        assert_eq!(pthread_spin_lock(l), 0);
        assert_eq!(pthread_spin_trylock(l), EBUSY);
        assert_eq!(pthread_spin_destroy(l), EBUSY);
        assert_eq!(pthread_spin_unlock(l), 0);
        assert_eq!(pthread_spin_trylock(l), 0);
        assert_eq!(pthread_spin_unlock(l), 0);
        assert_eq!(pthread_spin_destroy(l), 0);
    }
}

#[test]
fn spin_rwlock_readers_then_writer() {
    let lock = boxed(MaybeUninit::<pthread_spin_rwlock_t>::uninit());
    let l = Shared(lock.get().cast::<pthread_spin_rwlock_t>());
    unsafe {
        assert_eq!(pthread_spin_rwlock_init(l.get(), PTHREAD_PROCESS_PRIVATE), 0);
        assert_eq!(pthread_spin_rwlock_reader_unlock(l.get()), EPERM);
        assert_eq!(pthread_spin_rwlock_reader_lock(l.get()), 0);
        assert_eq!(pthread_spin_rwlock_reader_lock(l.get()), 0);
        assert_eq!(pthread_spin_rwlock_destroy(l.get()), EBUSY);
    }

    let writer = std::thread::spawn(move || unsafe {
        assert_eq!(pthread_spin_rwlock_writer_lock(l.get()), 0);
        assert_eq!(pthread_spin_rwlock_writer_unlock(l.get()), 0);
    });
    std::thread::sleep(Duration::from_millis(10));
    assert!(!writer.is_finished());
    unsafe {
        assert_eq!(pthread_spin_rwlock_reader_unlock(l.get()), 0);
        assert_eq!(pthread_spin_rwlock_reader_unlock(l.get()), 0);
    }
    writer.join().unwrap();
    unsafe {
        assert_eq!(pthread_spin_rwlock_writer_unlock(l.get()), EPERM);
        assert_eq!(pthread_spin_rwlock_destroy(l.get()), 0);
        free(lock);
    }
}

#[test]
fn barrier_returns_one_serial_per_generation() {
    const PARTIES: usize = 3;
    let barrier = boxed::<pthread_barrier_t>(None);
    unsafe {
        assert_eq!(pthread_barrier_init(barrier.get(), ptr::null(), 0), EINVAL);
        assert_eq!(
            pthread_barrier_init(barrier.get(), ptr::null(), PARTIES as u32),
            0
        );
    }
    let serials = Arc::new(AtomicUsize::new(0));
    let threads: Vec<_> = (0..PARTIES)
        .map(|_| {
            let serials = Arc::clone(&serials);
            std::thread::spawn(move || {
                for _ in 0..10 {
                    match unsafe { pthread_barrier_wait(barrier.get()) } {
                        -1 => {
                            serials.fetch_add(1, Ordering::SeqCst);
                        }
                        0 => {}
                        other => panic!("unexpected barrier result {other}"),
                    }
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(serials.load(Ordering::SeqCst), 10);
    unsafe {
        assert_eq!(pthread_barrier_destroy(barrier.get()), 0);
        assert_eq!(pthread_barrier_destroy(barrier.get()), EINVAL);
        assert_eq!(pthread_barrier_wait(barrier.get()), EINVAL);
        free(barrier);
    }
}

#[test]
fn shared_barrier_attr_is_refused() {
    unsafe {
        let mut attr = MaybeUninit::<pthread_barrierattr_t>::uninit();
        assert_eq!(pthread_barrierattr_init(attr.as_mut_ptr()), 0);
        assert_eq!(
            pthread_barrierattr_setpshared(attr.as_mut_ptr(), PTHREAD_PROCESS_SHARED),
            0
        );
        let mut barrier = MaybeUninit::<pthread_barrier_t>::uninit();
        assert_eq!(
            pthread_barrier_init(barrier.as_mut_ptr(), attr.as_ptr(), 2),
            ENOTSUP
        );
    }
}
