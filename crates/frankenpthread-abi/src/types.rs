//! C-visible type aliases.
//!
//! Synchronization objects are the core types themselves; initialization
//! functions write them in place. Objects that need a stable address for
//! their whole life (barriers, semaphores) are boxed behind the handle.

use std::ffi::{c_int, c_void};

use frankenpthread_core::pthread::{
    Barrier, BarrierAttr, Cond, CondAttr, Mutex, MutexAttr, Once, SpinLock, SpinRwLock, ThreadAttr,
};
use frankenpthread_core::sched::SchedParam;
use frankenpthread_core::semaphore::Semaphore;
use frankenpthread_core::time::Timespec;

pub type pthread_t = u64;
pub type pthread_key_t = u32;
pub type clockid_t = c_int;
pub type pid_t = i32;
pub type mode_t = u32;

pub type pthread_attr_t = ThreadAttr;
pub type pthread_mutex_t = Mutex;
pub type pthread_mutexattr_t = MutexAttr;
pub type pthread_cond_t = Cond;
pub type pthread_condattr_t = CondAttr;
pub type pthread_spinlock_t = SpinLock;
pub type pthread_spin_rwlock_t = SpinRwLock;
pub type pthread_barrier_t = Option<Box<Barrier>>;
pub type pthread_barrierattr_t = BarrierAttr;
pub type pthread_once_t = Once;
pub type sem_t = Option<Box<Semaphore>>;
pub type timespec = Timespec;
pub type sched_param = SchedParam;

/// Thread start routine.
pub type StartRoutine = unsafe extern "C-unwind" fn(*mut c_void) -> *mut c_void;
/// Cleanup handler and TSD destructor.
pub type ArgRoutine = unsafe extern "C-unwind" fn(*mut c_void);
/// `pthread_once` initializer.
pub type OnceRoutine = unsafe extern "C-unwind" fn();

#[allow(clippy::declare_interior_mutable_const)]
pub const PTHREAD_MUTEX_INITIALIZER: pthread_mutex_t = Mutex::new();
#[allow(clippy::declare_interior_mutable_const)]
pub const PTHREAD_COND_INITIALIZER: pthread_cond_t = Cond::new();
#[allow(clippy::declare_interior_mutable_const)]
pub const PTHREAD_ONCE_INIT: pthread_once_t = Once::new();

/// `SEM_FAILED`.
pub const SEM_FAILED: *mut sem_t = std::ptr::null_mut();

/// Stack size reported for attributes that never set one.
pub const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
