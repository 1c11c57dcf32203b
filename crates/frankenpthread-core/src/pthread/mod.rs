//! POSIX threads.
//!
//! Thread lifecycle, cancellation, cleanup handlers, run-once, thread-specific
//! data, and the synchronization objects built on the host layer: adaptive
//! mutexes, condition variables, ticket spinlocks, spinning reader-writer
//! locks and barriers.

pub mod attr;
pub mod barrier;
pub mod cancel;
pub mod cleanup;
pub mod cond;
pub mod mutex;
pub mod once;
pub mod spin;
pub mod spin_rwlock;
pub mod thread;
pub mod tsd;

pub use attr::{
    BarrierAttr, CondAttr, DetachState, InheritSched, MutexAttr, MutexKind, MutexProtocol,
    PTHREAD_MUTEX_DEFAULT, PTHREAD_MUTEX_ERRORCHECK, PTHREAD_MUTEX_NORMAL,
    PTHREAD_MUTEX_RECURSIVE, PTHREAD_STACK_MIN, ProcessShared, ThreadAttr,
};
pub use barrier::{Barrier, BarrierWaitResult, PTHREAD_BARRIER_SERIAL_THREAD};
pub use cancel::{
    CancelState, CancelType, PTHREAD_CANCELED, cancel, kill, set_cancel_state, set_cancel_type,
    testcancel,
};
pub use cleanup::{cleanup_pop, cleanup_push};
pub use cond::Cond;
pub use mutex::Mutex;
pub use once::Once;
pub use spin::SpinLock;
pub use spin_rwlock::SpinRwLock;
pub use thread::{Pthread, create, detach, equal, exit, join, self_};
pub use tsd::{Destructor, Key, PTHREAD_DESTRUCTOR_ITERATIONS, PTHREAD_KEYS_MAX};
