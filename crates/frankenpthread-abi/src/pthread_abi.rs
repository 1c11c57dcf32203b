//! ABI layer for the thread half of `<pthread.h>`.
//!
//! Lifecycle (create/join/detach/exit), cancellation, cleanup handlers,
//! run-once, thread-specific data and the attribute objects that feed them.
//! Every function returns 0 or an errno value.

use std::ffi::{c_int, c_void};
use std::ptr;
use std::sync::Arc;

use frankenpthread_core::Context;
use frankenpthread_core::errno::EINVAL;
use frankenpthread_core::pthread::attr::{PTHREAD_SCOPE_SYSTEM, ThreadAttr};
use frankenpthread_core::pthread::{
    self, CancelState, CancelType, DetachState, Destructor, InheritSched, Key, Pthread,
};
use frankenpthread_core::sched::Policy;

use crate::types::{
    ArgRoutine, DEFAULT_STACK_SIZE, OnceRoutine, StartRoutine, pthread_attr_t, pthread_key_t,
    pthread_once_t, pthread_t, sched_param,
};
use crate::util::errno_result;

// ---------------------------------------------------------------------------
// Foreign closures
// ---------------------------------------------------------------------------

/// A C routine and its argument, carried to another thread or deferred.
struct ForeignCall<F> {
    routine: F,
    arg: *mut c_void,
}

// SAFETY: handing `arg` to another thread is the contract of the C caller
// that supplied it.
unsafe impl<F: Send> Send for ForeignCall<F> {}

impl ForeignCall<StartRoutine> {
    fn run(self) -> usize {
        // SAFETY: `routine` was supplied by the caller as a valid start routine.
        unsafe { (self.routine)(self.arg) as usize }
    }
}

impl ForeignCall<ArgRoutine> {
    fn run(self) {
        // SAFETY: as above, for a cleanup handler.
        unsafe { (self.routine)(self.arg) }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_create`. A null `attr` means default attributes.
    fn pthread_create(
        thread: *mut pthread_t,
        attr: *const pthread_attr_t,
        start_routine: Option<StartRoutine>,
        arg: *mut c_void,
    ) -> c_int {
        if thread.is_null() {
            return EINVAL;
        }
        let Some(routine) = start_routine else {
            return EINVAL;
        };
        let defaults;
        let attr = if attr.is_null() {
            defaults = ThreadAttr::default();
            &defaults
        } else {
            &*attr
        };
        let start = ForeignCall { routine, arg };
        let result = pthread::create(Context::global(), attr, move || start.run());
        if let Ok(id) = result {
            *thread = id.as_raw();
        }
        errno_result("thread", "create", &result)
    }
}

abi_fn! {
    /// POSIX `pthread_join`. `retval` may be null.
    fn pthread_join(thread: pthread_t, retval: *mut *mut c_void) -> c_int {
        let result = pthread::join(Context::global(), Pthread::from_raw(thread));
        if let Ok(value) = result
            && !retval.is_null()
        {
            *retval = value as *mut c_void;
        }
        errno_result("thread", "join", &result)
    }
}

abi_fn! {
    fn pthread_detach(thread: pthread_t) -> c_int {
        let result = pthread::detach(Context::global(), Pthread::from_raw(thread));
        errno_result("thread", "detach", &result)
    }
}

abi_fn! {
    fn pthread_self() -> pthread_t {
        pthread::self_().as_raw()
    }
}

abi_fn! {
    fn pthread_equal(t1: pthread_t, t2: pthread_t) -> c_int {
        c_int::from(pthread::equal(Pthread::from_raw(t1), Pthread::from_raw(t2)))
    }
}

/// POSIX `pthread_exit`. Unwinds to the thread trampoline with `retval`.
#[cfg_attr(feature = "interpose", unsafe(no_mangle))]
pub unsafe extern "C-unwind" fn pthread_exit(retval: *mut c_void) -> ! {
    pthread::exit(retval as usize)
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

abi_fn! {
    fn pthread_cancel(thread: pthread_t) -> c_int {
        let result = pthread::cancel(Context::global(), Pthread::from_raw(thread));
        errno_result("thread", "cancel", &result)
    }
}

abi_fn! {
    fn pthread_setcancelstate(state: c_int, oldstate: *mut c_int) -> c_int {
        let result = CancelState::from_raw(state).map(pthread::set_cancel_state);
        if let Ok(old) = result
            && !oldstate.is_null()
        {
            *oldstate = old.as_raw();
        }
        errno_result("thread", "setcancelstate", &result)
    }
}

abi_fn! {
    fn pthread_setcanceltype(kind: c_int, oldtype: *mut c_int) -> c_int {
        let result = CancelType::from_raw(kind).and_then(pthread::set_cancel_type);
        if let Ok(old) = result
            && !oldtype.is_null()
        {
            *oldtype = old.as_raw();
        }
        errno_result("thread", "setcanceltype", &result)
    }
}

abi_fn! {
    fn pthread_testcancel() {
        pthread::testcancel();
    }
}

abi_fn! {
    /// POSIX `pthread_kill`. Only signal 0 (existence probe) is delivered.
    fn pthread_kill(thread: pthread_t, sig: c_int) -> c_int {
        let result = pthread::kill(Context::global(), Pthread::from_raw(thread), sig);
        errno_result("thread", "kill", &result)
    }
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

abi_fn! {
    fn pthread_getschedparam(
        thread: pthread_t,
        policy: *mut c_int,
        param: *mut sched_param,
    ) -> c_int {
        if policy.is_null() || param.is_null() {
            return EINVAL;
        }
        let result = pthread::thread::get_sched_param(Context::global(), Pthread::from_raw(thread));
        if let Ok((p, sp)) = result {
            *policy = p.as_raw();
            *param = sp;
        }
        errno_result("thread", "getschedparam", &result)
    }
}

abi_fn! {
    fn pthread_setschedparam(
        thread: pthread_t,
        policy: c_int,
        param: *const sched_param,
    ) -> c_int {
        if param.is_null() {
            return EINVAL;
        }
        let result = Policy::from_raw(policy).and_then(|p| {
            pthread::thread::set_sched_param(Context::global(), Pthread::from_raw(thread), p, *param)
        });
        errno_result("thread", "setschedparam", &result)
    }
}

// ---------------------------------------------------------------------------
// Cleanup handlers and once
// ---------------------------------------------------------------------------

abi_fn! {
    /// Function form of the `pthread_cleanup_push` macro.
    fn pthread_cleanup_push(routine: Option<ArgRoutine>, arg: *mut c_void) {
        if let Some(routine) = routine {
            let call = ForeignCall { routine, arg };
            pthread::cleanup_push(move || call.run());
        }
    }
}

abi_fn! {
    /// Function form of the `pthread_cleanup_pop` macro.
    fn pthread_cleanup_pop(execute: c_int) {
        pthread::cleanup_pop(execute != 0);
    }
}

abi_fn! {
    fn pthread_once(once_control: *mut pthread_once_t, init_routine: Option<OnceRoutine>) -> c_int {
        if once_control.is_null() {
            return EINVAL;
        }
        let Some(init) = init_routine else {
            return EINVAL;
        };
        (*once_control).call_once(|| init());
        0
    }
}

// ---------------------------------------------------------------------------
// Thread-specific data
// ---------------------------------------------------------------------------

abi_fn! {
    fn pthread_key_create(key: *mut pthread_key_t, destructor: Option<ArgRoutine>) -> c_int {
        if key.is_null() {
            return EINVAL;
        }
        let destructor = destructor.map(|d| -> Destructor {
            // SAFETY: the destructor was registered by the caller for values
            // it stored under this key.
            Arc::new(move |value| unsafe { d(value as *mut c_void) })
        });
        let result = Key::create(destructor);
        if let Ok(k) = result {
            *key = k.to_raw();
        }
        errno_result("tsd", "key_create", &result)
    }
}

abi_fn! {
    fn pthread_key_delete(key: pthread_key_t) -> c_int {
        let result = Key::from_raw(key).delete();
        errno_result("tsd", "key_delete", &result)
    }
}

abi_fn! {
    /// POSIX `pthread_getspecific`. Null when unset or the key is invalid.
    fn pthread_getspecific(key: pthread_key_t) -> *mut c_void {
        Key::from_raw(key)
            .get()
            .map_or(ptr::null_mut(), |value| value as *mut c_void)
    }
}

abi_fn! {
    fn pthread_setspecific(key: pthread_key_t, value: *const c_void) -> c_int {
        let result = Key::from_raw(key).set(value as usize);
        errno_result("tsd", "setspecific", &result)
    }
}

// ---------------------------------------------------------------------------
// Thread attributes
// ---------------------------------------------------------------------------

abi_fn! {
    fn pthread_attr_init(attr: *mut pthread_attr_t) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        ptr::write(attr, ThreadAttr::default());
        0
    }
}

abi_fn! {
    fn pthread_attr_destroy(attr: *mut pthread_attr_t) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        ptr::drop_in_place(attr);
        ptr::write(attr, ThreadAttr::default());
        0
    }
}

abi_fn! {
    fn pthread_attr_setdetachstate(attr: *mut pthread_attr_t, state: c_int) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = DetachState::from_raw(state).map(|s| (*attr).detach_state = s);
        errno_result("attr", "setdetachstate", &result)
    }
}

abi_fn! {
    fn pthread_attr_getdetachstate(attr: *const pthread_attr_t, state: *mut c_int) -> c_int {
        if attr.is_null() || state.is_null() {
            return EINVAL;
        }
        *state = (*attr).detach_state.as_raw();
        0
    }
}

abi_fn! {
    fn pthread_attr_setstacksize(attr: *mut pthread_attr_t, stacksize: usize) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = (*attr).set_stack_size(stacksize);
        errno_result("attr", "setstacksize", &result)
    }
}

abi_fn! {
    fn pthread_attr_getstacksize(attr: *const pthread_attr_t, stacksize: *mut usize) -> c_int {
        if attr.is_null() || stacksize.is_null() {
            return EINVAL;
        }
        *stacksize = (*attr).stack_size.unwrap_or(DEFAULT_STACK_SIZE);
        0
    }
}

abi_fn! {
    fn pthread_attr_setinheritsched(attr: *mut pthread_attr_t, inherit: c_int) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = InheritSched::from_raw(inherit).map(|i| (*attr).inherit_sched = i);
        errno_result("attr", "setinheritsched", &result)
    }
}

abi_fn! {
    fn pthread_attr_getinheritsched(attr: *const pthread_attr_t, inherit: *mut c_int) -> c_int {
        if attr.is_null() || inherit.is_null() {
            return EINVAL;
        }
        *inherit = (*attr).inherit_sched.as_raw();
        0
    }
}

abi_fn! {
    fn pthread_attr_setschedpolicy(attr: *mut pthread_attr_t, policy: c_int) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = Policy::from_raw(policy).and_then(|p| (*attr).set_policy(p));
        errno_result("attr", "setschedpolicy", &result)
    }
}

abi_fn! {
    fn pthread_attr_getschedpolicy(attr: *const pthread_attr_t, policy: *mut c_int) -> c_int {
        if attr.is_null() || policy.is_null() {
            return EINVAL;
        }
        *policy = (*attr).policy.as_raw();
        0
    }
}

abi_fn! {
    fn pthread_attr_setschedparam(attr: *mut pthread_attr_t, param: *const sched_param) -> c_int {
        if attr.is_null() || param.is_null() {
            return EINVAL;
        }
        let result = (*attr).set_param(*param);
        errno_result("attr", "setschedparam", &result)
    }
}

abi_fn! {
    fn pthread_attr_getschedparam(attr: *const pthread_attr_t, param: *mut sched_param) -> c_int {
        if attr.is_null() || param.is_null() {
            return EINVAL;
        }
        *param = (*attr).param;
        0
    }
}

abi_fn! {
    fn pthread_attr_setscope(attr: *mut pthread_attr_t, scope: c_int) -> c_int {
        if attr.is_null() {
            return EINVAL;
        }
        let result = (*attr).set_scope(scope);
        errno_result("attr", "setscope", &result)
    }
}

abi_fn! {
    fn pthread_attr_getscope(attr: *const pthread_attr_t, scope: *mut c_int) -> c_int {
        if attr.is_null() || scope.is_null() {
            return EINVAL;
        }
        *scope = PTHREAD_SCOPE_SYSTEM;
        0
    }
}
