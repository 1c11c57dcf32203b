use std::ffi::{c_int, c_void};
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use frankenpthread_abi::pthread_abi::{
    pthread_attr_destroy, pthread_attr_getdetachstate, pthread_attr_getstacksize,
    pthread_attr_init, pthread_attr_setdetachstate, pthread_attr_setschedpolicy,
    pthread_attr_setscope, pthread_attr_setstacksize, pthread_cancel, pthread_cleanup_pop,
    pthread_cleanup_push, pthread_create, pthread_detach, pthread_equal, pthread_exit,
    pthread_getspecific, pthread_join, pthread_key_create, pthread_key_delete, pthread_kill,
    pthread_once, pthread_self, pthread_setcancelstate, pthread_setspecific, pthread_testcancel,
};
use frankenpthread_abi::types::{
    DEFAULT_STACK_SIZE, PTHREAD_ONCE_INIT, pthread_attr_t, pthread_key_t, pthread_once_t,
    pthread_t,
};
use frankenpthread_core::errno::{EDEADLK, EINVAL, ENOTSUP, ESRCH};
use frankenpthread_core::pthread::attr::{
    PTHREAD_CREATE_DETACHED, PTHREAD_CREATE_JOINABLE, PTHREAD_SCOPE_PROCESS, PTHREAD_STACK_MIN,
};
use frankenpthread_core::pthread::cancel::{PTHREAD_CANCEL_DISABLE, PTHREAD_CANCEL_ENABLE};
use frankenpthread_core::pthread::PTHREAD_CANCELED;
use frankenpthread_core::sched::SCHED_FIFO;

static TEST_GUARD_HELD: AtomicBool = AtomicBool::new(false);

struct TestGuard;

impl Drop for TestGuard {
    fn drop(&mut self) {
        TEST_GUARD_HELD.store(false, Ordering::Release);
    }
}

fn acquire_test_guard() -> TestGuard {
    loop {
        if TEST_GUARD_HELD
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return TestGuard;
        }
        std::thread::yield_now();
    }
}

unsafe fn spawn(
    routine: unsafe extern "C-unwind" fn(*mut c_void) -> *mut c_void,
    arg: *mut c_void,
) -> pthread_t {
    let mut thread: pthread_t = 0;
    // SAFETY: `thread` is a valid out-pointer; a null attr means defaults.
    let rc = unsafe { pthread_create(&mut thread, ptr::null(), Some(routine), arg) };
    assert_eq!(rc, 0);
    thread
}

unsafe extern "C-unwind" fn double_it(arg: *mut c_void) -> *mut c_void {
    (arg as usize * 2) as *mut c_void
}

#[test]
fn create_join_returns_start_routine_value() {
    unsafe {
        let thread = spawn(double_it, 21 as *mut c_void);
        let mut retval: *mut c_void = ptr::null_mut();
        assert_eq!(pthread_join(thread, &mut retval), 0);
        assert_eq!(retval as usize, 42);
        assert_eq!(pthread_join(thread, ptr::null_mut()), EINVAL);
        assert_eq!(pthread_join(u64::MAX - 1, ptr::null_mut()), ESRCH);
    }
}

#[test]
fn create_rejects_null_arguments() {
    unsafe {
        let mut thread: pthread_t = 0;
        assert_eq!(
            pthread_create(&mut thread, ptr::null(), None, ptr::null_mut()),
            EINVAL
        );
        assert_eq!(
            pthread_create(ptr::null_mut(), ptr::null(), Some(double_it), ptr::null_mut()),
            EINVAL
        );
    }
}

#[test]
fn self_join_is_deadlock_and_self_equals_self() {
    unsafe {
        let me = pthread_self();
        assert_eq!(pthread_equal(me, pthread_self()), 1);
        assert_eq!(pthread_join(me, ptr::null_mut()), EDEADLK);
    }
}

#[test]
fn detached_thread_cannot_be_joined() {
    unsafe {
        let thread = spawn(double_it, 1 as *mut c_void);
        assert_eq!(pthread_detach(thread), 0);
        assert_eq!(pthread_join(thread, ptr::null_mut()), EINVAL);
    }
}

static CLEANUP_RUNS: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C-unwind" fn count_cleanup(arg: *mut c_void) {
    CLEANUP_RUNS.fetch_add(arg as usize, Ordering::SeqCst);
}

unsafe extern "C-unwind" fn exit_with_handlers(_arg: *mut c_void) -> *mut c_void {
    unsafe {
        pthread_cleanup_push(Some(count_cleanup), 100 as *mut c_void);
        pthread_cleanup_push(Some(count_cleanup), 10 as *mut c_void);
        pthread_cleanup_pop(0);
        pthread_cleanup_push(Some(count_cleanup), 1 as *mut c_void);
        pthread_cleanup_pop(1);
        pthread_exit(7 as *mut c_void)
    }
}

#[test]
fn exit_runs_remaining_cleanup_handlers() {
    let _guard = acquire_test_guard();
    CLEANUP_RUNS.store(0, Ordering::SeqCst);
    unsafe {
        let thread = spawn(exit_with_handlers, ptr::null_mut());
        let mut retval: *mut c_void = ptr::null_mut();
        assert_eq!(pthread_join(thread, &mut retval), 0);
        assert_eq!(retval as usize, 7);
    }
    // The popped-without-running handler (10) never fires.
    assert_eq!(CLEANUP_RUNS.load(Ordering::SeqCst), 101);
}

unsafe extern "C-unwind" fn spin_on_testcancel(_arg: *mut c_void) -> *mut c_void {
    loop {
        unsafe { pthread_testcancel() };
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}

#[test]
fn cancelled_thread_joins_with_canceled_marker() {
    unsafe {
        let thread = spawn(spin_on_testcancel, ptr::null_mut());
        assert_eq!(pthread_kill(thread, 0), 0);
        assert_eq!(pthread_kill(thread, 15), ENOTSUP);
        assert_eq!(pthread_cancel(thread), 0);
        let mut retval: *mut c_void = ptr::null_mut();
        assert_eq!(pthread_join(thread, &mut retval), 0);
        assert_eq!(retval as usize, PTHREAD_CANCELED);
        assert_eq!(pthread_cancel(thread), ESRCH);
    }
}

unsafe extern "C-unwind" fn cancel_disabled(_arg: *mut c_void) -> *mut c_void {
    unsafe {
        let mut old: c_int = -1;
        assert_eq!(pthread_setcancelstate(PTHREAD_CANCEL_DISABLE, &mut old), 0);
        assert_eq!(old, PTHREAD_CANCEL_ENABLE);
        pthread_cancel(pthread_self());
        pthread_testcancel();
        assert_eq!(pthread_setcancelstate(PTHREAD_CANCEL_ENABLE, &mut old), 0);
        assert_eq!(old, PTHREAD_CANCEL_DISABLE);
        pthread_testcancel();
    }
    5 as *mut c_void
}

#[test]
fn disabled_cancellation_is_deferred_until_enabled() {
    unsafe {
        let thread = spawn(cancel_disabled, ptr::null_mut());
        let mut retval: *mut c_void = ptr::null_mut();
        assert_eq!(pthread_join(thread, &mut retval), 0);
        assert_eq!(retval as usize, PTHREAD_CANCELED);
    }
}

static ONCE_RUNS: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C-unwind" fn once_init() {
    ONCE_RUNS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn once_runs_initializer_exactly_once() {
    static CONTROL: pthread_once_t = PTHREAD_ONCE_INIT;
    let control = || ptr::from_ref(&CONTROL).cast_mut();
    let threads: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(move || unsafe { pthread_once(control(), Some(once_init)) }))
        .collect();
    for t in threads {
        assert_eq!(t.join().unwrap(), 0);
    }
    assert_eq!(ONCE_RUNS.load(Ordering::SeqCst), 1);
    unsafe {
        assert_eq!(pthread_once(ptr::null_mut(), Some(once_init)), EINVAL);
        assert_eq!(pthread_once(control(), None), EINVAL);
    }
}

static DESTROYED_WITH: AtomicUsize = AtomicUsize::new(0);
static KEY: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C-unwind" fn record_destructor(value: *mut c_void) {
    DESTROYED_WITH.store(value as usize, Ordering::SeqCst);
}

unsafe extern "C-unwind" fn store_specific(arg: *mut c_void) -> *mut c_void {
    let key = KEY.load(Ordering::SeqCst) as pthread_key_t;
    unsafe {
        assert!(pthread_getspecific(key).is_null());
        assert_eq!(pthread_setspecific(key, arg), 0);
        pthread_getspecific(key)
    }
}

#[test]
fn thread_specific_values_reach_their_destructor() {
    let _guard = acquire_test_guard();
    unsafe {
        let mut key: pthread_key_t = 0;
        assert_eq!(pthread_key_create(&mut key, Some(record_destructor)), 0);
        KEY.store(key as usize, Ordering::SeqCst);
        assert_eq!(pthread_setspecific(key, 3 as *const c_void), 0);

        let thread = spawn(store_specific, 0x55 as *mut c_void);
        let mut retval: *mut c_void = ptr::null_mut();
        assert_eq!(pthread_join(thread, &mut retval), 0);
        assert_eq!(retval as usize, 0x55);
        assert_eq!(DESTROYED_WITH.load(Ordering::SeqCst), 0x55);

        // The creating thread's value is untouched.
        assert_eq!(pthread_getspecific(key) as usize, 3);
        assert_eq!(pthread_key_delete(key), 0);
        assert_eq!(pthread_key_delete(key), EINVAL);
        assert_eq!(pthread_setspecific(key, ptr::null()), EINVAL);
    }
}

#[test]
fn thread_attr_roundtrip_and_validation() {
    unsafe {
        let mut attr = MaybeUninit::<pthread_attr_t>::uninit();
        let attr = attr.as_mut_ptr();
        assert_eq!(pthread_attr_init(attr), 0);

        let mut state: c_int = -1;
        assert_eq!(pthread_attr_getdetachstate(attr, &mut state), 0);
        assert_eq!(state, PTHREAD_CREATE_JOINABLE);
        assert_eq!(pthread_attr_setdetachstate(attr, 9), EINVAL);
        assert_eq!(pthread_attr_setdetachstate(attr, PTHREAD_CREATE_DETACHED), 0);
        assert_eq!(pthread_attr_getdetachstate(attr, &mut state), 0);
        assert_eq!(state, PTHREAD_CREATE_DETACHED);

        let mut size = 0usize;
        assert_eq!(pthread_attr_getstacksize(attr, &mut size), 0);
        assert_eq!(size, DEFAULT_STACK_SIZE);
        assert_eq!(pthread_attr_setstacksize(attr, PTHREAD_STACK_MIN - 1), EINVAL);
        assert_eq!(pthread_attr_setstacksize(attr, 256 * 1024), 0);
        assert_eq!(pthread_attr_getstacksize(attr, &mut size), 0);
        assert_eq!(size, 256 * 1024);

        assert_eq!(pthread_attr_setschedpolicy(attr, SCHED_FIFO), ENOTSUP);
        assert_eq!(pthread_attr_setscope(attr, PTHREAD_SCOPE_PROCESS), ENOTSUP);

        let mut thread: pthread_t = 0;
        assert_eq!(
            pthread_create(&mut thread, attr, Some(double_it), 1 as *mut c_void),
            0
        );
        assert_eq!(pthread_join(thread, ptr::null_mut()), EINVAL);

        assert_eq!(pthread_attr_destroy(attr), 0);
        assert_eq!(pthread_attr_init(ptr::null_mut()), EINVAL);
    }
}
