//! Thread lifecycle: create, join, detach, self, equal, exit.
//!
//! ## Ownership
//!
//! Every thread has one [`ControlBlock`] behind an `Arc`. The creating side's
//! reference lives in the context's [`ThreadTable`]; the running thread holds
//! its own reference in a thread-local. `join` removes the table entry after
//! the thread finishes; a detached thread removes its own entry when it
//! finishes. The block is freed when the last `Arc` drops, so there is exactly
//! one free path regardless of the join/detach/exit interleaving.
//!
//! ## Handles
//!
//! [`Pthread`] values are monotonically issued ids, never pointers. A handle
//! that was never issued is `NoSuchThread`; a handle that was issued but is
//! no longer joinable (joined, detached, or reclaimed) is `InvalidArgument`.
//!
//! ## Termination
//!
//! [`exit`] runs the cleanup handlers, then unwinds to the trampoline with a
//! private payload. Returning from the worker discards the cleanup handlers
//! without running them.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, const_mutex};

use super::attr::{DetachState, InheritSched, ThreadAttr};
use super::cancel::{self, CancelControl};
use super::cleanup::CleanupStack;
use super::tsd;
use crate::context::Context;
use crate::error::{PthreadError, PthreadResult};
use crate::host::native::{self, NativeThread};
use crate::sched::{Policy, SchedParam};
use crate::structured_log::LogLevel;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Opaque thread handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pthread(u64);

impl Pthread {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

/// Next id to issue. Zero is never issued.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn issue_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

fn was_issued(id: u64) -> bool {
    id != 0 && id < NEXT_ID.load(Ordering::Relaxed)
}

/// Error for an id with no live, joinable entry.
fn missing(id: u64) -> PthreadError {
    if was_issued(id) {
        PthreadError::InvalidArgument
    } else {
        PthreadError::NoSuchThread
    }
}

// ---------------------------------------------------------------------------
// Control block
// ---------------------------------------------------------------------------

const JOINABLE: u8 = 0;
const JOINING: u8 = 1;
const DETACHED: u8 = 2;
const JOINED: u8 = 3;

/// Per-thread bookkeeping shared by the thread and its joiner.
pub(crate) struct ControlBlock {
    id: u64,
    /// False for threads this library did not create (adopted on first use).
    managed: bool,
    /// Who will reclaim the block: `JOINABLE`, `JOINING`, `DETACHED`, `JOINED`.
    disposition: AtomicU8,
    finished: AtomicBool,
    native: Mutex<Option<NativeThread>>,
    result: Mutex<Option<usize>>,
    on_finish: Condvar,
    cleanup: Mutex<CleanupStack>,
    pub(crate) cancel: CancelControl,
    sched: Mutex<(Policy, SchedParam)>,
}

impl core::fmt::Debug for ControlBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlBlock")
            .field("id", &self.id)
            .field("managed", &self.managed)
            .field("disposition", &self.disposition.load(Ordering::Relaxed))
            .field("finished", &self.finished.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ControlBlock {
    fn new(id: u64, managed: bool, disposition: u8, sched: (Policy, SchedParam)) -> Self {
        Self {
            id,
            managed,
            disposition: AtomicU8::new(disposition),
            finished: AtomicBool::new(false),
            native: Mutex::new(None),
            result: Mutex::new(None),
            on_finish: Condvar::new(),
            cleanup: Mutex::new(CleanupStack::default()),
            cancel: CancelControl::default(),
            sched: Mutex::new(sched),
        }
    }

    pub(crate) fn is_managed(&self) -> bool {
        self.managed
    }

    fn is_detached(&self) -> bool {
        self.disposition.load(Ordering::SeqCst) == DETACHED
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub(crate) fn cleanup(&self) -> &Mutex<CleanupStack> {
        &self.cleanup
    }

    /// Run handlers most-recent first. Each handler runs with the stack
    /// unlocked so it may push or pop.
    pub(crate) fn run_cleanup_handlers(&self) {
        loop {
            let next = self.cleanup.lock().pop();
            match next {
                Some(handler) => handler(),
                None => break,
            }
        }
    }

    fn discard_cleanup_handlers(&self) {
        self.cleanup.lock().clear();
    }

    fn finish(&self, value: usize) {
        let mut result = self.result.lock();
        *result = Some(value);
        self.finished.store(true, Ordering::SeqCst);
        self.on_finish.notify_all();
    }

    /// Block until the thread finishes. A cancellation point.
    fn wait_finished(&self) -> usize {
        let mut result = self.result.lock();
        loop {
            if let Some(value) = *result {
                return value;
            }
            self.on_finish.wait_for(&mut result, cancel::CANCEL_POLL);
            if cancel::requested() {
                drop(result);
                cancel::testcancel();
                result = self.result.lock();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Thread table
// ---------------------------------------------------------------------------

/// Live threads created through one context.
#[derive(Debug, Default)]
pub struct ThreadTable {
    live: Mutex<HashMap<u64, Arc<ControlBlock>>>,
}

impl ThreadTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, block: Arc<ControlBlock>) {
        self.live.lock().insert(block.id, block);
    }

    pub(crate) fn get(&self, id: u64) -> Option<Arc<ControlBlock>> {
        self.live.lock().get(&id).cloned()
    }

    fn remove(&self, id: u64) {
        self.live.lock().remove(&id);
    }

    /// Threads not yet reclaimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Find `thread`, including the caller itself when it is not in the table.
pub(crate) fn lookup(ctx: &Context, thread: Pthread) -> PthreadResult<Arc<ControlBlock>> {
    if let Some(block) = ctx.threads().get(thread.0) {
        return Ok(block);
    }
    match current() {
        Some(me) if me.id == thread.0 => Ok(me),
        _ => Err(missing(thread.0)),
    }
}

// ---------------------------------------------------------------------------
// Current thread
// ---------------------------------------------------------------------------

thread_local! {
    static CURRENT: RefCell<Option<Arc<ControlBlock>>> = const { RefCell::new(None) };
}

/// The calling thread's block, if it has one.
pub(crate) fn current() -> Option<Arc<ControlBlock>> {
    CURRENT.try_with(|c| c.borrow().clone()).ok().flatten()
}

/// The calling thread's block, adopting foreign threads on first use.
pub(crate) fn current_or_adopt() -> Arc<ControlBlock> {
    if let Some(block) = current() {
        return block;
    }
    let block = Arc::new(ControlBlock::new(
        issue_id(),
        false,
        DETACHED,
        (Policy::Other, SchedParam::default()),
    ));
    let _ = CURRENT.try_with(|c| *c.borrow_mut() = Some(Arc::clone(&block)));
    block
}

fn install_current(block: Arc<ControlBlock>) {
    let _ = CURRENT.try_with(|c| *c.borrow_mut() = Some(block));
}

fn clear_current() {
    let _ = CURRENT.try_with(|c| c.borrow_mut().take());
}

// ---------------------------------------------------------------------------
// Running-thread accounting
// ---------------------------------------------------------------------------

static RUNNING: Mutex<usize> = const_mutex(0);
static ALL_FINISHED: Condvar = Condvar::new();

fn running_inc() {
    *RUNNING.lock() += 1;
}

fn running_dec() {
    let mut running = RUNNING.lock();
    *running = running.saturating_sub(1);
    if *running == 0 {
        ALL_FINISHED.notify_all();
    }
}

fn wait_all_finished() {
    let mut running = RUNNING.lock();
    while *running > 0 {
        ALL_FINISHED.wait(&mut running);
    }
}

// ---------------------------------------------------------------------------
// Lifecycle operations
// ---------------------------------------------------------------------------

/// Unwind payload carrying an explicit exit value to the trampoline.
pub(crate) struct ThreadExit {
    value: usize,
    cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Returned,
    Exited,
    Cancelled,
    Panicked,
}

impl Ending {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Returned => "returned",
            Self::Exited => "exited",
            Self::Cancelled => "cancelled",
            Self::Panicked => "panicked",
        }
    }
}

/// `pthread_create`.
///
/// The native thread is spawned suspended and resumed only after the control
/// block is fully published, so a failure leaves nothing behind.
pub fn create<F>(ctx: &Arc<Context>, attr: &ThreadAttr, worker: F) -> PthreadResult<Pthread>
where
    F: FnOnce() -> usize + Send + 'static,
{
    attr.validate()?;
    let sched = match attr.inherit_sched {
        InheritSched::Inherit => *current_or_adopt().sched.lock(),
        InheritSched::Explicit => (attr.policy, attr.param),
    };
    let disposition = match attr.detach_state {
        DetachState::Joinable => JOINABLE,
        DetachState::Detached => DETACHED,
    };
    let id = issue_id();
    let block = Arc::new(ControlBlock::new(id, true, disposition, sched));

    let name = attr.name.clone().unwrap_or_else(|| format!("fpt-{id}"));
    let body = {
        let ctx = Arc::clone(ctx);
        let block = Arc::clone(&block);
        move || trampoline(ctx, block, worker)
    };
    let native = native::spawn_suspended(name, attr.stack_size, body).map_err(|err| {
        ctx.log().emit_with(LogLevel::Warn, "thread_create_failed", |e| {
            e.with_op("thread", "create")
                .with_thread(id)
                .with_errno(err.errno())
        });
        err
    })?;

    {
        let mut slot = block.native.lock();
        ctx.threads().insert(Arc::clone(&block));
        running_inc();
        slot.insert(native).resume();
        if disposition == DETACHED {
            if let Some(native) = slot.take() {
                native.close();
            }
        }
    }

    ctx.log().emit_with(LogLevel::Info, "thread_created", |e| {
        e.with_op("thread", "create")
            .with_thread(id)
            .with_details(serde_json::json!({ "detached": disposition == DETACHED }))
    });
    Ok(Pthread(id))
}

fn trampoline<F>(ctx: Arc<Context>, block: Arc<ControlBlock>, worker: F)
where
    F: FnOnce() -> usize,
{
    install_current(Arc::clone(&block));
    let (value, ending) = match panic::catch_unwind(AssertUnwindSafe(worker)) {
        Ok(value) => {
            block.discard_cleanup_handlers();
            (value, Ending::Returned)
        }
        Err(payload) => match payload.downcast::<ThreadExit>() {
            Ok(exit) if exit.cancelled => (exit.value, Ending::Cancelled),
            Ok(exit) => (exit.value, Ending::Exited),
            Err(payload) => {
                block.discard_cleanup_handlers();
                ctx.log().emit_with(LogLevel::Error, "worker_panicked", |e| {
                    e.with_op("thread", "run")
                        .with_thread(block.id)
                        .with_details(serde_json::json!({ "message": panic_message(&*payload) }))
                });
                (0, Ending::Panicked)
            }
        },
    };
    if panic::catch_unwind(tsd::run_destructors).is_err() {
        ctx.log().emit_with(LogLevel::Error, "tsd_destructor_panicked", |e| {
            e.with_op("thread", "exit").with_thread(block.id)
        });
    }
    clear_current();
    block.finish(value);
    if block.is_detached() {
        ctx.threads().remove(block.id);
    }
    ctx.log().emit_with(LogLevel::Info, "thread_exited", |e| {
        e.with_op("thread", "exit")
            .with_thread(block.id)
            .with_details(serde_json::json!({ "how": ending.as_str(), "value": value }))
    });
    running_dec();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// `pthread_join`. A cancellation point.
pub fn join(ctx: &Context, thread: Pthread) -> PthreadResult<usize> {
    if current().is_some_and(|me| me.id == thread.0) {
        return Err(PthreadError::Deadlock);
    }
    cancel::testcancel();
    let block = ctx.threads().get(thread.0).ok_or_else(|| missing(thread.0))?;
    block
        .disposition
        .compare_exchange(JOINABLE, JOINING, Ordering::SeqCst, Ordering::SeqCst)
        .map_err(|_| PthreadError::InvalidArgument)?;

    let claim = JoinClaim { block: &block };
    let value = block.wait_finished();
    claim.complete();

    ctx.threads().remove(thread.0);
    let native = block.native.lock().take();
    if let Some(native) = native {
        native.join();
    }
    ctx.log().emit_with(LogLevel::Debug, "thread_joined", |e| {
        e.with_op("thread", "join").with_thread(thread.0)
    });
    Ok(value)
}

/// Returns a joinable thread to `JOINABLE` if the joiner unwinds (cancelled).
struct JoinClaim<'a> {
    block: &'a ControlBlock,
}

impl JoinClaim<'_> {
    fn complete(self) {
        self.block.disposition.store(JOINED, Ordering::SeqCst);
        core::mem::forget(self);
    }
}

impl Drop for JoinClaim<'_> {
    fn drop(&mut self) {
        let _ = self.block.disposition.compare_exchange(
            JOINING,
            JOINABLE,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// `pthread_detach`.
pub fn detach(ctx: &Context, thread: Pthread) -> PthreadResult<()> {
    let block = lookup(ctx, thread)?;
    block
        .disposition
        .compare_exchange(JOINABLE, DETACHED, Ordering::SeqCst, Ordering::SeqCst)
        .map_err(|_| PthreadError::InvalidArgument)?;
    let native = block.native.lock().take();
    if let Some(native) = native {
        native.close();
    }
    if block.is_finished() {
        ctx.threads().remove(block.id);
    }
    ctx.log().emit_with(LogLevel::Debug, "thread_detached", |e| {
        e.with_op("thread", "detach").with_thread(thread.0)
    });
    Ok(())
}

/// `pthread_self`. Threads not created here get an id on first call.
#[must_use]
pub fn self_() -> Pthread {
    Pthread(current_or_adopt().id)
}

/// `pthread_equal`.
#[must_use]
pub fn equal(a: Pthread, b: Pthread) -> bool {
    a == b
}

/// `pthread_exit`. Never returns.
///
/// On a thread created by [`create`] this unwinds to the trampoline, which
/// records `value` for the joiner. Any other thread unwinds to its own entry
/// point, except the process main thread: there the process ends with status
/// 0 once every created thread has finished.
pub fn exit(value: usize) -> ! {
    terminate(value, false)
}

pub(crate) fn terminate(value: usize, cancelled: bool) -> ! {
    let block = current_or_adopt();
    block.run_cleanup_handlers();
    if block.is_managed() {
        panic::resume_unwind(Box::new(ThreadExit { value, cancelled }));
    }
    let main = native::is_process_main_thread();
    Context::global().log().emit_with(LogLevel::Warn, "exit_on_unmanaged_thread", |e| {
        e.with_op("thread", "exit")
            .with_thread(block.id)
            .with_details(serde_json::json!({ "value": value, "main": main }))
    });
    tsd::run_destructors();
    clear_current();
    if !main {
        panic::resume_unwind(Box::new(ThreadExit { value, cancelled }));
    }
    wait_all_finished();
    std::process::exit(0)
}

/// `pthread_getschedparam`.
pub fn get_sched_param(ctx: &Context, thread: Pthread) -> PthreadResult<(Policy, SchedParam)> {
    Ok(*lookup(ctx, thread)?.sched.lock())
}

/// `pthread_setschedparam`. Recorded only; realtime policies are refused.
pub fn set_sched_param(
    ctx: &Context,
    thread: Pthread,
    policy: Policy,
    param: SchedParam,
) -> PthreadResult<()> {
    policy.require_supported()?;
    param.validate(policy)?;
    *lookup(ctx, thread)?.sched.lock() = (policy, param);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::structured_log::LogSink;
    use crate::time::SystemClock;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn ctx() -> Arc<Context> {
        Arc::new(Context::with_log(
            Config::default(),
            Arc::new(SystemClock::new()),
            LogSink::buffer(LogLevel::Debug),
        ))
    }

    #[test]
    fn create_and_join_returns_value() {
        let ctx = ctx();
        let t = create(&ctx, &ThreadAttr::default(), || 0xDEAD_BEEF).unwrap();
        assert_eq!(join(&ctx, t), Ok(0xDEAD_BEEF));
        assert!(ctx.threads().is_empty());
    }

    #[test]
    fn join_twice_is_invalid() {
        let ctx = ctx();
        let t = create(&ctx, &ThreadAttr::default(), || 3).unwrap();
        assert_eq!(join(&ctx, t), Ok(3));
        assert_eq!(join(&ctx, t), Err(PthreadError::InvalidArgument));
    }

    #[test]
    fn unissued_handle_is_no_such_thread() {
        let ctx = ctx();
        assert_eq!(
            join(&ctx, Pthread::from_raw(u64::MAX)),
            Err(PthreadError::NoSuchThread)
        );
        assert_eq!(
            detach(&ctx, Pthread::from_raw(0)),
            Err(PthreadError::NoSuchThread)
        );
    }

    #[test]
    fn self_join_is_deadlock() {
        let ctx = ctx();
        let inner = Arc::clone(&ctx);
        let t = create(&ctx, &ThreadAttr::default(), move || {
            match join(&inner, self_()) {
                Err(PthreadError::Deadlock) => 1,
                _ => 0,
            }
        })
        .unwrap();
        assert_eq!(join(&ctx, t), Ok(1));
    }

    #[test]
    fn self_is_stable_and_distinct() {
        let ctx = ctx();
        let me = self_();
        assert!(equal(me, self_()));
        let t = create(&ctx, &ThreadAttr::default(), || self_().as_raw() as usize).unwrap();
        let theirs = join(&ctx, t).unwrap() as u64;
        assert_eq!(theirs, t.as_raw());
        assert!(!equal(me, t));
    }

    #[test]
    fn detached_thread_reclaims_itself() {
        let ctx = ctx();
        let t = create(&ctx, &ThreadAttr::detached(), || 0).unwrap();
        assert_eq!(join(&ctx, t), Err(PthreadError::InvalidArgument));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !ctx.threads().is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(ctx.threads().is_empty());
    }

    #[test]
    fn detach_then_join_is_invalid() {
        let ctx = ctx();
        let gate = Arc::new(AtomicBool::new(false));
        let g = Arc::clone(&gate);
        let t = create(&ctx, &ThreadAttr::default(), move || {
            while !g.load(Ordering::SeqCst) {
                std::thread::yield_now();
            }
            0
        })
        .unwrap();
        detach(&ctx, t).unwrap();
        assert_eq!(detach(&ctx, t), Err(PthreadError::InvalidArgument));
        assert_eq!(join(&ctx, t), Err(PthreadError::InvalidArgument));
        gate.store(true, Ordering::SeqCst);
    }

    #[test]
    fn detach_after_finish_reclaims_immediately() {
        let ctx = ctx();
        let t = create(&ctx, &ThreadAttr::default(), || 0).unwrap();
        let block = ctx.threads().get(t.as_raw()).unwrap();
        while !block.is_finished() {
            std::thread::yield_now();
        }
        detach(&ctx, t).unwrap();
        assert!(ctx.threads().get(t.as_raw()).is_none());
    }

    #[test]
    fn exit_runs_cleanup_handlers_lifo() {
        let ctx = ctx();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&order);
        let t = create(&ctx, &ThreadAttr::default(), move || {
            for tag in 1..=3 {
                let o = Arc::clone(&o);
                crate::pthread::cleanup::cleanup_push(move || o.lock().push(tag));
            }
            exit(77)
        })
        .unwrap();
        assert_eq!(join(&ctx, t), Ok(77));
        assert_eq!(*order.lock(), vec![3, 2, 1]);
    }

    #[test]
    fn return_discards_cleanup_handlers() {
        let ctx = ctx();
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        let t = create(&ctx, &ThreadAttr::default(), move || {
            let r = Arc::clone(&r);
            crate::pthread::cleanup::cleanup_push(move || {
                r.fetch_add(1, Ordering::SeqCst);
            });
            5
        })
        .unwrap();
        assert_eq!(join(&ctx, t), Ok(5));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_worker_joins_as_zero_and_logs() {
        let ctx = ctx();
        let t = create(&ctx, &ThreadAttr::default(), || panic!("boom")).unwrap();
        assert_eq!(join(&ctx, t), Ok(0));
        let lines = ctx.log().captured_lines();
        assert!(lines.iter().any(|l| l.contains("worker_panicked") && l.contains("boom")));
    }

    #[test]
    fn lifecycle_is_logged() {
        let ctx = ctx();
        let t = create(&ctx, &ThreadAttr::default(), || 1).unwrap();
        join(&ctx, t).unwrap();
        let lines = ctx.log().captured_lines();
        for event in ["thread_created", "thread_exited", "thread_joined"] {
            assert!(
                lines.iter().any(|l| l.contains(event)),
                "missing {event} in {lines:?}"
            );
        }
    }

    #[test]
    fn invalid_attr_is_rejected_before_spawn() {
        let ctx = ctx();
        let attr = ThreadAttr {
            stack_size: Some(1),
            ..ThreadAttr::default()
        };
        assert_eq!(
            create(&ctx, &attr, || 0).err(),
            Some(PthreadError::InvalidArgument)
        );
        assert!(ctx.threads().is_empty());
    }

    #[test]
    fn sched_param_is_recorded_per_thread() {
        let ctx = ctx();
        let gate = Arc::new(AtomicBool::new(false));
        let g = Arc::clone(&gate);
        let t = create(&ctx, &ThreadAttr::default(), move || {
            while !g.load(Ordering::SeqCst) {
                std::thread::yield_now();
            }
            0
        })
        .unwrap();
        set_sched_param(&ctx, t, Policy::Other, SchedParam { priority: 4 }).unwrap();
        assert_eq!(
            get_sched_param(&ctx, t),
            Ok((Policy::Other, SchedParam { priority: 4 }))
        );
        assert_eq!(
            set_sched_param(&ctx, t, Policy::Fifo, SchedParam::default()),
            Err(PthreadError::Unsupported)
        );
        gate.store(true, Ordering::SeqCst);
        join(&ctx, t).unwrap();
    }

    #[test]
    fn exit_on_foreign_thread_ends_only_that_thread() {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        let t = std::thread::spawn(move || -> usize {
            crate::pthread::cleanup::cleanup_push(move || {
                r.fetch_add(1, Ordering::SeqCst);
            });
            exit(5)
        });
        let payload = t.join().unwrap_err();
        let ending = payload.downcast::<ThreadExit>().unwrap();
        assert_eq!(ending.value, 5);
        assert!(!ending.cancelled);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(current().is_none());
    }
}
