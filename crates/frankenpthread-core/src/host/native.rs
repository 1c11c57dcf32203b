//! Native thread creation in the suspended state.
//!
//! The spawned thread blocks on a start gate before running its body, so the
//! creator can finish bookkeeping first and only then [`resume`] it.
//!
//! [`resume`]: NativeThread::resume

use std::sync::Arc;
use std::thread::JoinHandle;

use super::event::KernelEvent;
use crate::error::{PthreadError, PthreadResult};

/// Owned native thread handle.
#[derive(Debug)]
pub struct NativeThread {
    handle: JoinHandle<()>,
    gate: Arc<KernelEvent>,
}

/// Spawn `body` on a new native thread that waits until resumed.
///
/// Host refusal (thread limit, stack allocation) maps to
/// `ResourceExhausted`; nothing is left running in that case.
pub fn spawn_suspended(
    name: String,
    stack_size: Option<usize>,
    body: impl FnOnce() + Send + 'static,
) -> PthreadResult<NativeThread> {
    let gate = Arc::new(KernelEvent::new());
    let mut builder = std::thread::Builder::new().name(name);
    if let Some(size) = stack_size {
        builder = builder.stack_size(size);
    }
    let start = Arc::clone(&gate);
    let handle = builder
        .spawn(move || {
            start.wait(None);
            body();
        })
        .map_err(|_| PthreadError::ResourceExhausted)?;
    Ok(NativeThread { handle, gate })
}

impl NativeThread {
    /// Release the start gate.
    pub fn resume(&self) {
        self.gate.set();
    }

    /// Wait for the native thread to terminate. `false` if it panicked.
    pub fn join(self) -> bool {
        self.handle.join().is_ok()
    }

    /// Close the handle; the thread keeps running.
    pub fn close(self) {
        drop(self.handle);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// True on the thread the process started on.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
#[must_use]
pub fn is_process_main_thread() -> bool {
    // SAFETY: both calls only read ids of the calling thread and process.
    unsafe { libc::gettid() == libc::getpid() }
}

#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn is_process_main_thread() -> bool {
    std::thread::current().name() == Some("main")
}
