//! Counting and named semaphores.
//!
//! An unnamed semaphore owns its kernel object. A named one shares it through
//! the host namespace with every other handle opened under the same name; the
//! object lives until the last handle closes, so [`unlink`] has nothing to
//! remove.

use core::time::Duration;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{PthreadError, PthreadResult};
use crate::host::KernelSemaphore;
use crate::host::namespace::{self, CreateRequest};
use crate::pthread::cancel::{CANCEL_POLL, poll_slice, testcancel};
use crate::structured_log::LogLevel;
use crate::time::{ClockId, Timespec, relative_timeout};

/// Largest value a semaphore can hold.
pub const SEM_VALUE_MAX: u32 = i32::MAX as u32;
/// Longest accepted name, excluding the leading `/`.
pub const SEM_NAME_MAX: usize = 504;

/// Creation flags for [`Semaphore::open`] (`O_CREAT`, `O_EXCL`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OpenFlags {
    pub create: bool,
    pub exclusive: bool,
}

impl OpenFlags {
    /// Open an existing name only.
    pub const EXISTING: Self = Self {
        create: false,
        exclusive: false,
    };
    /// `O_CREAT`.
    pub const CREATE: Self = Self {
        create: true,
        exclusive: false,
    };
    /// `O_CREAT | O_EXCL`.
    pub const CREATE_NEW: Self = Self {
        create: true,
        exclusive: true,
    };
}

#[derive(Debug)]
pub struct Semaphore {
    kernel: Option<Arc<KernelSemaphore>>,
    name: Option<String>,
    ctx: Arc<Context>,
}

impl Semaphore {
    /// `sem_init` against the global context.
    pub fn new(pshared: bool, value: u32) -> PthreadResult<Self> {
        Self::new_in(Arc::clone(Context::global()), pshared, value)
    }

    /// `sem_init` bound to `ctx`. Process sharing is refused with
    /// `PermissionDenied`.
    pub fn new_in(ctx: Arc<Context>, pshared: bool, value: u32) -> PthreadResult<Self> {
        if pshared {
            return Err(PthreadError::PermissionDenied);
        }
        if value > SEM_VALUE_MAX {
            return Err(PthreadError::InvalidArgument);
        }
        let kernel =
            KernelSemaphore::new(value, SEM_VALUE_MAX).map_err(|_| PthreadError::ResourceExhausted)?;
        Ok(Self {
            kernel: Some(Arc::new(kernel)),
            name: None,
            ctx,
        })
    }

    /// `sem_open` against the global context. `value` is used only when
    /// the name is created.
    pub fn open(name: &str, flags: OpenFlags, value: u32) -> PthreadResult<Self> {
        Self::open_in(Arc::clone(Context::global()), name, flags, value)
    }

    pub fn open_in(
        ctx: Arc<Context>,
        name: &str,
        flags: OpenFlags,
        value: u32,
    ) -> PthreadResult<Self> {
        let key = normalize_name(name)?;
        if flags.create && value > SEM_VALUE_MAX {
            return Err(PthreadError::InvalidArgument);
        }
        let create = flags.create.then_some(CreateRequest {
            exclusive: flags.exclusive,
            initial: value,
            max: SEM_VALUE_MAX,
        });
        let opened = namespace::open(key, create)?;
        ctx.log().emit_with(LogLevel::Debug, "named_semaphore_opened", |e| {
            e.with_op("semaphore", "open").with_details(serde_json::json!({
                "name": key,
                "created": opened.created,
            }))
        });
        Ok(Self {
            kernel: Some(opened.semaphore),
            name: Some(key.to_string()),
            ctx,
        })
    }

    fn kernel(&self) -> PthreadResult<&KernelSemaphore> {
        self.kernel.as_deref().ok_or(PthreadError::InvalidArgument)
    }

    /// `sem_wait`. A cancellation point.
    pub fn wait(&self) -> PthreadResult<()> {
        let waiter = self.kernel()?.register();
        loop {
            testcancel();
            if waiter.acquire(Some(CANCEL_POLL)) {
                return Ok(());
            }
        }
    }

    /// `sem_trywait`: `WouldBlock` when no permit is available.
    pub fn try_wait(&self) -> PthreadResult<()> {
        if self.kernel()?.try_acquire() {
            Ok(())
        } else {
            Err(PthreadError::WouldBlock)
        }
    }

    /// `sem_timedwait` with an absolute realtime deadline. A cancellation
    /// point.
    pub fn timed_wait(&self, deadline: &Timespec) -> PthreadResult<()> {
        let kernel = self.kernel()?;
        if kernel.try_acquire() {
            return Ok(());
        }
        if !deadline.is_valid() {
            return Err(PthreadError::InvalidArgument);
        }
        let waiter = kernel.register();
        loop {
            testcancel();
            let remaining = relative_timeout(self.ctx.clock(), ClockId::Realtime, deadline)?;
            if remaining == Duration::ZERO {
                return Err(PthreadError::TimedOut);
            }
            if waiter.acquire(Some(poll_slice(Some(remaining)))) {
                return Ok(());
            }
        }
    }

    /// `sem_post`. `Overflow` at [`SEM_VALUE_MAX`].
    pub fn post(&self) -> PthreadResult<()> {
        self.kernel()?.release(1)
    }

    /// `sem_getvalue`.
    pub fn value(&self) -> PthreadResult<u32> {
        Ok(self.kernel()?.value())
    }

    /// Name this handle was opened under, without the leading `/`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `sem_destroy`. `Busy` while threads are blocked on it; afterwards
    /// every operation reports `InvalidArgument`.
    pub fn destroy(&mut self) -> PthreadResult<()> {
        let kernel = self.kernel()?;
        if kernel.waiters() > 0 {
            return Err(PthreadError::Busy);
        }
        self.kernel = None;
        Ok(())
    }

    /// `sem_close`. Drops this handle's share of a named semaphore.
    pub fn close(self) -> PthreadResult<()> {
        if self.name.is_none() {
            return Err(PthreadError::InvalidArgument);
        }
        drop(self);
        Ok(())
    }
}

/// `sem_unlink`. Named objects are reference counted and vanish with their
/// last handle, so only the name is validated.
pub fn unlink(name: &str) -> PthreadResult<()> {
    normalize_name(name).map(|_| ())
}

fn normalize_name(name: &str) -> PthreadResult<&str> {
    let key = name.strip_prefix('/').unwrap_or(name);
    if key.is_empty() || key.len() > SEM_NAME_MAX {
        return Err(PthreadError::InvalidArgument);
    }
    Ok(key)
}
