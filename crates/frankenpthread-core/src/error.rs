//! Failure classification shared by every primitive.

use crate::errno;

/// Error returned by threading primitives.
///
/// Each variant maps onto exactly one errno value through [`PthreadError::errno`].
/// `WouldBlock` and `ResourceExhausted` both surface as `EAGAIN` at the C
/// boundary but stay distinct here so callers can pick a retry strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum PthreadError {
    /// Bad parameter or operation on an object in the wrong state.
    #[error("invalid argument")]
    InvalidArgument,
    /// Non-blocking acquisition found the primitive held.
    #[error("resource busy")]
    Busy,
    /// Non-blocking wait found nothing to consume.
    #[error("operation would block")]
    WouldBlock,
    /// Deadline elapsed before the wait was satisfied.
    #[error("timed out")]
    TimedOut,
    /// Operation would deadlock the caller (self-join).
    #[error("resource deadlock would occur")]
    Deadlock,
    /// Handle does not name a thread this library ever created.
    #[error("no such thread")]
    NoSuchThread,
    /// Named object does not exist.
    #[error("no such entry")]
    NotFound,
    /// Exclusive creation of a named object that already exists.
    #[error("already exists")]
    AlreadyExists,
    /// Allocation failed during construction.
    #[error("out of memory")]
    OutOfMemory,
    /// Host refused to create a thread or slot.
    #[error("insufficient resources")]
    ResourceExhausted,
    /// Host refused to create a kernel object.
    #[error("no space left for kernel object")]
    NoSpace,
    /// Counter would exceed its maximum.
    #[error("value overflow")]
    Overflow,
    /// Feature is deliberately not implemented.
    #[error("operation not supported")]
    Unsupported,
    /// Caller lacks the right to perform the operation.
    #[error("operation not permitted")]
    PermissionDenied,
}

impl PthreadError {
    /// errno value reported at the C boundary.
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument => errno::EINVAL,
            Self::Busy => errno::EBUSY,
            Self::WouldBlock | Self::ResourceExhausted => errno::EAGAIN,
            Self::TimedOut => errno::ETIMEDOUT,
            Self::Deadlock => errno::EDEADLK,
            Self::NoSuchThread => errno::ESRCH,
            Self::NotFound => errno::ENOENT,
            Self::AlreadyExists => errno::EEXIST,
            Self::OutOfMemory => errno::ENOMEM,
            Self::NoSpace => errno::ENOSPC,
            Self::Overflow => errno::EOVERFLOW,
            Self::Unsupported => errno::ENOTSUP,
            Self::PermissionDenied => errno::EPERM,
        }
    }

    /// True for the outcomes a caller may simply retry later.
    #[must_use]
    pub const fn is_contention(self) -> bool {
        matches!(self, Self::Busy | Self::WouldBlock | Self::TimedOut)
    }
}

/// Result alias used throughout the crate.
pub type PthreadResult<T> = Result<T, PthreadError>;

/// Collapse a result into the errno-style integer POSIX callers expect.
#[must_use]
pub fn errno_of<T>(result: &PthreadResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.errno(),
    }
}
