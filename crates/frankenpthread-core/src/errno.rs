//! Error number definitions.
//!
//! Linux errno values for every failure classification the threading
//! primitives can report. The ABI crate hands these back verbatim.

pub const EPERM: i32 = 1;
pub const ENOENT: i32 = 2;
pub const ESRCH: i32 = 3;
pub const EINTR: i32 = 4;
pub const EAGAIN: i32 = 11;
pub const ENOMEM: i32 = 12;
pub const EBUSY: i32 = 16;
pub const EEXIST: i32 = 17;
pub const EINVAL: i32 = 22;
pub const ENOSPC: i32 = 28;
pub const EDEADLK: i32 = 35;
pub const ENOSYS: i32 = 38;
pub const EOVERFLOW: i32 = 75;
pub const ENOTSUP: i32 = 95;
pub const ETIMEDOUT: i32 = 110;

/// Human-readable name for a known errno value.
#[must_use]
pub const fn errno_name(errno: i32) -> &'static str {
    match errno {
        0 => "OK",
        EPERM => "EPERM",
        ENOENT => "ENOENT",
        ESRCH => "ESRCH",
        EINTR => "EINTR",
        EAGAIN => "EAGAIN",
        ENOMEM => "ENOMEM",
        EBUSY => "EBUSY",
        EEXIST => "EEXIST",
        EINVAL => "EINVAL",
        ENOSPC => "ENOSPC",
        EDEADLK => "EDEADLK",
        ENOSYS => "ENOSYS",
        EOVERFLOW => "EOVERFLOW",
        ENOTSUP => "ENOTSUP",
        ETIMEDOUT => "ETIMEDOUT",
        _ => "UNKNOWN",
    }
}
