//! # frankenpthread-core
//!
//! Safe Rust implementations of POSIX threading primitives.
//!
//! Every primitive is built from standard atomics plus a small host layer
//! (kernel events, counting semaphores, native threads, thread-local slots)
//! and reports failures as [`PthreadError`]. No `unsafe` code is permitted at
//! the crate level; the few items that need it opt in individually.

#![deny(unsafe_code)]

pub mod atomic;
pub mod config;
pub mod context;
pub mod errno;
pub mod error;
pub mod host;
pub mod lazy;
pub mod pthread;
pub mod sched;
pub mod semaphore;
pub mod structured_log;
pub mod time;

pub use config::{Config, SpinPolicy};
pub use context::Context;
pub use error::{PthreadError, PthreadResult, errno_of};
pub use structured_log::{LogEntry, LogLevel, LogSink};
pub use time::{ClockId, Timespec};
