//! # frankenpthread-abi
//!
//! POSIX-shaped `extern "C-unwind"` entry points over `frankenpthread-core`.
//!
//! Each module covers one header family. `pthread_*` functions return 0 or
//! an errno value; `sem_*`, `clock_*`, `nanosleep` and `sched_*` return -1 and
//! set the thread-local errno. With the `interpose` feature the symbols are
//! exported unmangled so the cdylib can stand in for the host library.

#![allow(clippy::missing_safety_doc)]
#![allow(non_camel_case_types)]

#[macro_use]
mod macros;

pub mod errno_abi;
pub mod pthread_abi;
pub mod sched_abi;
pub mod sem_abi;
pub mod sync_abi;
pub mod time_abi;
pub mod types;

mod util;
