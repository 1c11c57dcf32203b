//! Host operating-system objects.
//!
//! The primitives are written against these narrow stand-ins for native
//! kernel services: auto-reset events, bounded counting semaphores, a named
//! object namespace, suspended thread creation, and a thread-local slot table.

pub mod event;
pub mod namespace;
pub mod native;
pub mod semaphore;
pub mod slots;

pub use event::KernelEvent;
pub use native::NativeThread;
pub use semaphore::KernelSemaphore;
