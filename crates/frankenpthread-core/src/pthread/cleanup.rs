//! Per-thread cleanup handler stack.

use super::thread::current_or_adopt;

/// A registered cleanup handler.
pub type CleanupHandler = Box<dyn FnOnce() + Send>;

/// LIFO list of handlers owned by one thread's control block.
#[derive(Default)]
pub struct CleanupStack {
    handlers: Vec<CleanupHandler>,
}

impl core::fmt::Debug for CleanupStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CleanupStack")
            .field("depth", &self.handlers.len())
            .finish()
    }
}

impl CleanupStack {
    pub fn push(&mut self, handler: CleanupHandler) {
        self.handlers.push(handler);
    }

    pub fn pop(&mut self) -> Option<CleanupHandler> {
        self.handlers.pop()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// `pthread_cleanup_push` on the calling thread.
pub fn cleanup_push(handler: impl FnOnce() + Send + 'static) {
    current_or_adopt().cleanup().lock().push(Box::new(handler));
}

/// `pthread_cleanup_pop`: remove the most recent handler, running it when
/// `execute` is set. No-op on an empty stack.
pub fn cleanup_pop(execute: bool) {
    let handler = current_or_adopt().cleanup().lock().pop();
    if let Some(handler) = handler {
        if execute {
            handler();
        }
    }
}

/// Handlers registered on the calling thread.
#[must_use]
pub fn cleanup_depth() -> usize {
    current_or_adopt().cleanup().lock().len()
}
