//! Race-safe lazy construction of statically-declared primitives.
//!
//! A [`LazyBox`] starts as a null pointer, which is also the all-zero bit
//! pattern, so a zeroed C object is a valid "unconstructed" primitive. The
//! first operation allocates the backing object and publishes it with a single
//! compare-and-swap; a thread that loses the race frees its own allocation and
//! adopts the winner's.

use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};
use std::alloc::{Layout, alloc};

use crate::error::{PthreadError, PthreadResult};

/// How a [`LazyBox::get_or_try_init`] call obtained its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Install {
    /// The object was already constructed.
    Existing,
    /// This call constructed and published the object.
    Won,
    /// Another thread published first; this call's allocation was discarded.
    Lost,
}

/// Heap object constructed on first use.
pub struct LazyBox<T> {
    ptr: AtomicPtr<T>,
    _owns: PhantomData<Box<T>>,
}

// SAFETY: the pointee is only ever shared as `&T`, and ownership moves only
// through `&mut self` (`take`, `Drop`). Sharing across threads is therefore
// exactly as safe as sharing `&T`.
#[allow(unsafe_code)]
unsafe impl<T: Send + Sync> Sync for LazyBox<T> {}
#[allow(unsafe_code)]
unsafe impl<T: Send> Send for LazyBox<T> {}

impl<T> LazyBox<T> {
    /// Unconstructed state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
            _owns: PhantomData,
        }
    }

    /// Already-constructed state.
    #[must_use]
    pub fn from_box(value: Box<T>) -> Self {
        Self {
            ptr: AtomicPtr::new(Box::into_raw(value)),
            _owns: PhantomData,
        }
    }

    /// The constructed object, if any.
    #[allow(unsafe_code)]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        let raw = self.ptr.load(Ordering::Acquire);
        // SAFETY: a non-null pointer was published by `Box::into_raw` and is
        // only freed through `&mut self`, which cannot coexist with `&self`.
        unsafe { raw.as_ref() }
    }

    /// True once an object has been published.
    #[must_use]
    pub fn is_constructed(&self) -> bool {
        !self.ptr.load(Ordering::Acquire).is_null()
    }

    /// Return the object, constructing it with `init` on first use.
    #[allow(unsafe_code)]
    pub fn get_or_try_init(
        &self,
        init: impl FnOnce() -> PthreadResult<T>,
    ) -> PthreadResult<(&T, Install)> {
        if let Some(existing) = self.get() {
            return Ok((existing, Install::Existing));
        }
        let fresh = Box::into_raw(try_box(init()?)?);
        match self.ptr.compare_exchange(
            ptr::null_mut(),
            fresh,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            // SAFETY: `fresh` is now owned by `self.ptr`; see `get`.
            Ok(_) => Ok((unsafe { &*fresh }, Install::Won)),
            Err(winner) => {
                // SAFETY: `fresh` came from `Box::into_raw` above and was never
                // published, so this thread still owns it exclusively.
                drop(unsafe { Box::from_raw(fresh) });
                // SAFETY: `winner` is the non-null published pointer.
                Ok((unsafe { &*winner }, Install::Lost))
            }
        }
    }

    /// Take ownership of the object, returning to the unconstructed state.
    #[allow(unsafe_code)]
    pub fn take(&mut self) -> Option<Box<T>> {
        let raw = core::mem::replace(self.ptr.get_mut(), ptr::null_mut());
        if raw.is_null() {
            None
        } else {
            // SAFETY: exclusive access; the pointer came from `Box::into_raw`.
            Some(unsafe { Box::from_raw(raw) })
        }
    }
}

impl<T> Default for LazyBox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LazyBox<T> {
    fn drop(&mut self) {
        drop(self.take());
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for LazyBox<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("LazyBox").field(value).finish(),
            None => f.write_str("LazyBox(<unconstructed>)"),
        }
    }
}

/// Box `value`, reporting allocator failure instead of aborting.
#[allow(unsafe_code)]
pub fn try_box<T>(value: T) -> PthreadResult<Box<T>> {
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return Ok(Box::new(value));
    }
    // SAFETY: `layout` has non-zero size.
    let raw = unsafe { alloc(layout) }.cast::<T>();
    if raw.is_null() {
        return Err(PthreadError::OutOfMemory);
    }
    // SAFETY: `raw` is a fresh, properly aligned allocation for one `T`, and
    // the global allocator's layout matches what `Box` will free with.
    unsafe {
        raw.write(value);
        Ok(Box::from_raw(raw))
    }
}
