//! Thread-specific data keys.
//!
//! A thin layer over the host slot table that adds destructors. When a thread
//! created by this library finishes, every non-zero value whose key has a
//! destructor is cleared and handed to it; destructors may store new values,
//! so the sweep repeats up to [`PTHREAD_DESTRUCTOR_ITERATIONS`] times.

use std::sync::Arc;

use parking_lot::{Mutex, const_mutex};

use crate::error::PthreadResult;
use crate::host::slots::{self, SLOT_CAPACITY, Slot};

pub const PTHREAD_KEYS_MAX: usize = SLOT_CAPACITY;
pub const PTHREAD_DESTRUCTOR_ITERATIONS: usize = 4;

/// Destructor invoked with a thread's final non-zero value.
pub type Destructor = Arc<dyn Fn(usize) + Send + Sync>;

static DESTRUCTORS: Mutex<Vec<(Slot, Destructor)>> = const_mutex(Vec::new());

const INDEX_BITS: u32 = 10;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Thread-specific data key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(Slot);

impl Key {
    /// `pthread_key_create`.
    pub fn create(destructor: Option<Destructor>) -> PthreadResult<Self> {
        let slot = slots::alloc()?;
        if let Some(destructor) = destructor {
            DESTRUCTORS.lock().push((slot, destructor));
        }
        Ok(Self(slot))
    }

    /// `pthread_key_delete`. Destructors are not run; values other threads
    /// stored become unreachable.
    pub fn delete(self) -> PthreadResult<()> {
        slots::free(self.0)?;
        DESTRUCTORS.lock().retain(|(slot, _)| *slot != self.0);
        Ok(())
    }

    /// `pthread_getspecific`. Zero when unset.
    pub fn get(self) -> PthreadResult<usize> {
        slots::get(self.0)
    }

    /// `pthread_setspecific`.
    pub fn set(self, value: usize) -> PthreadResult<()> {
        slots::set(self.0, value)
    }

    /// Pack into a `pthread_key_t`: slot index in the low bits, the low bits
    /// of the slot generation above it.
    #[must_use]
    pub fn to_raw(self) -> u32 {
        ((self.0.generation() as u32) << INDEX_BITS) | self.0.index()
    }

    /// Unpack a `pthread_key_t`. Keys whose slot has since been freed or
    /// reused come back stale and fail on use.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        let index = raw & INDEX_MASK;
        let tag = u64::from(raw >> INDEX_BITS);
        let tag_mask = u64::from(u32::MAX >> INDEX_BITS);
        let generation = slots::generation_of(index)
            .filter(|g| g & tag_mask == tag)
            .unwrap_or(0);
        Self(Slot::from_parts(index, generation))
    }
}

/// Run destructors for the calling thread's values.
pub fn run_destructors() {
    for _ in 0..PTHREAD_DESTRUCTOR_ITERATIONS {
        let table: Vec<(Slot, Destructor)> = DESTRUCTORS.lock().clone();
        let mut ran = false;
        for (slot, destructor) in table {
            if let Some(value) = slots::take_nonzero(slot) {
                destructor(value);
                ran = true;
            }
        }
        if !ran {
            break;
        }
    }
}
