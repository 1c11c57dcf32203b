//! Thread-local slot table.
//!
//! A fixed array of slots, each with a generation counter: odd while
//! allocated, even while free. A [`Slot`] remembers the generation it was
//! allocated in, so a handle to a freed (or freed and reallocated) slot is
//! detected as stale instead of aliasing the new owner's values.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::{PthreadError, PthreadResult};

/// Number of slots per process.
pub const SLOT_CAPACITY: usize = 1024;

static GENERATIONS: [AtomicU64; SLOT_CAPACITY] = [const { AtomicU64::new(0) }; SLOT_CAPACITY];

thread_local! {
    static VALUES: RefCell<Vec<(u64, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Allocated slot handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    index: u32,
    generation: u64,
}

impl Slot {
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }

    /// Rebuild a handle from its parts (ABI round trip). Validity is checked
    /// on use.
    #[must_use]
    pub const fn from_parts(index: u32, generation: u64) -> Self {
        Self { index, generation }
    }
}

/// Claim a free slot.
pub fn alloc() -> PthreadResult<Slot> {
    for (index, cell) in GENERATIONS.iter().enumerate() {
        let current = cell.load(Ordering::Acquire);
        if current % 2 == 1 {
            continue;
        }
        if cell
            .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            return Ok(Slot {
                index: index as u32,
                generation: current + 1,
            });
        }
    }
    Err(PthreadError::ResourceExhausted)
}

/// Release `slot`. Values other threads stored become unreachable.
pub fn free(slot: Slot) -> PthreadResult<()> {
    let cell = cell(slot)?;
    cell.compare_exchange(
        slot.generation,
        slot.generation + 1,
        Ordering::AcqRel,
        Ordering::Relaxed,
    )
    .map(|_| ())
    .map_err(|_| PthreadError::InvalidArgument)
}

/// True while `slot` is allocated in its generation.
#[must_use]
pub fn is_live(slot: Slot) -> bool {
    cell(slot).is_ok_and(|c| c.load(Ordering::Acquire) == slot.generation)
}

/// Calling thread's value for `slot`; 0 when never set.
pub fn get(slot: Slot) -> PthreadResult<usize> {
    if !is_live(slot) {
        return Err(PthreadError::InvalidArgument);
    }
    Ok(VALUES.with(|values| {
        values
            .borrow()
            .get(slot.index as usize)
            .filter(|(generation, _)| *generation == slot.generation)
            .map_or(0, |(_, value)| *value)
    }))
}

/// Store the calling thread's value for `slot`.
pub fn set(slot: Slot, value: usize) -> PthreadResult<()> {
    if !is_live(slot) {
        return Err(PthreadError::InvalidArgument);
    }
    VALUES.with(|values| {
        let mut values = values.borrow_mut();
        let index = slot.index as usize;
        if values.len() <= index {
            values.resize(index + 1, (0, 0));
        }
        values[index] = (slot.generation, value);
    });
    Ok(())
}

/// Clear and return the calling thread's value for `slot` if it is non-zero.
#[must_use]
pub fn take_nonzero(slot: Slot) -> Option<usize> {
    if !is_live(slot) {
        return None;
    }
    VALUES
        .try_with(|values| {
            let mut values = values.borrow_mut();
            let entry = values.get_mut(slot.index as usize)?;
            if entry.0 != slot.generation || entry.1 == 0 {
                return None;
            }
            Some(core::mem::replace(&mut entry.1, 0))
        })
        .ok()
        .flatten()
}

/// Current generation of slot `index`, if the index exists.
#[must_use]
pub fn generation_of(index: u32) -> Option<u64> {
    GENERATIONS
        .get(index as usize)
        .map(|c| c.load(Ordering::Acquire))
}

fn cell(slot: Slot) -> PthreadResult<&'static AtomicU64> {
    if slot.generation % 2 == 0 {
        return Err(PthreadError::InvalidArgument);
    }
    GENERATIONS
        .get(slot.index as usize)
        .ok_or(PthreadError::InvalidArgument)
}
