//! Fixed-capacity session-key table.
//!
//! Slots are claimed first-fit in ascending index order, so handle reuse is
//! deterministic. Each slot carries a generation counter that is bumped on
//! release; a [`SessionKeyHandle`] only validates against the generation it
//! was issued with, so a handle kept past its deletion stays dead even after
//! the index is reassigned.

use zeroize::Zeroize;

use crate::crypto::SESSION_KEY_MAX_SIZE;
use crate::error::SessionKeyError;

/// Default number of slots in a session-key table.
pub const MAX_SESSION_KEY_HANDLES: usize = 64;

/// A live entry in the session-key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKeyHandle {
    index: u32,
    generation: u32,
}

impl SessionKeyHandle {
    /// The slot index, as reported across the trust boundary.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The slot generation this handle was issued for.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Default)]
struct Slot {
    data: [u8; SESSION_KEY_MAX_SIZE],
    initialized: bool,
    generation: u32,
}

pub(crate) struct HandleTable<const N: usize> {
    slots: [Slot; N],
}

impl<const N: usize> HandleTable<N> {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::default()),
        }
    }

    pub(crate) const fn capacity(&self) -> usize {
        N
    }

    /// Number of initialized slots.
    pub(crate) fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.initialized).count()
    }

    /// First free slot, scanning from index 0.
    pub(crate) fn allocate(&self) -> Option<usize> {
        self.slots.iter().position(|slot| !slot.initialized)
    }

    /// Fill the free slot at `index` with `derive` and mark it initialized.
    ///
    /// If `derive` fails the slot is wiped and stays free.
    pub(crate) fn initialize<F>(
        &mut self,
        index: usize,
        derive: F,
    ) -> Result<SessionKeyHandle, SessionKeyError>
    where
        F: FnOnce(&mut [u8; SESSION_KEY_MAX_SIZE]) -> Result<(), SessionKeyError>,
    {
        let slot = self.slots.get_mut(index).ok_or(SessionKeyError::BadParameters)?;
        if slot.initialized {
            return Err(SessionKeyError::BadState);
        }

        if let Err(e) = derive(&mut slot.data) {
            slot.data.zeroize();
            return Err(e);
        }

        slot.initialized = true;
        Ok(SessionKeyHandle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// True iff `handle` names an initialized slot of the same generation.
    pub(crate) fn is_valid(&self, handle: SessionKeyHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .map_or(false, |slot| slot.initialized && slot.generation == handle.generation)
    }

    /// Resolve a raw boundary index to the live handle occupying it.
    pub(crate) fn resolve(&self, raw: i32) -> Option<SessionKeyHandle> {
        let index = usize::try_from(raw).ok()?;
        let slot = self.slots.get(index)?;
        slot.initialized.then(|| SessionKeyHandle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Borrow the key bytes of a live handle.
    pub(crate) fn key(&self, handle: SessionKeyHandle) -> Option<&[u8; SESSION_KEY_MAX_SIZE]> {
        if self.is_valid(handle) {
            Some(&self.slots[handle.index as usize].data)
        } else {
            None
        }
    }

    /// Zero the slot and return it to the free pool.
    pub(crate) fn release(&mut self, handle: SessionKeyHandle) -> Result<(), SessionKeyError> {
        if !self.is_valid(handle) {
            return Err(SessionKeyError::NotFound);
        }
        let slot = &mut self.slots[handle.index as usize];
        slot.data.zeroize();
        slot.initialized = false;
        slot.generation = slot.generation.wrapping_add(1);
        Ok(())
    }
}

impl<const N: usize> Drop for HandleTable<N> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.data.zeroize();
        }
    }
}
