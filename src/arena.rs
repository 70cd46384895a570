//! Thread-local arena of header blocks.
//!
//! Every live object is paired with a [`Header`] stored in a slot arena local
//! to the current thread. Handles and back-pointer entries address headers by
//! [`HeaderId`], an index plus a generation tag. Freeing a slot bumps its
//! generation, so a stale id fails lookup instead of reading a recycled
//! header.
//!
//! [`Header`]: crate::header::Header

use core::cell::RefCell;
use core::fmt;
use core::num::NonZeroU32;

use crate::header::Header;

/// Arena address of a header block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct HeaderId {
    index: u32,
    generation: NonZeroU32,
}

impl fmt::Debug for HeaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hdr({}v{})", self.index, self.generation)
    }
}

impl HeaderId {
    #[cfg(test)]
    pub(crate) fn synthetic(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation: NonZeroU32::new(generation).unwrap(),
        }
    }
}

struct Slot {
    generation: NonZeroU32,
    header: Option<Header>,
}

pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Arena {
    const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn insert(&mut self, header: Header) -> HeaderId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.header.is_none());
            slot.header = Some(header);
            HeaderId {
                index,
                generation: slot.generation,
            }
        } else {
            let generation = NonZeroU32::MIN;
            let index = u32::try_from(self.slots.len()).expect("header arena exhausted");
            self.slots.push(Slot {
                generation,
                header: Some(header),
            });
            HeaderId { index, generation }
        }
    }

    pub fn get(&mut self, id: HeaderId) -> Option<&mut Header> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.header.as_mut()
    }

    /// Free the slot and hand the header back so the caller can release
    /// payload storage. The generation bump invalidates every outstanding id
    /// for this slot.
    pub fn remove(&mut self, id: HeaderId) -> Option<Header> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let header = slot.header.take()?;
        slot.generation = slot
            .generation
            .checked_add(1)
            .unwrap_or(NonZeroU32::MIN);
        self.free.push(id.index);
        Some(header)
    }

    #[cfg(test)]
    pub fn live_ids(&self) -> Vec<HeaderId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.header.is_some())
            .map(|(index, slot)| HeaderId {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }
}

thread_local! {
    static ARENA: RefCell<Arena> = const { RefCell::new(Arena::new()) };
}

/// Run `f` with the arena borrowed. Callers must not re-enter the arena from
/// within `f`; in particular no user code (payload constructors, destructors,
/// release actions) may run under the borrow.
pub(crate) fn with<R>(f: impl FnOnce(&mut Arena) -> R) -> R {
    ARENA.with(|arena| f(&mut arena.borrow_mut()))
}

/// Arena access from handle `Drop` impls. During thread teardown the arena
/// may already be gone; handles then skip their bookkeeping instead of
/// aborting the unwind.
pub(crate) fn try_with<R>(f: impl FnOnce(&mut Arena) -> R) -> Option<R> {
    ARENA.try_with(|arena| f(&mut arena.borrow_mut())).ok()
}
