//! Header blocks and their reference counts.
//!
//! A header records two counts. `owner_count` is the number of root handles
//! bound to the object. `internal_count` is the number of handles of any
//! owning kind, roots included. The difference between `internal_count` and
//! the back-pointer total is the number of referrers that are not owned
//! participants: root handles, plus internal handles held by objects that
//! were never bound to a root. A header with such referrers is externally
//! owned and is never a collection candidate.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::alloc::Layout;
use core::ptr::{self, NonNull};

use crate::anchor::{Anchor, AnchorState, Participant};
use crate::arena::{self, Arena, HeaderId};
use crate::set::RefSet;
use crate::sweep::{self, Decision};

/// Type-erased release action stored by roots adopted with a custom release.
pub(crate) type ReleaseFn = Box<dyn FnOnce(NonNull<()>)>;

/// Monomorphized hooks for a payload type, replacing virtual dispatch with a
/// per-header function-pointer set.
pub(crate) struct PayloadVtable {
    /// Runs the payload destructor: drops the owning box for separate blocks,
    /// drops in place for combined blocks.
    pub destroy: unsafe fn(NonNull<()>),
    /// Returns the participant state of the payload, if it has one.
    pub anchor: unsafe fn(NonNull<()>) -> Option<Rc<AnchorState>>,
    /// Releases combined-block payload storage once the header is freed. The
    /// destructor has already run by then.
    pub free_storage: unsafe fn(NonNull<()>),
}

/// Vtable for payloads allocated by [`make_root`]: the destructor runs in
/// place and the storage is reclaimed separately, when the header is freed.
///
/// [`make_root`]: crate::make_root
pub(crate) fn combined_vtable<T: Participant>() -> &'static PayloadVtable {
    const {
        &PayloadVtable {
            destroy: destroy_in_place::<T>,
            anchor: anchor_of::<T>,
            free_storage: free_block::<T>,
        }
    }
}

/// Vtable for payloads adopted from a box or raw pointer: the default release
/// action drops the box, destroying the payload and its storage together.
pub(crate) fn separate_vtable<T: Participant>() -> &'static PayloadVtable {
    const {
        &PayloadVtable {
            destroy: drop_box::<T>,
            anchor: anchor_of::<T>,
            free_storage: free_noop,
        }
    }
}

unsafe fn destroy_in_place<T>(payload: NonNull<()>) {
    ptr::drop_in_place(payload.cast::<T>().as_ptr());
}

unsafe fn drop_box<T>(payload: NonNull<()>) {
    drop(Box::from_raw(payload.cast::<T>().as_ptr()));
}

unsafe fn anchor_of<T: Participant>(payload: NonNull<()>) -> Option<Rc<AnchorState>> {
    payload.cast::<T>().as_ref().anchor().map(Anchor::state)
}

unsafe fn free_block<T>(payload: NonNull<()>) {
    let layout = Layout::new::<T>();
    if layout.size() != 0 {
        alloc::alloc::dealloc(payload.cast().as_ptr(), layout);
    }
}

unsafe fn free_noop(_payload: NonNull<()>) {}

pub(crate) struct Header {
    pub owner_count: u32,
    pub internal_count: u32,
    pub back_pointers: RefSet,
    /// Sticky: collection has begun for this block.
    pub unreachable: bool,
    /// Sticky: the payload destructor has run.
    pub deleted: bool,
    pub payload: NonNull<()>,
    pub vtable: &'static PayloadVtable,
    pub release: Option<ReleaseFn>,
    /// Participant state of the payload, cached when the owner is bound.
    pub participant: Option<Rc<AnchorState>>,
}

impl Header {
    /// A header is born with one root handle bound, so both counts start at
    /// one.
    pub fn new(
        payload: NonNull<()>,
        vtable: &'static PayloadVtable,
        release: Option<ReleaseFn>,
    ) -> Self {
        Self {
            owner_count: 1,
            internal_count: 1,
            back_pointers: RefSet::new(),
            unreachable: false,
            deleted: false,
            payload,
            vtable,
            release,
            participant: None,
        }
    }

    /// A header is owned while any referrer is not an owned participant:
    /// either a root handle exists, or the internal count exceeds what the
    /// back-pointer graph accounts for.
    pub fn is_owned(&self) -> bool {
        self.owner_count > 0 || self.internal_count > self.back_pointers.total()
    }
}

/// Decrement the internal count under the arena borrow and report what must
/// happen next. The caller runs the decision after releasing the borrow,
/// because collection executes payload destructors.
pub(crate) fn dec_internal_count(arena: &mut Arena, id: HeaderId) -> Decision {
    let Some(header) = arena.get(id) else {
        return Decision::Nothing;
    };
    debug_assert!(header.internal_count > 0);
    header.internal_count -= 1;
    if header.internal_count == 0 {
        Decision::FreeSelf
    } else if !header.unreachable && header.owner_count == 0 {
        Decision::CheckReachable
    } else {
        Decision::Nothing
    }
}

/// Root copy.
pub(crate) fn add_owner(id: HeaderId) {
    arena::with(|arena| {
        if let Some(header) = arena.get(id) {
            header.owner_count += 1;
            header.internal_count += 1;
        }
    });
}

/// Root destruction or reset.
pub(crate) fn remove_owner(id: HeaderId) {
    let decision = arena::try_with(|arena| {
        let Some(header) = arena.get(id) else {
            return Decision::Nothing;
        };
        debug_assert!(header.owner_count > 0);
        header.owner_count -= 1;
        dec_internal_count(arena, id)
    });
    if let Some(decision) = decision {
        sweep::run(id, decision);
    }
}

/// Promotion of an internal handle to a root. Fails once collection has begun
/// for the target.
pub(crate) fn owner_from_internal(id: HeaderId) -> bool {
    arena::with(|arena| match arena.get(id) {
        Some(header) if !header.unreachable => {
            header.owner_count += 1;
            header.internal_count += 1;
            true
        }
        _ => false,
    })
}

/// A new internal handle held by `parent` now points at `id`. The edge is
/// recorded in the back-pointer graph only when the parent is itself owned;
/// edges from never-owned participants surface as the `is_owned` inequality
/// instead.
pub(crate) fn reachable_from(id: HeaderId, parent: &AnchorState) {
    let parent_header = parent.self_header();
    arena::with(|arena| {
        if let Some(header) = arena.get(id) {
            header.internal_count += 1;
            if let Some(parent_header) = parent_header {
                header.back_pointers.insert(parent_header);
            }
        }
    });
}

/// An internal handle held by `parent` no longer points at `id`. Dropping the
/// edge may leave the target unowned, which triggers a reachability check.
pub(crate) fn not_reachable_from(id: HeaderId, parent: &AnchorState) {
    let parent_header = parent.self_header();
    let decision = arena::try_with(|arena| {
        let Some(header) = arena.get(id) else {
            return Decision::Nothing;
        };
        if let Some(parent_header) = parent_header {
            header.back_pointers.remove(parent_header);
        }
        dec_internal_count(arena, id)
    });
    if let Some(decision) = decision {
        sweep::run(id, decision);
    }
}

/// Bind the first root handle to a freshly created header.
///
/// If the payload participates, the header installs itself as the payload's
/// owner and registers a back-pointer in the target of every outgoing handle
/// the payload created before it was owned. Handles may legitimately predate
/// ownership: a constructor can wire edges before its result is handed to
/// [`make_root`].
///
/// [`make_root`]: crate::make_root
pub(crate) fn set_owner(id: HeaderId, payload: NonNull<()>, vtable: &'static PayloadVtable) {
    // The participant hook reads the payload, so it must run outside the
    // arena borrow.
    let participant = unsafe { (vtable.anchor)(payload) };
    let Some(state) = participant else {
        return;
    };
    state.bind(id);
    let edges = state.live_edges();
    arena::with(|arena| {
        if let Some(header) = arena.get(id) {
            header.participant = Some(Rc::clone(&state));
        }
        for edge in edges {
            if let Some(target) = arena.get(edge.header) {
                target.back_pointers.insert(id);
            }
        }
    });
}

/// User-visible count: zero once collection has begun, the internal count
/// otherwise.
pub(crate) fn use_count(id: HeaderId) -> u32 {
    arena::with(|arena| match arena.get(id) {
        Some(header) if !header.unreachable => header.internal_count,
        _ => 0,
    })
}

pub(crate) fn is_unreachable(id: HeaderId) -> bool {
    arena::with(|arena| arena.get(id).map_or(true, |header| header.unreachable))
}

#[cfg(test)]
pub(crate) fn test_vtable() -> &'static PayloadVtable {
    const {
        &PayloadVtable {
            destroy: free_noop,
            anchor: no_anchor,
            free_storage: free_noop,
        }
    }
}

#[cfg(test)]
unsafe fn no_anchor(_payload: NonNull<()>) -> Option<Rc<AnchorState>> {
    None
}
