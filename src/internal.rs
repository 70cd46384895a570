//! Owning handles embedded inside graph objects.

use alloc::rc::Rc;
use core::fmt;
use core::marker::PhantomData;

use crate::anchor::{Anchor, AnchorState, Edge};
use crate::header;
use crate::root::Root;

pub(crate) mod sealed {
    use crate::anchor::Edge;

    pub trait Sealed {
        fn edge(&self) -> Option<Edge>;
    }
}

/// Handle kinds an [`Internal`] handle can take its target from.
///
/// Implemented by [`Root`] and [`Internal`]; this trait is sealed.
pub trait Source<T>: sealed::Sealed {}

impl<T> sealed::Sealed for Root<T> {
    fn edge(&self) -> Option<Edge> {
        Root::edge(self)
    }
}

impl<T> Source<T> for Root<T> {}

impl<T> sealed::Sealed for Internal<T> {
    fn edge(&self) -> Option<Edge> {
        Internal::edge(self)
    }
}

impl<T> Source<T> for Internal<T> {}

/// An owning handle embedded inside an object that itself lives in the graph.
///
/// Every internal handle is bound at construction to the [`Anchor`] of the
/// object embedding it; that binding is what lets the engine treat the edge
/// as parent-held rather than external. Internal handles do not keep their
/// target alive on their own: an object is destroyed as soon as no [`Root`]
/// reaches it through any chain of internal handles, even if that chain forms
/// a cycle.
///
/// Handles are movable (the registration is slot-based, not address-based)
/// but not cloneable, because a copy without an explicit parent would have no
/// place in the graph. Use [`adopt`] to copy a target into another parent.
///
/// Once collection has begun for the target, [`get`] reads `None`. Payload
/// destructors always observe their outgoing internal handles as empty.
///
/// [`adopt`]: Internal::adopt
/// [`get`]: Internal::get
pub struct Internal<T> {
    parent: Rc<AnchorState>,
    slot: u32,
    _marker: PhantomData<T>,
}

impl<T> Internal<T> {
    /// Creates an empty handle registered to `parent`.
    #[must_use]
    pub fn new(parent: &Anchor) -> Self {
        let parent = parent.state();
        let slot = parent.register(None);
        Self {
            parent,
            slot,
            _marker: PhantomData,
        }
    }

    /// Creates a handle registered to `parent` that shares `source`'s target.
    /// The source may belong to a different parent, or be a root.
    #[must_use]
    pub fn adopt(parent: &Anchor, source: &impl Source<T>) -> Self {
        let edge = sealed::Sealed::edge(source);
        let parent = parent.state();
        let slot = parent.register(edge);
        if let Some(edge) = edge {
            header::reachable_from(edge.header, &parent);
        }
        Self {
            parent,
            slot,
            _marker: PhantomData,
        }
    }

    /// Retargets this handle at `source`'s target.
    ///
    /// The new edge is established before the old edge is dropped, so a
    /// transient count underflow can never collect a structure that is being
    /// re-linked to itself.
    pub fn set(&self, source: &impl Source<T>) {
        self.assign(sealed::Sealed::edge(source));
    }

    /// Clears this handle, dropping its edge.
    pub fn reset(&self) {
        self.assign(None);
    }

    fn assign(&self, new: Option<Edge>) {
        let old = self.parent.edge(self.slot);
        if new == old {
            return;
        }
        if let Some(edge) = new {
            header::reachable_from(edge.header, &self.parent);
        }
        self.parent.replace(self.slot, new);
        if let Some(edge) = old {
            header::not_reachable_from(edge.header, &self.parent);
        }
    }

    /// Exchanges the targets of two handles, which may belong to different
    /// parents. Each target is kept alive by a temporary root while the edges
    /// move, so the exchange can never trigger a collection of either side.
    pub fn swap(&self, other: &Self) {
        if core::ptr::eq(self, other) {
            return;
        }
        let mine = Root::from_internal(self);
        let theirs = Root::from_internal(other);
        self.set(&theirs);
        other.set(&mine);
    }

    /// Returns the target payload, or `None` when the handle is empty or its
    /// target is already unreachable.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        let edge = self.edge()?;
        if header::is_unreachable(edge.header) {
            return None;
        }
        Some(unsafe { &*edge.ptr.cast::<T>().as_ptr() })
    }

    /// Number of owning handles on the target, zero when empty or once
    /// collection of the target has begun.
    #[must_use]
    pub fn use_count(&self) -> u32 {
        self.edge().map_or(0, |edge| header::use_count(edge.header))
    }

    /// True when this handle is the only owning handle on its target.
    #[must_use]
    pub fn unique(&self) -> bool {
        self.use_count() == 1
    }

    /// True when [`get`] would return `None`.
    ///
    /// [`get`]: Internal::get
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.get().is_none()
    }

    pub(crate) fn edge(&self) -> Option<Edge> {
        self.parent.edge(self.slot)
    }
}

impl<T> Drop for Internal<T> {
    /// Deregisters from the parent and drops the edge, which may trigger
    /// collection of the former target.
    fn drop(&mut self) {
        if let Some(edge) = self.parent.deregister(self.slot) {
            header::not_reachable_from(edge.header, &self.parent);
        }
    }
}

impl<T> fmt::Debug for Internal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.edge().map(|edge| edge.ptr);
        f.debug_struct("Internal").field("target", &target).finish()
    }
}
