//! Participant registration for objects that hold internal handles.

use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::ptr::NonNull;

use crate::arena::HeaderId;

/// An outgoing edge held by an internal handle: the target's header address
/// and the payload pointer the handle exposes. The pointer is carried
/// separately so aliasing roots propagate their substituted payload view.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Edge {
    pub header: HeaderId,
    pub ptr: NonNull<()>,
}

/// Marker trait for payload types managed by [`Root`] handles.
///
/// Types whose values embed [`Internal`] handles own an [`Anchor`] and return
/// it from [`anchor`]; plain data types take the default implementation:
///
/// ```
/// use rhizome::{Anchor, Internal, Participant};
///
/// struct Leaf(u32);
///
/// impl Participant for Leaf {}
///
/// struct Node {
///     anchor: Anchor,
///     next: Internal<Node>,
/// }
///
/// impl Participant for Node {
///     fn anchor(&self) -> Option<&Anchor> {
///         Some(&self.anchor)
///     }
/// }
/// ```
///
/// # Contract
///
/// `anchor` must return the `Anchor` embedded in `self` (the same one its
/// `Internal` handles were constructed against), or `None`. Returning a
/// foreign anchor corrupts the reachability bookkeeping: objects may be
/// reclaimed late (a leak) or early, in which case every access through the
/// surviving handles reads as empty.
///
/// [`Root`]: crate::Root
/// [`Internal`]: crate::Internal
/// [`anchor`]: Participant::anchor
pub trait Participant {
    /// Returns the anchor embedded in this value, if it holds internal
    /// handles.
    fn anchor(&self) -> Option<&Anchor> {
        None
    }
}

/// Registration base embedded in every participant payload.
///
/// The anchor records which header owns the payload (set when the first root
/// handle is bound) and the table of outgoing internal-handle edges. Handles
/// address their entry by slot index, so payloads stay movable: moving a
/// value into [`make_root`] moves its anchor and handles together without
/// invalidating any registration.
///
/// [`make_root`]: crate::make_root
#[derive(Default)]
pub struct Anchor {
    state: Rc<AnchorState>,
}

impl Anchor {
    /// Creates an anchor with no owner and no registered handles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> Rc<AnchorState> {
        Rc::clone(&self.state)
    }
}

impl fmt::Debug for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anchor")
            .field("owner", &self.state.self_header.get())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub(crate) struct AnchorState {
    self_header: Cell<Option<HeaderId>>,
    outgoing: RefCell<EdgeTable>,
}

impl AnchorState {
    pub fn self_header(&self) -> Option<HeaderId> {
        self.self_header.get()
    }

    /// Install the owning header. Called once, when the first root handle is
    /// bound to the payload.
    pub fn bind(&self, header: HeaderId) {
        debug_assert!(self.self_header.get().is_none());
        self.self_header.set(Some(header));
    }

    pub fn register(&self, edge: Option<Edge>) -> u32 {
        self.outgoing.borrow_mut().register(edge)
    }

    pub fn deregister(&self, slot: u32) -> Option<Edge> {
        self.outgoing.borrow_mut().deregister(slot)
    }

    pub fn edge(&self, slot: u32) -> Option<Edge> {
        self.outgoing.borrow().edge(slot)
    }

    pub fn replace(&self, slot: u32, edge: Option<Edge>) -> Option<Edge> {
        self.outgoing.borrow_mut().replace(slot, edge)
    }

    /// Snapshot of the live outgoing edges, used by owner binding and by the
    /// child walk during collection.
    pub fn live_edges(&self) -> Vec<Edge> {
        self.outgoing.borrow().live_edges()
    }

    /// Null out every outgoing edge, yielding each severed edge to `f`. After
    /// this, all internal handles registered here read as empty, which is
    /// what their payload's destructor will observe.
    pub fn sever_all(&self, mut f: impl FnMut(Edge)) {
        let mut table = self.outgoing.borrow_mut();
        for slot in &mut table.slots {
            if let EdgeSlot::Live(edge) = slot {
                if let Some(edge) = edge.take() {
                    f(edge);
                }
            }
        }
    }
}

enum EdgeSlot {
    Vacant,
    Live(Option<Edge>),
}

#[derive(Default)]
struct EdgeTable {
    slots: Vec<EdgeSlot>,
    free: Vec<u32>,
}

impl EdgeTable {
    fn register(&mut self, edge: Option<Edge>) -> u32 {
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = EdgeSlot::Live(edge);
            slot
        } else {
            let slot = u32::try_from(self.slots.len()).expect("edge table exhausted");
            self.slots.push(EdgeSlot::Live(edge));
            slot
        }
    }

    fn deregister(&mut self, slot: u32) -> Option<Edge> {
        let entry = core::mem::replace(&mut self.slots[slot as usize], EdgeSlot::Vacant);
        self.free.push(slot);
        match entry {
            EdgeSlot::Live(edge) => edge,
            EdgeSlot::Vacant => None,
        }
    }

    fn edge(&self, slot: u32) -> Option<Edge> {
        match self.slots[slot as usize] {
            EdgeSlot::Live(edge) => edge,
            EdgeSlot::Vacant => None,
        }
    }

    fn replace(&mut self, slot: u32, edge: Option<Edge>) -> Option<Edge> {
        match core::mem::replace(&mut self.slots[slot as usize], EdgeSlot::Live(edge)) {
            EdgeSlot::Live(old) => old,
            EdgeSlot::Vacant => None,
        }
    }

    fn live_edges(&self) -> Vec<Edge> {
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                EdgeSlot::Live(Some(edge)) => Some(*edge),
                _ => None,
            })
            .collect()
    }
}
