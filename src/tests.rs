//! Whitebox tests for the reachability engine's bookkeeping invariants.

use alloc::rc::Rc;
use core::cell::Cell;

use crate::arena::{self, HeaderId};
use crate::set::HashSet;
use crate::{make_root, Anchor, Internal, Participant};

struct Node {
    anchor: Anchor,
    first: Internal<Node>,
    second: Internal<Node>,
    drops: Rc<Cell<usize>>,
}

impl Node {
    fn new(drops: &Rc<Cell<usize>>) -> Self {
        let anchor = Anchor::new();
        let first = Internal::new(&anchor);
        let second = Internal::new(&anchor);
        Self {
            anchor,
            first,
            second,
            drops: Rc::clone(drops),
        }
    }
}

impl Participant for Node {
    fn anchor(&self) -> Option<&Anchor> {
        Some(&self.anchor)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

/// Check the per-header count bounds and the back-pointer bijection over
/// every live header in this thread's arena.
///
/// Bijection: a parent appears in a target's back-pointer set with
/// multiplicity equal to the number of live edges the parent's payload holds
/// to that target, and only owned participants appear at all.
fn assert_engine_invariants() {
    arena::with(|arena| {
        let ids = arena.live_ids();

        let mut participants = Vec::new();
        for &id in &ids {
            let header = arena.get(id).expect("live id");
            if !header.unreachable {
                assert!(
                    header.internal_count >= header.owner_count,
                    "internal_count below owner_count for {id:?}"
                );
                assert!(
                    header.back_pointers.total() <= header.internal_count,
                    "back-pointer total above internal_count for {id:?}"
                );
            }
            if let Some(state) = header.participant.clone() {
                participants.push((id, state));
            }
        }

        // Tally live edges per (parent, target) pair.
        let mut edge_counts = hashbrown::HashMap::<(HeaderId, HeaderId), u32>::new();
        for (parent, state) in &participants {
            for edge in state.live_edges() {
                *edge_counts.entry((*parent, edge.header)).or_insert(0) += 1;
            }
        }

        let mut seen_pairs = HashSet::default();
        for &target in &ids {
            let entries = {
                let header = arena.get(target).expect("live id");
                header
                    .back_pointers
                    .parents()
                    .map(|parent| (parent, header.back_pointers.multiplicity(parent)))
                    .collect::<Vec<_>>()
            };
            for (parent, multiplicity) in entries {
                assert_eq!(
                    edge_counts.get(&(parent, target)).copied(),
                    Some(multiplicity),
                    "back-pointer multiplicity mismatch for {parent:?} -> {target:?}"
                );
                seen_pairs.insert((parent, target));
            }
        }
        for (&(parent, target), &count) in &edge_counts {
            if arena.get(target).is_none() {
                continue;
            }
            assert!(
                count == 0 || seen_pairs.contains(&(parent, target)),
                "live edge {parent:?} -> {target:?} missing from back-pointers"
            );
        }
    });
}

#[test]
fn counts_and_back_pointers_stay_consistent() {
    let drops = Rc::new(Cell::new(0));
    let a = make_root(Node::new(&drops));
    let b = make_root(Node::new(&drops));
    assert_engine_invariants();

    a.first.set(&b);
    b.first.set(&a);
    assert_engine_invariants();

    a.second.set(&b);
    assert_engine_invariants();

    a.second.reset();
    assert_engine_invariants();

    drop(b);
    assert_engine_invariants();
    assert_eq!(drops.get(), 0);

    drop(a);
    assert_eq!(drops.get(), 2);
}

#[test]
fn duplicate_edges_share_one_back_pointer_entry() {
    let drops = Rc::new(Cell::new(0));
    let parent = make_root(Node::new(&drops));
    let child = make_root(Node::new(&drops));

    parent.first.set(&child);
    parent.second.set(&child);
    assert_eq!(child.use_count(), 3);
    assert_engine_invariants();

    drop(child);
    assert_eq!(parent.first.use_count(), 2);
    assert_engine_invariants();

    // Both edges come from one parent; the child must die with it.
    drop(parent);
    assert_eq!(drops.get(), 2);
}

#[test]
fn owner_binding_registers_preexisting_edges() {
    let drops = Rc::new(Cell::new(0));
    let target = make_root(Node::new(&drops));

    // Wire the edge while the holder is not yet owned by any root.
    let holder = Node::new(&drops);
    holder.first.set(&target);
    assert_eq!(target.use_count(), 2);
    assert_engine_invariants();

    // Binding the holder retroactively records the back-pointer.
    let holder = make_root(holder);
    assert_engine_invariants();
    arena::with(|arena| {
        let holder_id = holder.edge().expect("holder is live").header;
        let target_id = target.edge().expect("target is live").header;
        let header = arena.get(target_id).expect("target header");
        assert_eq!(header.back_pointers.multiplicity(holder_id), 1);
    });

    drop(target);
    assert_eq!(drops.get(), 0);
    drop(holder);
    assert_eq!(drops.get(), 2);
}

#[test]
fn use_count_reports_internal_count_until_collection() {
    let drops = Rc::new(Cell::new(0));
    let a = make_root(Node::new(&drops));
    assert_eq!(a.use_count(), 1);
    let a2 = a.clone();
    assert_eq!(a.use_count(), 2);
    let b = make_root(Node::new(&drops));
    b.first.set(&a);
    assert_eq!(a.use_count(), 3);
    drop(a2);
    assert_eq!(a.use_count(), 2);
    drop(b);
    assert_eq!(a.use_count(), 1);
    assert_engine_invariants();
}
