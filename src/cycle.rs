//! Reachability traversal over the back-pointer graph.

use crate::arena::{Arena, HeaderId};
use crate::set::IdSet;

/// Walk the back-pointer graph from the nodes in `pending`, looking for an
/// owned header.
///
/// Returns true as soon as an owned node is found, meaning the seed is still
/// reachable from a root. Returns false once the graph is exhausted; `seen`
/// then holds every parent visited, all of them provably unreachable.
///
/// The `unreachable` and `owned` sets carry memoized classifications across
/// repeated walks from [`find_unreachable_children`]. Nodes already known
/// unreachable cannot rescue a walk and are not traversed through; hitting a
/// node already known owned rescues the walk immediately. The plain `seen`
/// set only guards enqueueing within a single walk and must stay distinct
/// from the memoized sets, or repeated walks would terminate wrongly.
pub(crate) fn walk(
    arena: &mut Arena,
    seen: &mut IdSet,
    pending: &mut Vec<HeaderId>,
    unreachable: Option<&IdSet>,
    mut owned: Option<&mut IdSet>,
) -> bool {
    while let Some(node) = pending.pop() {
        if owned.as_deref().map_or(false, |owned| owned.contains(node)) {
            return true;
        }
        if unreachable.map_or(false, |dead| dead.contains(node)) {
            continue;
        }
        let Some(header) = arena.get(node) else {
            continue;
        };
        // A block mid-collection never rescues a walk.
        if header.unreachable {
            continue;
        }
        if header.is_owned() {
            if let Some(owned) = owned.as_deref_mut() {
                owned.insert(node);
            }
            return true;
        }
        let parents = header.back_pointers.parents().collect::<Vec<_>>();
        for parent in parents {
            if unreachable.map_or(false, |dead| dead.contains(parent)) {
                continue;
            }
            if seen.contains(parent) {
                continue;
            }
            if let Some(owned) = owned.as_deref_mut() {
                if owned.contains(parent) {
                    owned.insert(node);
                    return true;
                }
            }
            seen.insert(parent);
            pending.push(parent);
        }
    }
    false
}

/// Expand `unreachable` to the transitive set of children whose only
/// remaining reachability runs through it.
///
/// Every member's outgoing edges are examined. A child that is owned in its
/// own right, or that a scoped walk proves reachable around the doomed set,
/// is memoized as owned. Otherwise the child and every parent its walk
/// visited join the unreachable set and are queued for their own expansion.
pub(crate) fn find_unreachable_children(arena: &mut Arena, unreachable: &mut IdSet) {
    let mut owned = IdSet::new();
    let mut queue = unreachable.iter().collect::<Vec<_>>();
    let mut seen = IdSet::new();
    let mut pending = Vec::new();

    while let Some(next) = queue.pop() {
        let Some(state) = arena
            .get(next)
            .and_then(|header| header.participant.clone())
        else {
            continue;
        };
        for edge in state.live_edges() {
            let child = edge.header;
            if unreachable.contains(child) || owned.contains(child) {
                continue;
            }
            let Some(header) = arena.get(child) else {
                continue;
            };
            if header.is_owned() {
                owned.insert(child);
                continue;
            }

            seen.clear();
            pending.clear();
            pending.push(child);
            if walk(arena, &mut seen, &mut pending, Some(&*unreachable), Some(&mut owned)) {
                owned.insert(child);
            } else {
                let parents = seen.iter().collect::<Vec<_>>();
                for parent in parents {
                    if unreachable.insert(parent) {
                        queue.push(parent);
                    }
                }
                if unreachable.insert(child) {
                    queue.push(child);
                }
            }
        }
    }
}
