//! Collection of unreachable blocks.
//!
//! Collection runs in three ordered passes over the doomed set:
//!
//! 1. Severance. Every member is flagged unreachable and every outgoing edge
//!    is nulled, decrementing the target's internal count and rescinding one
//!    back-pointer unit. After this pass, any internal handle a destructor
//!    can reach reads as empty.
//! 2. Payload destruction, guarded by the sticky `deleted` flag. The arena
//!    borrow is released first: destructors may drop or create handles and
//!    trigger further collections, and the sticky flags make any walk that
//!    touches this set a no-op.
//! 3. Block release. Header slots are freed and combined-block storage is
//!    deallocated.
//!
//! The order is load-bearing even for a single-object set: severance is what
//! lets a payload destructor observe nil handles, and deferring block release
//! keeps a destructor from reading a freed neighbor header.

use core::ptr::NonNull;

use crate::arena::{self, HeaderId};
use crate::cycle;
use crate::header::ReleaseFn;
use crate::set::IdSet;

/// What a count decrement demands once the arena borrow is released.
pub(crate) enum Decision {
    Nothing,
    /// The internal count reached zero: destroy this block and everything
    /// only it kept alive.
    FreeSelf,
    /// The block lost its last owner but still has referrers: decide whether
    /// any root can still reach it.
    CheckReachable,
}

pub(crate) fn run(id: HeaderId, decision: Decision) {
    match decision {
        Decision::Nothing => {}
        Decision::FreeSelf => free_self(id),
        Decision::CheckReachable => check_reachable(id),
    }
}

/// On-demand reachability check for a block with no root handles left.
///
/// If the walk over the back-pointer graph finds no owned header, the seen
/// set is the candidate unreachable set; it is expanded to the children it
/// strands and the whole set is collected.
fn check_reachable(id: HeaderId) {
    let doomed = arena::with(|arena| {
        let header = arena.get(id)?;
        if header.is_owned() {
            return None;
        }
        let mut seen = IdSet::new();
        let mut pending = vec![id];
        seen.insert(id);
        if cycle::walk(arena, &mut seen, &mut pending, None, None) {
            return None;
        }
        debug!(
            "rhizome reachability check found no owners for {:?}, {} candidates",
            id,
            seen.len()
        );
        cycle::find_unreachable_children(arena, &mut seen);
        Some(seen)
    });
    if let Some(doomed) = doomed {
        collect(&doomed);
    }
}

/// The internal count hit zero: no handle of any kind points here anymore.
/// The block is destroyed along with every child that only it kept alive.
fn free_self(id: HeaderId) {
    let doomed = arena::with(|arena| {
        match arena.get(id) {
            // Mid-collection teardown reaches zero counts; the outer
            // collection owns the block.
            Some(header) if header.unreachable => None,
            None => None,
            Some(_) => {
                let mut doomed = IdSet::new();
                doomed.insert(id);
                cycle::find_unreachable_children(arena, &mut doomed);
                Some(doomed)
            }
        }
    });
    if let Some(doomed) = doomed {
        collect(&doomed);
    }
}

enum DestroyOp {
    Thunk(unsafe fn(NonNull<()>)),
    Release(ReleaseFn),
}

fn collect(doomed: &IdSet) {
    debug!("rhizome collecting {} unreachable objects", doomed.len());

    // Pass 1: sever every outgoing edge so destructors observe nil handles,
    // then record the destroy hooks while the flags are being set.
    let destroys = arena::with(|arena| {
        for id in doomed.iter() {
            let state = match arena.get(id) {
                Some(header) => {
                    header.unreachable = true;
                    header.participant.clone()
                }
                None => continue,
            };
            let Some(state) = state else {
                continue;
            };
            state.sever_all(|edge| {
                if let Some(child) = arena.get(edge.header) {
                    debug_assert!(child.internal_count > 0);
                    child.internal_count -= 1;
                    child.back_pointers.remove(id);
                }
            });
        }

        let mut destroys = Vec::with_capacity(doomed.len());
        for id in doomed.iter() {
            let Some(header) = arena.get(id) else {
                continue;
            };
            if header.deleted {
                continue;
            }
            header.deleted = true;
            let op = match header.release.take() {
                Some(release) => DestroyOp::Release(release),
                None => DestroyOp::Thunk(header.vtable.destroy),
            };
            destroys.push((id, header.payload, op));
        }
        destroys
    });

    // Pass 2: run payload destructors with the arena released.
    for (id, payload, op) in destroys {
        trace!("rhizome destroying payload of {:?}", id);
        match op {
            DestroyOp::Thunk(destroy) => unsafe { destroy(payload) },
            DestroyOp::Release(release) => release(payload),
        }
    }

    // Pass 3: free the header slots and any combined-block storage.
    arena::with(|arena| {
        for id in doomed.iter() {
            if let Some(header) = arena.remove(id) {
                trace!("rhizome freeing block {:?}", id);
                unsafe { (header.vtable.free_storage)(header.payload) };
            }
        }
    });
}
