#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::inline_always)]
#![allow(clippy::option_if_let_else)]
#![allow(unknown_lints)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(unused_qualifications)]
#![warn(variant_size_differences)]

//! Single-threaded smart pointers that reclaim cycles of internal
//! references.
//!
//! Rhizome models an object graph with two owning handle kinds. A [`Root`]
//! is an external entry point into the graph; an [`Internal`] handle is an
//! owned reference embedded *inside* a graph object, bound to the embedding
//! object's [`Anchor`]. An object is destroyed exactly when no root reaches
//! it through any chain of internal handles. That rule holds for cycles too:
//! a ring of objects pointing at each other is reclaimed the moment the last
//! root into the ring is dropped, with no `collect()` call and no pause.
//!
//! # Building a graph
//!
//! Graph node types embed an [`Anchor`] and implement [`Participant`];
//! payloads without internal handles implement [`Participant`] with the
//! default body. Internal handles are created against the anchor of the
//! object that holds them:
//!
//! ```
//! use rhizome::{make_root, Anchor, Internal, Participant};
//!
//! struct Node {
//!     anchor: Anchor,
//!     next: Internal<Node>,
//! }
//!
//! impl Node {
//!     fn new() -> Self {
//!         let anchor = Anchor::new();
//!         let next = Internal::new(&anchor);
//!         Node { anchor, next }
//!     }
//! }
//!
//! impl Participant for Node {
//!     fn anchor(&self) -> Option<&Anchor> {
//!         Some(&self.anchor)
//!     }
//! }
//!
//! let first = make_root(Node::new());
//! let second = make_root(Node::new());
//! first.next.set(&second);
//! second.next.set(&first);
//!
//! // The ring is alive while either root exists.
//! drop(second);
//! assert_eq!(first.use_count(), 2);
//!
//! // Dropping the last root reclaims both nodes despite the cycle.
//! drop(first);
//! ```
//!
//! # How collection works
//!
//! Every object is paired with a header block in a thread-local arena. The
//! header counts root owners and total owning handles, and records which
//! *owned* parents hold edges here (the back-pointer graph). When a mutation
//! removes an edge or a root lets go, the engine checks on demand whether the
//! target can still be reached by walking back-pointers toward a root. If
//! not, the unreachable set is closed over the children it strands and
//! collected in three passes: sever all outgoing edges, run payload
//! destructors, free the blocks. A destructor therefore always observes its
//! outgoing internal handles as empty, and peers in the collected set report
//! `use_count() == 0`.
//!
//! Collection work is proportional to the size of the subgraph touched by a
//! mutation. Objects never linked into a cycle pay only count updates.
//!
//! # Hazards
//!
//! Rhizome is single-threaded; handles are neither `Send` nor `Sync`, and
//! each thread has its own arena. Handles from one thread must not be wired
//! into graphs on another.
//!
//! Borrows obtained through [`Root::get`], [`Internal::get`], or [`Deref`]
//! are snapshots: mutating the graph (dropping roots, re-linking internal
//! handles) can destroy the borrowed payload. Do not hold such a borrow
//! across graph mutations that could orphan the target. Accesses through the
//! handles themselves revalidate against the arena and read as empty once a
//! target is gone.
//!
//! [`Deref`]: core::ops::Deref

#![doc(html_root_url = "https://docs.rs/rhizome/0.1.0")]

// Ensure code blocks in README.md compile
#[cfg(doctest)]
#[doc = include_str!("../README.md")]
mod readme {}

extern crate alloc;
#[macro_use]
extern crate log;

mod anchor;
mod arena;
mod cmp;
mod cycle;
mod header;
mod internal;
mod local;
mod root;
mod set;
mod sweep;

#[cfg(test)]
mod tests;

pub use anchor::{Anchor, Participant};
pub use internal::{Internal, Source};
pub use local::Local;
pub use root::{make_root, Root};
