#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use rhizome::{make_root, Anchor, Internal, Participant, Root};

use counted::{init_log, Counted};

struct Holder {
    anchor: Anchor,
    held: Internal<Counted>,
}

impl Holder {
    fn new() -> Self {
        let anchor = Anchor::new();
        let held = Internal::new(&anchor);
        Self { anchor, held }
    }
}

impl Clone for Holder {
    fn clone(&self) -> Self {
        let anchor = Anchor::new();
        let held = Internal::adopt(&anchor, &self.held);
        Self { anchor, held }
    }
}

impl Participant for Holder {
    fn anchor(&self) -> Option<&Anchor> {
        Some(&self.anchor)
    }
}

#[test]
fn use_count_tracks_owners_of_every_kind() {
    init_log();

    let mut first = make_root(Counted::new());
    assert_eq!(first.use_count(), 1);
    assert!(first.unique());

    let second = first.clone();
    assert_eq!(first.use_count(), 2);
    assert_eq!(second.use_count(), 2);

    first.reset();
    assert_eq!(second.use_count(), 1);
    assert_eq!(first.use_count(), 0);
    assert!(first.is_null());

    // Internal handles held by stack objects count too.
    let holder = Holder::new();
    holder.held.set(&second);
    let holder2 = holder.clone();
    assert_eq!(second.use_count(), 3);
    assert_eq!(holder.held.use_count(), 3);
    assert_eq!(holder2.held.use_count(), 3);

    let third = Root::from_internal(&holder.held);
    assert_eq!(second.use_count(), 4);
    assert_eq!(third.use_count(), 4);

    drop(second);
    drop(third);
    assert_eq!(holder.held.use_count(), 2);
    assert_eq!(holder2.held.use_count(), 2);

    holder.held.reset();
    assert_eq!(holder2.held.use_count(), 1);
    assert!(!holder2.held.is_null());
    assert_eq!(Counted::instances(), 1);

    // Re-rooting from the last internal handle keeps the object alive.
    let first = Root::from_internal(&holder2.held);
    assert_eq!(holder2.held.use_count(), 2);
    assert_eq!(first.use_count(), 2);

    holder.held.set(&holder2.held);
    assert_eq!(holder2.held.use_count(), 3);
    assert_eq!(holder.held.use_count(), 3);
    assert_eq!(first.use_count(), 3);

    drop(holder);
    drop(holder2);
    drop(first);
    assert_eq!(Counted::instances(), 0);
}

#[test]
fn clone_of_empty_root_stays_empty() {
    init_log();

    let empty = Root::<Counted>::new();
    assert_eq!(empty.use_count(), 0);
    assert!(empty.is_null());

    let clone = empty.clone();
    assert!(clone.is_null());
    assert_eq!(clone.use_count(), 0);
}
