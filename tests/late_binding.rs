#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use rhizome::{make_root, Anchor, Internal, Participant, Root};

use counted::{init_log, Counted};

struct Pair {
    anchor: Anchor,
    first: Internal<Pair>,
    second: Internal<Pair>,
    _data: Counted,
}

impl Pair {
    fn new() -> Self {
        let anchor = Anchor::new();
        let first = Internal::new(&anchor);
        let second = Internal::new(&anchor);
        Self {
            anchor,
            first,
            second,
            _data: Counted::new(),
        }
    }
}

impl Participant for Pair {
    fn anchor(&self) -> Option<&Anchor> {
        Some(&self.anchor)
    }
}

/// Edges wired before their holder is bound to a root must be registered
/// retroactively when the root arrives, and the whole web must still be
/// collectable afterwards.
#[test]
fn edges_wired_before_root_binding_are_honored() {
    init_log();

    let loose = Box::new(Pair::new());
    {
        let n2 = make_root(Pair::new());
        let n3 = make_root(Pair::new());
        let n4 = make_root(Pair::new());
        let n5 = make_root(Pair::new());
        let n6 = make_root(Pair::new());

        loose.first.set(&n2);
        loose.second.set(&n3);
        n2.first.set(&n3);
        n2.second.set(&n4);
        n3.first.set(&n2);
        n3.second.set(&n4);
        n4.first.set(&n5);
        n5.first.set(&n6);
    }
    // The loose node is not owned by any root, but its edges keep the web
    // alive: they are referrers no back-pointer accounts for.
    assert_eq!(Counted::instances(), 6);

    let root = Root::from(loose);
    assert_eq!(Counted::instances(), 6);

    // Close a cycle back to the late-bound node, then drop the only root.
    root.first
        .get()
        .unwrap()
        .second
        .get()
        .unwrap()
        .second
        .set(&root);
    drop(root);
    assert_eq!(Counted::instances(), 0);
}

#[test]
fn stack_participant_edges_count_without_back_pointers() {
    init_log();
    {
        let holder = Pair::new();
        {
            let target = make_root(Pair::new());
            holder.first.set(&target);
        }
        // The root is gone but the stack holder's edge keeps the target.
        assert_eq!(Counted::instances(), 2);
        assert_eq!(holder.first.use_count(), 1);
    }
    assert_eq!(Counted::instances(), 0);
}
