#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::cell::Cell;
use std::rc::Rc;

use rhizome::{make_root, Anchor, Internal, Participant, Root};

use counted::{init_log, Counted};

/// Node whose destructor records what it observes through its own outgoing
/// handle at destruction time.
struct Observer {
    anchor: Anchor,
    next: Internal<Observer>,
    _data: Counted,
    observed_nil: Rc<Cell<u32>>,
}

impl Observer {
    fn new(observed_nil: &Rc<Cell<u32>>) -> Self {
        let anchor = Anchor::new();
        let next = Internal::new(&anchor);
        Self {
            anchor,
            next,
            _data: Counted::new(),
            observed_nil: Rc::clone(observed_nil),
        }
    }
}

impl Participant for Observer {
    fn anchor(&self) -> Option<&Anchor> {
        Some(&self.anchor)
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        assert!(self.next.is_null());
        assert!(self.next.get().is_none());
        assert_eq!(self.next.use_count(), 0);
        // A dead handle cannot resurrect its target.
        assert!(Root::from_internal(&self.next).is_null());
        self.observed_nil.set(self.observed_nil.get() + 1);
    }
}

#[test]
fn destructors_observe_nil_handles_in_a_collapsing_chain() {
    init_log();

    let observed = Rc::new(Cell::new(0));
    {
        let holder = Observer::new(&observed);
        holder.next.set(&make_root(Observer::new(&observed)));
        holder
            .next
            .get()
            .unwrap()
            .next
            .set(&make_root(Observer::new(&observed)));
        assert_eq!(Counted::instances(), 3);
        holder.next.reset();
        assert_eq!(Counted::instances(), 1);
        assert_eq!(observed.get(), 2);
    }
    assert_eq!(observed.get(), 3);
    assert_eq!(Counted::instances(), 0);
}

#[test]
fn destructors_observe_nil_handles_in_a_collapsing_cycle() {
    init_log();

    let observed = Rc::new(Cell::new(0));
    {
        let first = make_root(Observer::new(&observed));
        let second = make_root(Observer::new(&observed));
        first.next.set(&second);
        second.next.set(&first);
        drop(second);
        assert_eq!(Counted::instances(), 2);
    }
    assert_eq!(observed.get(), 2);
    assert_eq!(Counted::instances(), 0);
}

#[test]
fn collected_cycle_members_read_as_dead_during_teardown() {
    init_log();

    struct Probe {
        anchor: Anchor,
        next: Internal<Probe>,
        peer: Rc<Cell<u32>>,
    }

    impl Participant for Probe {
        fn anchor(&self) -> Option<&Anchor> {
            Some(&self.anchor)
        }
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            // Each member's handle was severed before any destructor ran.
            if self.next.get().is_none() {
                self.peer.set(self.peer.get() + 1);
            }
        }
    }

    let severed = Rc::new(Cell::new(0));
    {
        let make = |severed: &Rc<Cell<u32>>| {
            let anchor = Anchor::new();
            let next = Internal::new(&anchor);
            make_root(Probe {
                anchor,
                next,
                peer: Rc::clone(severed),
            })
        };
        let a = make(&severed);
        let b = make(&severed);
        let c = make(&severed);
        a.next.set(&b);
        b.next.set(&c);
        c.next.set(&a);
    }
    assert_eq!(severed.get(), 3);
}
