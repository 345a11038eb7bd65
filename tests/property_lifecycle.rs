/// Property-based tests for buffering and reference counting
///
/// These check that the lifecycle rules hold regardless of how many values
/// are written or in which order connecting scopes go away.
use ferrous_cyclotron::{Dispose, HotBuffer, Observer, Provider, RuntimeConfig, Scope, Source};
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, Observer<T>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    (seen, Observer::new(move |v| s.borrow_mut().push(v)))
}

// Property: values written before the first subscriber are replayed to it
// exactly once, and later values reach every subscriber
proptest! {
    #[test]
    fn replay_goes_to_first_subscriber_only(
        before in prop::collection::vec(any::<i32>(), 0..20),
        after in prop::collection::vec(any::<i32>(), 0..20),
    ) {
        let buffer = HotBuffer::new();
        for v in &before {
            buffer.push(*v);
        }

        let (first, first_observer) = recorder();
        let (second, second_observer) = recorder();
        buffer.subscribe(first_observer);
        buffer.subscribe(second_observer);
        for v in &after {
            buffer.push(*v);
        }

        let mut expected_first = before.clone();
        expected_first.extend(after.iter().copied());
        prop_assert_eq!(&*first.borrow(), &expected_first);
        prop_assert_eq!(&*second.borrow(), &after);
    }
}

// Property: a shared service disposes exactly when the last connecting
// scope is destroyed, whatever the destruction order
proptest! {
    #[test]
    fn disposal_pairs_with_last_release(
        order in (1usize..8).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
    ) {
        let root = Scope::root();
        let _dispose_all = root.bootstrap(RuntimeConfig::default());

        let disposals = Rc::new(Cell::new(0));
        let d = disposals.clone();
        let shared = Provider::read_only("shared", move |ctx| {
            let d = d.clone();
            ctx.on_dispose(move || d.set(d.get() + 1));
            Ok(())
        });
        root.resolve(&shared).unwrap();
        let handle = root.lookup(&shared).unwrap().unwrap();

        let views: Vec<Scope> = order.iter().map(|_| root.child()).collect();
        for view in &views {
            view.connect(&shared).unwrap();
        }
        prop_assert_eq!(handle.ref_count(), views.len());

        for (released, index) in order.iter().enumerate() {
            prop_assert_eq!(disposals.get(), 0);
            views[*index].destroy();
            prop_assert_eq!(handle.ref_count(), views.len() - released - 1);
        }
        prop_assert_eq!(disposals.get(), 1);
        prop_assert!(handle.is_disposed());
    }
}

// Property: written values reach the first reader in order, however the
// writes are split between connections
proptest! {
    #[test]
    fn writes_from_many_connections_keep_order(
        writes in prop::collection::vec((0usize..3, any::<u16>()), 0..30)
    ) {
        let root = Scope::root();
        let _dispose_all = root.bootstrap(RuntimeConfig::default());
        let bus = Provider::<u16, Source<u16>>::passthrough("bus");

        root.connect(&bus).unwrap();
        let views: Vec<Scope> = (0..3).map(|_| root.child()).collect();
        let connections: Vec<_> = views.iter().map(|view| view.connect(&bus).unwrap()).collect();
        for (which, value) in &writes {
            connections[*which].send(*value).unwrap();
        }

        let (seen, observer) = recorder();
        root.lookup(&bus).unwrap().unwrap().output().unwrap().subscribe(observer);
        let expected: Vec<u16> = writes.iter().map(|(_, v)| *v).collect();
        prop_assert_eq!(&*seen.borrow(), &expected);
    }
}
