use ferrous_cyclotron::{auto, connectable, Observer, Provider, RuntimeConfig, Scope, Source};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_auto_connects_while_subscribed() {
    let scope = Scope::root();
    let _dispose_all = scope.bootstrap(RuntimeConfig::default());
    let ticks = Provider::<u32, Source<u32>>::passthrough("ticks");

    let stream = auto(&scope.host(), &ticks);
    assert!(scope.lookup(&ticks).unwrap().is_none());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let first = stream.subscribe_fn(move |v| s.borrow_mut().push(v));
    let second = stream.subscribe_fn(|_| {});
    let handle = scope.lookup(&ticks).unwrap().unwrap();
    assert_eq!(handle.ref_count(), 2);

    scope.connect(&ticks).unwrap().send(7).unwrap();
    assert_eq!(*seen.borrow(), vec![7]);

    first.unsubscribe();
    second.unsubscribe();
    // The scope's own connection still holds it.
    assert_eq!(handle.ref_count(), 1);
}

#[test]
fn test_auto_releases_on_last_unsubscribe() {
    let scope = Scope::root();
    let dispose_all = scope.bootstrap(RuntimeConfig::default());
    let numbers = Provider::read_only("numbers", |_| Ok(Source::of(vec![1, 2, 3])));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let sub = auto(&scope.host(), &numbers).subscribe_fn(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);

    sub.unsubscribe();
    assert!(scope.lookup(&numbers).unwrap().is_none());
    assert_eq!(dispose_all.snapshot().live_count(), 0);
}

#[test]
fn test_auto_reports_connect_failure_as_stream_error() {
    let scope = Scope::root();
    let ticks = Provider::<u32, Source<u32>>::passthrough("ticks");

    let errors = Rc::new(RefCell::new(Vec::new()));
    let e = errors.clone();
    auto(&scope.host(), &ticks).subscribe(
        Observer::new(|_| {}).on_error(move |err| e.borrow_mut().push(err.message().to_string())),
    );

    assert_eq!(errors.borrow().len(), 1);
    assert!(errors.borrow()[0].contains("bootstrap"));
}

#[test]
fn test_connectable_chains_drivers() {
    let scope = Scope::root();
    let _dispose_all = scope.bootstrap(RuntimeConfig::default());
    let keys = Provider::<i32, Source<i32>>::passthrough("keys");
    let doubled = Provider::read_write("doubled", |_, input: Source<i32>| Ok(input.map(|v| v * 2)));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let sub = connectable(&scope.host(), &[keys.clone(), doubled.clone()])
        .subscribe_fn(move |v| s.borrow_mut().push(v));

    let input = scope.connect(&keys).unwrap();
    input.send(5).unwrap();
    input.send(6).unwrap();
    assert_eq!(*seen.borrow(), vec![10, 12]);

    sub.unsubscribe();
    assert!(scope.lookup(&doubled).unwrap().is_none());
    assert_eq!(scope.lookup(&keys).unwrap().unwrap().ref_count(), 1);
}

#[test]
fn test_connectable_edge_cases() {
    let scope = Scope::root();
    let _dispose_all = scope.bootstrap(RuntimeConfig::default());

    let none: Vec<Provider<u8, Source<u8>>> = Vec::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    connectable(&scope.host(), &none).subscribe_fn(move |v| s.borrow_mut().push(v));
    assert!(seen.borrow().is_empty());

    let single = Provider::<u8, Source<u8>>::passthrough("single");
    let sub = connectable(&scope.host(), &[single.clone()]).subscribe_fn(|_| {});
    assert_eq!(scope.lookup(&single).unwrap().unwrap().ref_count(), 1);
    sub.unsubscribe();
    assert!(scope.lookup(&single).unwrap().is_none());
}
