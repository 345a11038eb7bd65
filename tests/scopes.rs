use ferrous_cyclotron::{
    lookup, provide_override, resolve, ContextKey, Dispose, HandleRef, Host, Provider,
    RuntimeConfig, Scope, ServiceHandle, Source,
};
use std::cell::Cell;
use std::rc::Rc;

fn real<I: Clone + 'static, O: Clone + 'static>(handle: HandleRef<I, O>) -> ServiceHandle<I, O> {
    match handle {
        HandleRef::Real(handle) => handle,
        HandleRef::Proxy(_) => panic!("expected a materialized handle"),
    }
}

#[test]
fn test_resolve_returns_identical_handle() {
    let scope = Scope::root();
    let _dispose_all = scope.bootstrap(RuntimeConfig::default());
    let clock = Provider::read_only("clock", |_| Ok(0u64));

    let first = real(scope.resolve(&clock).unwrap());
    let second = real(scope.resolve(&clock).unwrap());
    assert!(first.same_as(&second));

    // Clones share identity.
    let third = real(scope.resolve(&clock.clone()).unwrap());
    assert!(first.same_as(&third));
}

#[test]
fn test_equal_closures_are_distinct_services() {
    let scope = Scope::root();
    let _dispose_all = scope.bootstrap(RuntimeConfig::default());
    let a = Provider::read_only("same", |_| Ok(1u8));
    let b = Provider::read_only("same", |_| Ok(1u8));

    let ha = real(scope.resolve(&a).unwrap());
    let hb = real(scope.resolve(&b).unwrap());
    assert!(!ha.same_as(&hb));
    assert_ne!(ha.provider_id(), hb.provider_id());
}

#[test]
fn test_new_handle_after_disposal() {
    let scope = Scope::root();
    let _dispose_all = scope.bootstrap(RuntimeConfig::default());
    let builds = Rc::new(Cell::new(0));
    let b = builds.clone();
    let clock = Provider::read_only("clock", move |_| {
        b.set(b.get() + 1);
        Ok(b.get())
    });

    let view = scope.child();
    view.connect(&clock).unwrap();
    let first = view.lookup(&clock).unwrap().unwrap();
    view.destroy();
    assert!(first.is_disposed());

    let second = real(scope.resolve(&clock).unwrap());
    assert!(!first.same_as(&second));
    assert_eq!(second.output(), Some(2));
    assert_eq!(builds.get(), 2);
}

#[test]
fn test_descendants_find_ancestor_handles() {
    let root = Scope::root();
    let _dispose_all = root.bootstrap(RuntimeConfig::default());
    let store = Provider::<String, Source<String>>::passthrough("store");

    root.connect(&store).unwrap();
    let at_root = root.lookup(&store).unwrap().unwrap();

    let grandchild = root.child().child();
    grandchild.connect(&store).unwrap();
    let seen_below = lookup(&grandchild.host(), &store).unwrap().unwrap();

    assert!(at_root.same_as(&seen_below));
    assert_eq!(at_root.ref_count(), 2);

    grandchild.destroy();
    assert_eq!(at_root.ref_count(), 1);
    assert!(!at_root.is_disposed());
}

#[test]
fn test_handle_created_below_is_invisible_above() {
    let root = Scope::root();
    let _dispose_all = root.bootstrap(RuntimeConfig::default());
    let store = Provider::<u8, Source<u8>>::passthrough("store");

    let child = root.child();
    child.connect(&store).unwrap();

    assert!(child.lookup(&store).unwrap().is_some());
    assert!(root.lookup(&store).unwrap().is_none());
}

#[test]
fn test_lookup_never_creates() {
    let root = Scope::root();
    let dispose_all = root.bootstrap(RuntimeConfig::default());
    let built = Rc::new(Cell::new(false));
    let b = built.clone();
    let lazy = Provider::read_only("lazy", move |_| {
        b.set(true);
        Ok(())
    });

    assert!(root.lookup(&lazy).unwrap().is_none());
    assert!(!built.get());
    assert!(dispose_all.snapshot().is_empty());
}

#[test]
fn test_override_applies_to_subtree() {
    let root = Scope::root();
    let _dispose_all = root.bootstrap(RuntimeConfig::default());
    let api = Provider::read_only("api", |_| Ok("https://prod"));
    let fake = Provider::read_only("fake-api", |_| Ok("memory://"));

    let test_area = root.child();
    provide_override(&test_area.host(), &api, fake.clone());
    let nested = test_area.child();

    assert_eq!(nested.connect(&api).unwrap().read(), Some("memory://"));
    assert_eq!(root.connect(&api).unwrap().read(), Some("https://prod"));

    let overridden = real(resolve(&nested.host(), &api).unwrap());
    assert_eq!(overridden.name(), "fake-api");
    assert_eq!(overridden.provider_id(), fake.id());
}

#[test]
fn test_override_shadows_ancestor_handle() {
    let root = Scope::root();
    let _dispose_all = root.bootstrap(RuntimeConfig::default());
    let theme = Provider::read_only("theme", |_| Ok("light"));
    root.connect(&theme).unwrap();

    let dark_area = root.child();
    dark_area.provide_override(&theme, Provider::read_only("dark-theme", |_| Ok("dark")));

    assert_eq!(dark_area.connect(&theme).unwrap().read(), Some("dark"));
    assert_eq!(root.child().connect(&theme).unwrap().read(), Some("light"));
}

#[test]
fn test_override_reaches_dependents_of_ancestor_handle() {
    let root = Scope::root();
    let dispose_all = root.bootstrap(RuntimeConfig::default());
    let store = Provider::read_only("store", |_| Ok("disk"));
    let s = store.clone();
    let repo = Provider::read_only("repo", move |ctx| {
        Ok(ctx.connect(&s)?.read().unwrap_or("none"))
    });
    root.connect(&repo).unwrap();
    let shared = root.lookup(&repo).unwrap().unwrap();

    let test_area = root.child();
    test_area.provide_override(&store, Provider::read_only("mock-store", |_| Ok("mock")));
    assert_eq!(test_area.connect(&repo).unwrap().read(), Some("mock"));

    let local = test_area.lookup(&repo).unwrap().unwrap();
    assert!(!local.same_as(&shared));
    assert_eq!(shared.ref_count(), 1);
    assert_eq!(root.child().connect(&repo).unwrap().read(), Some("disk"));

    test_area.destroy();
    assert!(local.is_disposed());
    assert!(!shared.is_disposed());
    assert_eq!(dispose_all.snapshot().live_count(), 2);
}

#[test]
fn test_override_reaches_indirect_dependents() {
    let root = Scope::root();
    let _dispose_all = root.bootstrap(RuntimeConfig::default());
    let clock = Provider::read_only("clock", |_| Ok(100u32));
    let c = clock.clone();
    let timer = Provider::read_only("timer", move |ctx| {
        Ok(ctx.connect(&c)?.read().unwrap_or(0) + 1)
    });
    let t = timer.clone();
    let report = Provider::read_only("report", move |ctx| {
        Ok(ctx.connect(&t)?.read().unwrap_or(0) + 1)
    });
    assert_eq!(root.connect(&report).unwrap().read(), Some(102));

    let frozen = root.child();
    frozen.provide_override(&clock, Provider::read_only("frozen-clock", |_| Ok(0u32)));
    assert_eq!(frozen.child().connect(&report).unwrap().read(), Some(2));
    assert_eq!(root.lookup(&report).unwrap().unwrap().ref_count(), 1);
}

#[test]
fn test_nested_bootstrap_is_independent() {
    let root = Scope::root();
    let outer = root.bootstrap(RuntimeConfig::default());
    let island = root.child();
    let inner = island.bootstrap(RuntimeConfig::default());

    let clock = Provider::read_only("clock", |_| Ok(1u8));
    island.connect(&clock).unwrap();

    assert_eq!(inner.snapshot().handles.len(), 1);
    assert!(outer.snapshot().is_empty());
}

#[test]
fn test_destroyed_scope_drops_its_cache() {
    let root = Scope::root();
    let _dispose_all = root.bootstrap(RuntimeConfig::default());
    let clock = Provider::read_only("clock", |_| Ok(1u8));

    let child = root.child();
    child.resolve(&clock).unwrap();
    assert!(child.get_context(&ContextKey::Service(clock.id())).is_some());

    child.destroy();
    assert!(child.get_context(&ContextKey::Service(clock.id())).is_none());
}
