//! Basic atom lifecycle: creation, read/write, watch/unwatch, keep-alive,
//! scopes, and overrides.

use std::cell::Cell;
use std::rc::Rc;

use atomstore::{flavors, KeyValue, OverrideSet, Snapshot, StoreContext};

#[test]
fn read_returns_the_initial_value() {
    let store = StoreContext::root();
    let count = flavors::value(0);
    assert_eq!(store.read(&count), 0);
}

#[test]
fn set_replaces_the_cached_value() {
    let store = StoreContext::root();
    let count = flavors::value(0);
    store.read(&count);
    store.set(&count, 5);
    assert_eq!(store.read(&count), 5);
}

#[test]
fn set_before_any_read_is_a_no_op() {
    let store = StoreContext::root();
    let count = flavors::value(0);
    // No cache exists yet for `count`, so this must not create one.
    store.set(&count, 99);
    assert_eq!(store.lookup(&count), None);
}

#[test]
fn modify_applies_a_function_to_the_current_value() {
    let store = StoreContext::root();
    let count = flavors::value(10);
    store.read(&count);
    store.modify(&count, |v| v + 1);
    assert_eq!(store.read(&count), 11);
}

#[test]
fn watch_without_keep_alive_releases_once_unwatched() {
    let store = StoreContext::root();
    let count = flavors::value(0);
    let subscriber = store.subscriber();
    store.watch(&count, &subscriber, || {});
    assert_eq!(store.lookup(&count), Some(0));

    store.unwatch(&count, &subscriber);
    assert_eq!(store.lookup(&count), None);
}

#[test]
fn keep_alive_survives_unwatch() {
    let store = StoreContext::root();
    let count = flavors::value(0).keep_alive();
    let subscriber = store.subscriber();
    store.watch(&count, &subscriber, || {});
    store.unwatch(&count, &subscriber);
    assert_eq!(store.lookup(&count), Some(0));
}

#[test]
fn watching_the_same_key_twice_does_not_double_notify_observers() {
    let observed = Rc::new(Cell::new(0));
    let o = observed.clone();
    let store = StoreContext::root().inherited(
        vec![Rc::new(move |_: &Snapshot| o.set(o.get() + 1))],
        OverrideSet::new(),
    );
    let count = flavors::value(0);
    let subscriber = store.subscriber();

    store.watch(&count, &subscriber, || {});
    let after_first = observed.get();
    store.watch(&count, &subscriber, || {});
    assert_eq!(observed.get(), after_first, "re-watching the same key must be idempotent");
}

#[test]
fn subscriber_drop_unsubscribes_from_every_tracked_key() {
    let store = StoreContext::root();
    let a = flavors::value(1);
    let b = flavors::value(2);
    {
        let subscriber = store.subscriber();
        store.watch(&a, &subscriber, || {});
        store.watch(&b, &subscriber, || {});
        assert_eq!(subscriber.watched_count(), 2);
    }
    assert_eq!(store.lookup(&a), None);
    assert_eq!(store.lookup(&b), None);
}

#[test]
fn read_does_not_retain_a_key_created_only_for_that_read() {
    let store = StoreContext::root();
    let count = flavors::value(0);
    // `read` alone creates no graph edge and no subscription, so the fresh
    // cache entry is immediately eligible for release.
    store.read(&count);
    assert_eq!(store.lookup(&count), None);
}

#[test]
fn type_scoped_override_falls_back_to_type_level_registration() {
    let store = StoreContext::root();
    let a = flavors::value(1);
    let b = flavors::value(1);
    store.override_type::<flavors::ValueAtom<i32>, _>(|_ctx| 42);

    assert_eq!(store.read(&a), 42);
    assert_eq!(store.read(&b), 42);
}

#[test]
fn concrete_key_override_takes_priority_over_type_override() {
    let store = StoreContext::root();
    let a = flavors::value(1).with_key(KeyValue::new("a"));
    let b = flavors::value(1).with_key(KeyValue::new("b"));
    store.override_type::<flavors::ValueAtom<i32>, _>(|_ctx| 0);
    store.override_atom(&a, |_ctx| 7);

    assert_eq!(store.read(&a), 7);
    assert_eq!(store.read(&b), 0);
}

#[test]
fn scoped_atoms_in_different_scope_instances_are_isolated() {
    let store = StoreContext::root();
    let scope_id = KeyValue::new("counter-scope");
    let counter = flavors::value(0).in_scope(scope_id.clone());

    let scope_a = store.scoped(scope_id.clone(), vec![], OverrideSet::new());
    let scope_b = store.scoped(scope_id, vec![], OverrideSet::new());

    scope_a.read(&counter);
    scope_a.set(&counter, 100);

    assert_eq!(scope_a.read(&counter), 100);
    assert_eq!(scope_b.read(&counter), 0);
}
