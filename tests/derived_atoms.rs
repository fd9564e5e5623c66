//! Dependency propagation, release cascades, custom reset, snapshots, and
//! cooperative async refresh/cancellation.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use atomstore::{flavors, StoreContext};

#[test]
fn derived_atom_recomputes_when_its_dependency_changes() {
    let store = StoreContext::root();
    let count = flavors::value(3);
    let doubled = flavors::derived_state({
        let count = count.clone();
        move |ctx| ctx.watch(&count) * 2
    });

    assert_eq!(store.read(&doubled), 6);
    store.set(&count, 10);
    assert_eq!(store.read(&doubled), 20);
}

#[test]
fn setting_a_dependency_propagates_through_a_watched_derived_chain() {
    let store = StoreContext::root();
    let count = flavors::value(1);
    let doubled = flavors::derived_state({
        let count = count.clone();
        move |ctx| ctx.watch(&count) * 2
    });
    let label = flavors::derived_state({
        let doubled = doubled.clone();
        move |ctx| format!("value={}", ctx.watch(&doubled))
    });

    let subscriber = store.subscriber();
    let seen = Rc::new(Cell::new(String::new()));
    let label_for_closure = label.clone();
    let store_for_closure = store.clone();
    let s = seen.clone();
    store.watch(&label, &subscriber, move || {
        s.set(store_for_closure.read(&label_for_closure));
    });

    store.set(&count, 5);
    assert_eq!(store.read(&label), "value=10");
    assert_eq!(seen.take(), "value=10");
}

#[test]
fn releasing_a_derived_atom_cascades_to_its_no_longer_needed_dependency() {
    let store = StoreContext::root();
    let count = flavors::value(1);
    let doubled = flavors::derived_state({
        let count = count.clone();
        move |ctx| ctx.watch(&count) * 2
    });

    let subscriber = store.subscriber();
    store.watch(&doubled, &subscriber, || {});
    assert!(store.lookup(&count).is_some(), "watching a derived atom must create its dependency too");

    store.unwatch(&doubled, &subscriber);
    assert_eq!(store.lookup(&doubled), None);
    assert_eq!(store.lookup(&count), None, "release must cascade to the now-unreferenced dependency");
}

#[test]
fn a_middle_layer_release_cascades_two_levels_deep() {
    let store = StoreContext::root();
    let a = flavors::value(1);
    let b = flavors::derived_state({
        let a = a.clone();
        move |ctx| ctx.watch(&a) + 1
    });
    let c = flavors::derived_state({
        let b = b.clone();
        move |ctx| ctx.watch(&b) + 1
    });

    let subscriber = store.subscriber();
    store.watch(&c, &subscriber, || {});
    assert!(store.lookup(&a).is_some());
    assert!(store.lookup(&b).is_some());

    store.unwatch(&c, &subscriber);
    assert_eq!(store.lookup(&c), None);
    assert_eq!(store.lookup(&b), None);
    assert_eq!(store.lookup(&a), None);
}

#[test]
fn custom_reset_runs_the_supplied_hook_instead_of_rebuilding_from_value() {
    let store = StoreContext::root();
    let resets = Rc::new(Cell::new(0));
    let r = resets.clone();
    let counter = flavors::custom_resettable(0, move |_coordinator, _ctx| {
        r.set(r.get() + 1);
    });

    store.read(&counter);
    store.set(&counter, 42);
    store.reset_custom(&counter);

    assert_eq!(resets.get(), 1);
    // A custom reset does not touch the cached value on its own.
    assert_eq!(store.read(&counter), 42);
}

#[test]
fn snapshot_restore_rolls_back_to_the_captured_values() {
    let store = StoreContext::root();
    let count = flavors::value(0).keep_alive();
    store.read(&count);

    let snapshot = store.snapshot();
    store.set(&count, 100);
    assert_eq!(store.read(&count), 100);

    snapshot.restore();
    assert_eq!(store.read(&count), 0);
}

#[test]
fn graph_description_lists_every_dependency_edge() {
    let store = StoreContext::root();
    let count = flavors::value(1);
    let doubled = flavors::derived_state({
        let count = count.clone();
        move |ctx| ctx.watch(&count) * 2
    });
    store.read(&doubled);
    let dot = store.snapshot().graph_description();
    assert!(dot.starts_with("digraph atom_store {"));
    assert!(dot.contains("->"));
}

#[tokio::test]
async fn refresh_resolves_to_the_task_output() {
    let store = StoreContext::root();
    let fetched = flavors::task(0, |_ctx| async { 7 });
    assert_eq!(store.refresh(&fetched).await, 7);
}

#[tokio::test]
async fn set_during_an_in_flight_refresh_terminates_it() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let store = StoreContext::root();
            let fetched = flavors::task(0, |_ctx| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                999
            });

            let store_for_task = store.clone();
            let fetched_for_task = fetched.clone();
            let refresh_handle = tokio::task::spawn_local(async move {
                store_for_task.refresh(&fetched_for_task).await
            });

            tokio::task::yield_now().await;
            store.set(&fetched, 9);
            let _ = refresh_handle.await;

            // The superseding `set` must win: the slow refresh's result must
            // never be visible once it resolves after being terminated.
            assert_eq!(store.read(&fetched), 9);
        })
        .await;
}
