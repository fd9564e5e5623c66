use criterion::{criterion_group, criterion_main, Criterion};

use atomstore::{flavors, StoreContext};

fn watch_and_set(c: &mut Criterion) {
    c.bench_function("watch then set a plain value atom", |b| {
        b.iter(|| {
            let store = StoreContext::root();
            let counter = flavors::value(0);
            let subscriber = store.subscriber();
            store.watch(&counter, &subscriber, || {});
            for i in 0..100 {
                store.set(&counter, i);
            }
        });
    });
}

fn propagation_depth(c: &mut Criterion) {
    c.bench_function("propagate through a 50-deep derived chain", |b| {
        b.iter(|| {
            let store = StoreContext::root();
            let root = flavors::value(1);
            let mut current = flavors::derived_state({
                let root = root.clone();
                move |ctx| ctx.watch(&root) + 1
            });
            for _ in 0..49 {
                let prev = current.clone();
                current = flavors::derived_state(move |ctx| ctx.watch(&prev) + 1);
            }
            let subscriber = store.subscriber();
            store.watch(&current, &subscriber, || {});
            store.set(&root, 2);
            let _ = store.read(&current);
        });
    });
}

fn read_only_no_retention(c: &mut Criterion) {
    c.bench_function("repeated unwatched reads of a derived atom", |b| {
        let store = StoreContext::root();
        let source = flavors::value(1);
        let doubled = flavors::derived_state({
            let source = source.clone();
            move |ctx| ctx.watch(&source) * 2
        });
        b.iter(|| {
            store.read(&doubled);
        });
    });
}

criterion_group!(benches, watch_and_set, propagation_depth, read_only_no_retention);
criterion_main!(benches);
