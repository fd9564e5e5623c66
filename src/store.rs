//! `StoreContext`: the kernel surface (`spec.md` §4.4, §6).
//!
//! A `StoreContext` is a cheap, `Rc`-shared handle onto the shared `Core`
//! (graph, caches, per-key state, subscriptions, observers) plus
//! context-local resolution data (its own scope key, the scope ids it
//! inherits, and its own override table). Cloning a `StoreContext` never
//! copies the underlying maps — every clone of the same lineage sees the
//! same store.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::atom::{Atom, AsyncAtom, ResettableAtom};
use crate::cache::{CacheEntry, ErasedCache};
use crate::context::Context;
use crate::graph::Graph;
use crate::keys::{AtomKey, ScopeId, ScopeKey};
use crate::override_table::{wrap_pub, OverrideSet, OverrideTable};
use crate::snapshot::Snapshot;
use crate::state::StateEntry;
use crate::subscription::{Subscriber, Subscription};
use crate::transaction::Transaction;

#[derive(Default)]
struct Core {
    graph: RefCell<Graph>,
    caches: RefCell<HashMap<AtomKey, Rc<dyn ErasedCache>>>,
    states: RefCell<HashMap<AtomKey, StateEntry>>,
    subscriptions: RefCell<HashMap<AtomKey, HashMap<crate::keys::SubscriberKey, Subscription>>>,
    observers: RefCell<Vec<Rc<dyn Fn(&Snapshot)>>>,
}

struct ContextData {
    core: Rc<Core>,
    scope_key: Option<ScopeKey>,
    scope_id: Option<ScopeId>,
    inherited_scope_keys: HashMap<ScopeId, ScopeKey>,
    overrides: RefCell<OverrideTable>,
}

#[derive(Clone)]
pub struct StoreContext(Rc<ContextData>);

impl StoreContext {
    pub fn root() -> StoreContext {
        StoreContext(Rc::new(ContextData {
            core: Rc::new(Core::default()),
            scope_key: None,
            scope_id: None,
            inherited_scope_keys: HashMap::new(),
            overrides: RefCell::new(OverrideTable::default()),
        }))
    }

    /// Derives a child context scoped under `scope_id`. Atoms declaring that
    /// scope id resolve into a fresh, isolated slice of storage; atoms that
    /// don't declare it behave exactly as in the parent.
    pub fn scoped(&self, scope_id: ScopeId, observers: Vec<Rc<dyn Fn(&Snapshot)>>, overrides: OverrideSet) -> StoreContext {
        let scope_key = ScopeKey::new();
        let mut inherited = self.0.inherited_scope_keys.clone();
        inherited.insert(scope_id.clone(), scope_key);
        for o in observers {
            self.0.core.observers.borrow_mut().push(o);
        }
        StoreContext(Rc::new(ContextData {
            core: self.0.core.clone(),
            scope_key: Some(scope_key),
            scope_id: Some(scope_id),
            inherited_scope_keys: inherited,
            overrides: RefCell::new(overrides.0),
        }))
    }

    /// Derives a child context with the same scope resolution as `self` but
    /// its own observers and overrides — a lightweight nested context, e.g.
    /// for test isolation.
    pub fn inherited(&self, observers: Vec<Rc<dyn Fn(&Snapshot)>>, overrides: OverrideSet) -> StoreContext {
        for o in observers {
            self.0.core.observers.borrow_mut().push(o);
        }
        StoreContext(Rc::new(ContextData {
            core: self.0.core.clone(),
            scope_key: self.0.scope_key,
            scope_id: self.0.scope_id.clone(),
            inherited_scope_keys: self.0.inherited_scope_keys.clone(),
            overrides: RefCell::new(overrides.0),
        }))
    }

    // ---- override registration (root or any context) ----

    pub fn override_atom<A, F>(&self, atom: &A, produce: F)
    where
        A: Atom,
        F: Fn(&Context) -> A::Value + 'static,
    {
        self.0.overrides.borrow_mut().set_by_key::<A>(atom.key(), false, wrap_pub::<A, F>(produce));
    }

    pub fn override_atom_scoped<A, F>(&self, atom: &A, produce: F)
    where
        A: Atom,
        F: Fn(&Context) -> A::Value + 'static,
    {
        self.0.overrides.borrow_mut().set_by_key::<A>(atom.key(), true, wrap_pub::<A, F>(produce));
    }

    pub fn override_type<A, F>(&self, produce: F)
    where
        A: Atom,
        F: Fn(&Context) -> A::Value + 'static,
    {
        self.0.overrides.borrow_mut().set_by_type::<A>(false, wrap_pub::<A, F>(produce));
    }

    pub fn override_type_scoped<A, F>(&self, produce: F)
    where
        A: Atom,
        F: Fn(&Context) -> A::Value + 'static,
    {
        self.0.overrides.borrow_mut().set_by_type::<A>(true, wrap_pub::<A, F>(produce));
    }

    // ---- effective-key resolution (spec.md §4.5) ----

    pub(crate) fn resolve<A: Atom>(&self, atom: &A) -> (AtomKey, Option<crate::override_table::Resolved>) {
        let raw_key = atom.key();
        let resolved = self.0.overrides.borrow().resolve::<A>(&raw_key);
        let scope = match &resolved {
            Some(r) if r.is_scoped => self.0.scope_key,
            _ => atom.scope_id().and_then(|sid| self.0.inherited_scope_keys.get(&sid).copied()),
        };
        (AtomKey::new::<A>(raw_key, scope), resolved)
    }

    pub(crate) fn key_for<A: Atom>(&self, atom: &A) -> AtomKey {
        self.resolve(atom).0
    }

    // ---- public surface ----

    pub fn read<A: Atom>(&self, atom: &A) -> A::Value {
        let key = self.key_for(atom);
        let value = match self.get_cache_value::<A>(&key) {
            Some(v) => v,
            None => self.create_cache(atom, &key),
        };
        // `read` creates no subscription and no graph edge, so a freshly
        // created cache is immediately eligible for release. This means
        // observers may fire twice in a row (create, then release) — this
        // is the documented, intentionally un-coalesced behavior.
        self.check_and_release(&key);
        value
    }

    pub fn lookup<A: Atom>(&self, atom: &A) -> Option<A::Value> {
        let key = self.key_for(atom);
        self.get_cache_value::<A>(&key)
    }

    pub(crate) fn watch_for<A: Atom>(&self, atom: &A, current_key: &AtomKey) -> A::Value {
        let key = self.key_for(atom);
        let value = match self.get_cache_value::<A>(&key) {
            Some(v) => v,
            None => self.create_cache(atom, &key),
        };
        self.0.core.graph.borrow_mut().insert_edge(current_key, &key);
        value
    }

    pub fn subscriber(&self) -> Rc<Subscriber> {
        Subscriber::new(self.clone())
    }

    pub fn watch<A: Atom>(&self, atom: &A, subscriber: &Subscriber, on_update: impl Fn() + 'static) -> A::Value {
        let key = self.key_for(atom);
        let value = match self.get_cache_value::<A>(&key) {
            Some(v) => v,
            None => self.create_cache(atom, &key),
        };
        let is_new = {
            let mut subs = self.0.core.subscriptions.borrow_mut();
            let map = subs.entry(key.clone()).or_default();
            let had = map.contains_key(&subscriber.key());
            map.insert(subscriber.key(), Subscription { update: Rc::new(on_update) });
            !had
        };
        subscriber.track(key.clone());
        if is_new {
            self.notify_observers();
        }
        value
    }

    pub fn unwatch<A: Atom>(&self, atom: &A, subscriber: &Subscriber) {
        let key = self.key_for(atom);
        self.unwatch_key(&key, subscriber.key());
        subscriber.untrack(&key);
    }

    pub(crate) fn unwatch_key(&self, key: &AtomKey, sub: crate::keys::SubscriberKey) {
        let now_empty = {
            let mut subs = self.0.core.subscriptions.borrow_mut();
            match subs.get_mut(key) {
                Some(map) => {
                    map.remove(&sub);
                    map.is_empty()
                }
                None => true,
            }
        };
        if now_empty {
            self.0.core.subscriptions.borrow_mut().remove(key);
        }
        self.check_and_release(key);
    }

    pub fn set<A: Atom>(&self, atom: &A, value: A::Value) {
        let key = self.key_for(atom);
        self.terminate_transaction(&key);
        let keep_alive = match self.0.core.caches.borrow().get(&key) {
            Some(c) => c.keep_alive(),
            None => return, // no cache: set() only replaces an existing value
        };
        self.apply_update(atom, &key, value, keep_alive);
    }

    pub fn modify<A: Atom>(&self, atom: &A, body: impl FnOnce(A::Value) -> A::Value) {
        let key = self.key_for(atom);
        let current = {
            let caches = self.0.core.caches.borrow();
            caches.get(&key).and_then(|c| c.as_any().downcast_ref::<CacheEntry<A>>()).map(|e| (e.value.clone(), e.keep_alive))
        };
        let Some((current, keep_alive)) = current else { return };
        self.terminate_transaction(&key);
        let new_value = body(current);
        self.apply_update(atom, &key, new_value, keep_alive);
    }

    pub fn reset<A: Atom>(&self, atom: &A) {
        let key = self.key_for(atom);
        self.reset_key(atom, &key);
    }

    pub fn reset_custom<A: ResettableAtom>(&self, atom: &A) {
        let key = self.key_for(atom);
        let Some(mut coordinator) = self.take_coordinator::<A>(&key) else { return };
        let ctx = Context::detached(self.clone());
        atom.reset(&mut coordinator, &ctx);
        self.store_coordinator::<A>(&key, coordinator);
    }

    pub async fn refresh<A: AsyncAtom>(&self, atom: &A) -> A::Value {
        let key = self.key_for(atom);
        if self.get_cache_value::<A>(&key).is_none() {
            self.create_cache(atom, &key);
        }

        let txn = self.begin_transaction(&key);
        let cancelled = Rc::new(Cell::new(false));
        {
            let cancelled = cancelled.clone();
            txn.on_termination(move || cancelled.set(true));
        }

        let coordinator = self.take_coordinator::<A>(&key).unwrap_or_else(|| atom.make_coordinator());
        let ctx = Context::for_transaction(self.clone(), key.clone());
        let (new_value, coordinator) = atom.refresh(coordinator, ctx).await;
        self.store_coordinator::<A>(&key, coordinator);
        self.finish_transaction(&key, &txn);

        if cancelled.get() || txn.is_terminated() {
            // Superseded while suspended: discard silently, keep whatever
            // is cached now (spec.md §5/§8 scenario S4).
            return self.get_cache_value::<A>(&key).unwrap_or(new_value);
        }

        let keep_alive = self.0.core.caches.borrow().get(&key).map(|c| c.keep_alive()).unwrap_or(false);
        self.apply_update(atom, &key, new_value.clone(), keep_alive);
        self.get_cache_value::<A>(&key).unwrap_or(new_value)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            store: self.clone(),
            graph: self.0.core.graph.borrow().clone(),
            caches: self.0.core.caches.borrow().clone(),
        }
    }

    pub(crate) fn restore_snapshot(&self, snap: &Snapshot) {
        {
            let mut caches = self.0.core.caches.borrow_mut();
            for (k, v) in snap.caches.iter() {
                caches.insert(k.clone(), v.clone());
            }
        }
        {
            let mut graph = self.0.core.graph.borrow_mut();
            *graph = snap.graph.clone();
        }

        let restored_keys: std::collections::HashSet<AtomKey> = snap.caches.keys().cloned().collect();
        let stale: Vec<AtomKey> = {
            let caches = self.0.core.caches.borrow();
            caches.keys().filter(|k| !restored_keys.contains(*k)).cloned().collect()
        };
        for k in stale {
            self.check_and_release(&k);
        }

        for k in &restored_keys {
            self.notify_subscribers(k);
        }
        self.notify_observers();
    }

    // ---- internal machinery ----

    fn get_cache_value<A: Atom>(&self, key: &AtomKey) -> Option<A::Value> {
        let entry = self.0.core.caches.borrow().get(key).cloned()?;
        match entry.as_any().downcast_ref::<CacheEntry<A>>() {
            Some(e) => Some(e.value.clone()),
            None => {
                let diag = crate::error::Diagnostic::CacheTypeMismatch {
                    key: key.to_string(),
                    expected: std::any::type_name::<A>(),
                };
                tracing::warn!("{diag}");
                self.release_key(key);
                None
            }
        }
    }

    fn store_cache<A: Atom>(&self, key: &AtomKey, entry: CacheEntry<A>) {
        self.0.core.caches.borrow_mut().insert(key.clone(), Rc::new(entry));
    }

    fn take_coordinator<A: Atom>(&self, key: &AtomKey) -> Option<A::Coordinator> {
        let mut states = self.0.core.states.borrow_mut();
        let entry = states.get_mut(key)?;
        let placeholder: Box<dyn Any> = Box::new(());
        let boxed = std::mem::replace(&mut entry.coordinator, placeholder);
        match boxed.downcast::<A::Coordinator>() {
            Ok(c) => Some(*c),
            Err(orig) => {
                entry.coordinator = orig;
                drop(states);
                let diag = crate::error::Diagnostic::CoordinatorTypeMismatch {
                    key: key.to_string(),
                    expected: std::any::type_name::<A::Coordinator>(),
                };
                tracing::warn!("{diag}");
                self.release_key(key);
                None
            }
        }
    }

    fn store_coordinator<A: Atom>(&self, key: &AtomKey, coordinator: A::Coordinator) {
        let mut states = self.0.core.states.borrow_mut();
        match states.get_mut(key) {
            Some(entry) => entry.coordinator = Box::new(coordinator),
            None => {
                states.insert(key.clone(), StateEntry { coordinator: Box::new(coordinator), transaction: None });
            }
        }
    }

    fn terminate_transaction(&self, key: &AtomKey) {
        if let Some(state) = self.0.core.states.borrow().get(key) {
            if let Some(txn) = &state.transaction {
                txn.terminate();
            }
        }
    }

    fn begin_transaction(&self, key: &AtomKey) -> Rc<Transaction> {
        self.terminate_transaction(key);
        let txn = Transaction::new(key.clone());
        {
            let mut states = self.0.core.states.borrow_mut();
            match states.get_mut(key) {
                Some(entry) => entry.transaction = Some(txn.clone()),
                None => {
                    states.insert(key.clone(), StateEntry { coordinator: Box::new(()), transaction: Some(txn.clone()) });
                }
            }
        }
        let previous_deps = self.0.core.graph.borrow_mut().clear_dependencies(key);
        txn.set_previous_dependencies(previous_deps);
        txn
    }

    fn finish_transaction(&self, key: &AtomKey, txn: &Rc<Transaction>) {
        let current_deps = self.0.core.graph.borrow().dependencies_snapshot(key);
        let obsoleted: Vec<AtomKey> = txn.previous_dependencies().difference(&current_deps).cloned().collect();
        {
            let mut states = self.0.core.states.borrow_mut();
            if let Some(state) = states.get_mut(key) {
                if let Some(cur) = &state.transaction {
                    if Rc::ptr_eq(cur, txn) {
                        state.transaction = None;
                    }
                }
            }
        }
        for u in obsoleted {
            self.check_and_release(&u);
        }
    }

    fn compute_value<A: Atom>(&self, atom: &A, coordinator: &mut A::Coordinator, ctx: &Context) -> (A::Value, bool) {
        match self.resolve(atom).1 {
            Some(r) => {
                let boxed = (r.produce)(ctx);
                match boxed.downcast::<A::Value>() {
                    Ok(v) => (atom.manage_overridden(*v, coordinator, ctx), r.is_scoped),
                    Err(_) => {
                        let diag = crate::error::Diagnostic::IllegalOverride {
                            key: format!("{:?}", atom.key()),
                            expected: std::any::type_name::<A::Value>(),
                        };
                        let _ = r.type_name;
                        tracing::warn!("{diag}");
                        (atom.value(coordinator, ctx), false)
                    }
                }
            }
            None => (atom.value(coordinator, ctx), false),
        }
    }

    fn create_cache<A: Atom>(&self, atom: &A, key: &AtomKey) -> A::Value {
        let txn = self.begin_transaction(key);
        let mut coordinator = atom.make_coordinator();
        let ctx = Context::for_transaction(self.clone(), key.clone());
        let (value, scoped_overridden) = self.compute_value(atom, &mut coordinator, &ctx);
        self.store_coordinator::<A>(key, coordinator);
        let keep_alive = atom.keep_alive() && !key.is_scoped() && !scoped_overridden;
        self.store_cache(key, CacheEntry { atom: atom.clone(), value: value.clone(), keep_alive });
        self.finish_transaction(key, &txn);
        self.notify_observers();
        value
    }

    pub(crate) fn reset_key<A: Atom>(&self, atom: &A, key: &AtomKey) {
        if self.get_cache_value::<A>(key).is_none() {
            self.create_cache(atom, key);
            return;
        }
        let txn = self.begin_transaction(key);
        let mut coordinator = self.take_coordinator::<A>(key).unwrap_or_else(|| atom.make_coordinator());
        let ctx = Context::for_transaction(self.clone(), key.clone());
        let (new_value, scoped_overridden) = self.compute_value(atom, &mut coordinator, &ctx);
        self.store_coordinator::<A>(key, coordinator);
        let keep_alive = atom.keep_alive() && !key.is_scoped() && !scoped_overridden;
        self.finish_transaction(key, &txn);
        self.apply_update(atom, key, new_value, keep_alive);
    }

    fn apply_update<A: Atom>(&self, atom: &A, key: &AtomKey, new_value: A::Value, keep_alive: bool) {
        let old_value = self.get_cache_value::<A>(key);
        let should_apply = match &old_value {
            Some(old) => atom.should_update(&new_value, old),
            None => true,
        };
        if !should_apply {
            return;
        }
        self.store_cache(key, CacheEntry { atom: atom.clone(), value: new_value.clone(), keep_alive });

        let store = self.clone();
        let key2 = key.clone();
        let atom2 = atom.clone();
        let new2 = new_value;
        let old2 = old_value;
        atom.perform_update(Box::new(move || {
            store.notify_subscribers(&key2);
            store.reset_children(&key2);
            store.notify_observers();
            if let Some(old) = &old2 {
                let ctx = Context::detached(store.clone());
                atom2.updated(&new2, old, &ctx);
            }
        }));
    }

    fn reset_children(&self, key: &AtomKey) {
        let children = self.0.core.graph.borrow().children_snapshot(key);
        for c in children {
            let cache = self.0.core.caches.borrow().get(&c).cloned();
            if let Some(cache) = cache {
                cache.reevaluate(self, &c);
            }
        }
    }

    fn notify_subscribers(&self, key: &AtomKey) {
        let subs: Vec<Rc<dyn Fn()>> = self
            .0
            .core
            .subscriptions
            .borrow()
            .get(key)
            .map(|m| m.values().map(|s| s.update.clone()).collect())
            .unwrap_or_default();
        for f in subs {
            f();
        }
    }

    fn notify_observers(&self) {
        let observers: Vec<Rc<dyn Fn(&Snapshot)>> = {
            let obs = self.0.core.observers.borrow();
            if obs.is_empty() {
                return;
            }
            obs.clone()
        };
        let snap = self.snapshot();
        for obs in observers {
            obs(&snap);
        }
    }

    fn release_key(&self, key: &AtomKey) {
        if let Some(state) = self.0.core.states.borrow_mut().remove(key) {
            if let Some(txn) = state.transaction {
                txn.terminate();
            }
        }
        self.0.core.caches.borrow_mut().remove(key);
        self.0.core.subscriptions.borrow_mut().remove(key);
        let upstreams = self.0.core.graph.borrow_mut().remove_key(key);
        self.notify_observers();
        for u in upstreams {
            self.check_and_release(&u);
        }
    }

    fn check_and_release(&self, key: &AtomKey) {
        let releasable = {
            let caches = self.0.core.caches.borrow();
            let Some(cache) = caches.get(key) else { return };
            let no_children = !self.0.core.graph.borrow().has_children(key);
            let no_subs = self.0.core.subscriptions.borrow().get(key).map(|m| m.is_empty()).unwrap_or(true);
            !cache.keep_alive() && no_children && no_subs
        };
        if releasable {
            self.release_key(key);
        }
    }
}
