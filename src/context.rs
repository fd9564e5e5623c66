//! `Context`: what a producer hook sees.
//!
//! Built fresh for each hook invocation. Inside `value`/`manage_overridden`
//! (and the future returned by `refresh`) it carries the currently
//! evaluating atom's key, so `watch` records a dependency edge; everywhere
//! else (`updated`, a custom `reset`) it carries no current key, so `watch`
//! degrades to a plain `read`.

use crate::atom::Atom;
use crate::keys::AtomKey;
use crate::store::StoreContext;

#[derive(Clone)]
pub struct Context {
    store: StoreContext,
    current: Option<AtomKey>,
}

impl Context {
    pub(crate) fn for_transaction(store: StoreContext, key: AtomKey) -> Self {
        Context { store, current: Some(key) }
    }

    pub(crate) fn detached(store: StoreContext) -> Self {
        Context { store, current: None }
    }

    /// Reads `atom`, recording a dependency edge from the atom currently
    /// being evaluated (if any). Outside of a producer evaluation this is
    /// equivalent to `read`.
    pub fn watch<A: Atom>(&self, atom: &A) -> A::Value {
        match &self.current {
            Some(key) => self.store.watch_for(atom, key),
            None => self.store.read(atom),
        }
    }

    /// Reads `atom` without recording a dependency edge.
    pub fn read<A: Atom>(&self, atom: &A) -> A::Value {
        self.store.read(atom)
    }

    pub fn lookup<A: Atom>(&self, atom: &A) -> Option<A::Value> {
        self.store.lookup(atom)
    }

    pub fn set<A: Atom>(&self, atom: &A, value: A::Value) {
        self.store.set(atom, value)
    }

    pub fn modify<A: Atom>(&self, atom: &A, body: impl FnOnce(A::Value) -> A::Value) {
        self.store.modify(atom, body)
    }

    pub fn reset<A: Atom>(&self, atom: &A) {
        self.store.reset(atom)
    }

    pub fn store(&self) -> &StoreContext {
        &self.store
    }
}
