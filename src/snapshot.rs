//! Point-in-time, immutable view of the store (`spec.md` §3/§4.8).
//!
//! Cache entries are never mutated in place — every write replaces the
//! `Rc<dyn ErasedCache>` at a key with a fresh one — so a cloned `HashMap` of
//! those `Rc`s is already a correct shallow snapshot: later writes to the
//! live store can't reach back and mutate what this snapshot is holding.

use std::collections::HashMap;
use std::rc::Rc;

use crate::atom::Atom;
use crate::cache::{CacheEntry, ErasedCache};
use crate::graph::Graph;
use crate::keys::AtomKey;
use crate::store::StoreContext;

#[derive(Clone)]
pub struct Snapshot {
    pub(crate) store: StoreContext,
    pub(crate) graph: Graph,
    pub(crate) caches: HashMap<AtomKey, Rc<dyn ErasedCache>>,
}

impl Snapshot {
    pub fn lookup<A: Atom>(&self, atom: &A) -> Option<A::Value> {
        let key = self.store.key_for(atom);
        self.caches
            .get(&key)
            .and_then(|c| c.as_any().downcast_ref::<CacheEntry<A>>())
            .map(|e| e.value.clone())
    }

    /// Rolls the live store's graph and caches back to this snapshot,
    /// releasing any key that was cached live but is absent from the
    /// snapshot, then firing each restored key's current subscriptions once.
    pub fn restore(&self) {
        self.store.restore_snapshot(self);
    }

    pub fn graph_description(&self) -> String {
        crate::graphviz::describe(&self.graph, &self.caches)
    }
}
