//! Type-erased cache storage.
//!
//! The store holds one cache slot per `AtomKey`, but different keys name
//! atoms of completely different Rust types. Each slot is stored as
//! `Rc<dyn ErasedCache>`; `CacheEntry<A>` is the concrete payload, and the
//! `as_any` downcast is guarded at every read site per `spec.md` §4.9 — a
//! downcast that fails because a colliding key was manufactured directly
//! against the crate-internal API is treated as a miss and the offending
//! entry is released, not a panic.

use std::any::Any;

use crate::atom::Atom;
use crate::keys::AtomKey;
use crate::store::StoreContext;

pub(crate) trait ErasedCache {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
    fn keep_alive(&self) -> bool;
    /// Re-runs this atom's producer in place, routing the result through the
    /// normal update-propagation path. Used when a dependency changes and
    /// this cache's owning key needs to be recomputed, without the caller
    /// knowing this entry's concrete atom type.
    fn reevaluate(&self, store: &StoreContext, key: &AtomKey);
}

pub(crate) struct CacheEntry<A: Atom> {
    pub atom: A,
    pub value: A::Value,
    pub keep_alive: bool,
}

impl<A: Atom> ErasedCache for CacheEntry<A> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<A>()
    }

    fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    fn reevaluate(&self, store: &StoreContext, key: &AtomKey) {
        store.reset_key(&self.atom, key);
    }
}
