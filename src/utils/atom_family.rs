//! A factory that creates and caches atoms keyed by a parameter — the
//! idiomatic way to get a dynamic collection of atoms (e.g. "the todo atom
//! for id N") without hand-rolling the bookkeeping each time.
//!
//! Unlike the kernel's own `.with_key(..)` (which only changes how one
//! already-constructed atom resolves), `AtomFamily` owns *constructing* a
//! new atom instance the first time a given parameter is seen and hands
//! back the same instance (by value — atoms are cheap `Clone` descriptors)
//! on every later call with an equal parameter.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use crate::atom::Atom;

struct Inner<P, A, F> {
    initialize: F,
    cache: RefCell<HashMap<P, A>>,
}

/// Created by [`atom_family`]. Cloning an `AtomFamily` shares the same
/// underlying cache (cheap `Rc` clone).
pub struct AtomFamily<P, A, F>(Rc<Inner<P, A, F>>);

impl<P, A, F> Clone for AtomFamily<P, A, F> {
    fn clone(&self) -> Self {
        AtomFamily(self.0.clone())
    }
}

impl<P, A, F> AtomFamily<P, A, F>
where
    P: Clone + Eq + Hash + 'static,
    A: Atom,
    F: Fn(P) -> A,
{
    /// Returns the atom for `param`, constructing and caching it on first
    /// use.
    pub fn get(&self, param: P) -> A {
        if let Some(existing) = self.0.cache.borrow().get(&param) {
            return existing.clone();
        }
        let created = (self.0.initialize)(param.clone());
        self.0.cache.borrow_mut().insert(param, created.clone());
        created
    }

    /// Every parameter an atom has been created for so far.
    pub fn params(&self) -> Vec<P> {
        self.0.cache.borrow().keys().cloned().collect()
    }

    /// Drops the cached atom for `param`. A later `get` with the same
    /// parameter constructs a fresh instance.
    pub fn remove(&self, param: &P) {
        self.0.cache.borrow_mut().remove(param);
    }

    pub fn len(&self) -> usize {
        self.0.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.cache.borrow().is_empty()
    }
}

/// Builds an [`AtomFamily`] that constructs one atom per distinct parameter
/// via `initialize`.
pub fn atom_family<P, A, F>(initialize: F) -> AtomFamily<P, A, F>
where
    P: Clone + Eq + Hash + 'static,
    A: Atom,
    F: Fn(P) -> A,
{
    AtomFamily(Rc::new(Inner { initialize, cache: RefCell::new(HashMap::new()) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavors;
    use crate::keys::KeyValue;

    #[test]
    fn same_param_returns_the_same_cached_atom() {
        let family = atom_family(|id: i32| flavors::value(id * 10).with_key(KeyValue::new(id)));
        let a = family.get(1);
        let b = family.get(1);
        assert_eq!(a.key(), b.key());
        assert_eq!(family.len(), 1);
    }

    #[test]
    fn distinct_params_get_distinct_atoms() {
        let family = atom_family(|id: i32| flavors::value(id * 10).with_key(KeyValue::new(id)));
        let a = family.get(1);
        let b = family.get(2);
        assert_ne!(a.key(), b.key());
        assert_eq!(family.params().len(), 2);
    }

    #[test]
    fn remove_forces_recreation() {
        let family = atom_family(|id: i32| flavors::value(id).with_key(KeyValue::new(id)));
        family.get(1);
        family.remove(&1);
        assert!(family.is_empty());
    }
}
