//! Stable identity for atoms, subscribers, scopes, and overrides.
//!
//! Every kernel map is keyed by one of the types in this module. [`AtomKey`]
//! is the only key the graph, state table, and override table ever see; it
//! folds together an atom's Rust type, its user-facing identity, and (when
//! present) the scope it resolved into.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::rc::Rc;

/// Process-wide monotonic counter backing default atom/scope/subscriber identity.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Type-erased `Eq + Hash` value, the user-facing half of an `AtomKey`.
///
/// Atoms default to a fresh [`next_id`] token, which is always unique, so
/// two atoms never collide unless a caller opts into sharing identity via
/// `.with_key(...)` (as `utils::atom_family` does internally).
trait DynKey: Any {
    fn dyn_eq(&self, other: &dyn DynKey) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
    fn dyn_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn as_any(&self) -> &dyn Any;
}

impl<T> DynKey for T
where
    T: Any + Eq + Hash + fmt::Debug,
{
    fn dyn_eq(&self, other: &dyn DynKey) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }

    fn dyn_hash(&self, state: &mut dyn Hasher) {
        use std::collections::hash_map::DefaultHasher;
        let mut inner = DefaultHasher::new();
        TypeId::of::<T>().hash(&mut inner);
        Hash::hash(self, &mut inner);
        state.write_u64(inner.finish());
    }

    fn dyn_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A type-erased, cheaply clonable identity value.
#[derive(Clone)]
pub struct KeyValue(Rc<dyn DynKey>);

impl KeyValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Eq + Hash + fmt::Debug,
    {
        KeyValue(Rc::new(value))
    }

    pub(crate) fn auto() -> Self {
        KeyValue::new(next_id())
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(other.0.as_ref())
    }
}
impl Eq for KeyValue {}

impl Hash for KeyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.dyn_hash(state)
    }
}

impl fmt::Debug for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.dyn_debug(f)
    }
}

/// Unique token identifying one scope instance. Distinct from the
/// user-facing [`ScopeId`] so two nested scopes sharing a `ScopeId` still
/// resolve to independent storage.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeKey(u64);

impl ScopeKey {
    pub fn new() -> Self {
        ScopeKey(next_id())
    }
}

impl Default for ScopeKey {
    fn default() -> Self {
        ScopeKey::new()
    }
}

/// User-chosen scope identifier, e.g. a feature name or a test case id.
pub type ScopeId = KeyValue;

/// Key identifying one subscriber within an atom's subscription map.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriberKey(u64);

impl SubscriberKey {
    pub fn new() -> Self {
        SubscriberKey(next_id())
    }
}

impl Default for SubscriberKey {
    fn default() -> Self {
        SubscriberKey::new()
    }
}

/// `(atom type, atom identity, scope)` — the sole map key used throughout
/// the kernel for caches, state, subscriptions, and graph edges.
#[derive(Clone)]
pub struct AtomKey {
    type_tag: TypeId,
    type_name: &'static str,
    key: KeyValue,
    scope: Option<ScopeKey>,
}

impl AtomKey {
    pub(crate) fn new<A: 'static>(key: KeyValue, scope: Option<ScopeKey>) -> Self {
        AtomKey {
            type_tag: TypeId::of::<A>(),
            type_name: std::any::type_name::<A>(),
            key,
            scope,
        }
    }

    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    pub fn scope(&self) -> Option<ScopeKey> {
        self.scope
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for AtomKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_tag == other.type_tag && self.scope == other.scope && self.key == other.key
    }
}
impl Eq for AtomKey {}

impl Hash for AtomKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_tag.hash(state);
        self.scope.hash(state);
        self.key.hash(state);
    }
}

impl fmt::Debug for AtomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomKey")
            .field("type", &self.type_name)
            .field("key", &self.key)
            .field("scope", &self.scope)
            .finish()
    }
}

impl fmt::Display for AtomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(scope) => write!(f, "{}:{:?}@{:?}", short_name(self.type_name), self.key, scope),
            None => write!(f, "{}:{:?}", short_name(self.type_name), self.key),
        }
    }
}

fn short_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MarkerA;
    struct MarkerB;

    #[test]
    fn auto_keys_are_unique() {
        let a = KeyValue::auto();
        let b = KeyValue::auto();
        assert_ne!(a, b);
    }

    #[test]
    fn same_type_same_key_same_scope_are_equal() {
        let k = KeyValue::new(7i32);
        let a = AtomKey::new::<MarkerA>(k.clone(), None);
        let b = AtomKey::new::<MarkerA>(k, None);
        assert_eq!(a, b);
    }

    #[test]
    fn different_atom_types_never_collide_even_with_equal_key_value() {
        let k = KeyValue::new(7i32);
        let a = AtomKey::new::<MarkerA>(k.clone(), None);
        let b = AtomKey::new::<MarkerB>(k, None);
        assert_ne!(a, b);
    }

    #[test]
    fn scope_distinguishes_otherwise_equal_keys() {
        let k = KeyValue::new(1i32);
        let scope = ScopeKey::new();
        let unscoped = AtomKey::new::<MarkerA>(k.clone(), None);
        let scoped = AtomKey::new::<MarkerA>(k, Some(scope));
        assert_ne!(unscoped, scoped);
        assert!(scoped.is_scoped());
        assert!(!unscoped.is_scoped());
    }
}
