//! Override registration and resolution (`spec.md` §4.1/§4.5).
//!
//! An override replaces an atom's normal `value()` computation with a
//! supplied one. Resolution order, most to least specific: concrete-key
//! scoped, concrete-key unscoped, atom-type scoped, atom-type unscoped.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use crate::atom::Atom;
use crate::context::Context;
use crate::keys::KeyValue;

pub(crate) type ProduceFn = Rc<dyn Fn(&Context) -> Box<dyn Any>>;

struct OverrideEntry {
    produce: ProduceFn,
    type_name: &'static str,
}

pub(crate) struct Resolved {
    pub produce: ProduceFn,
    pub is_scoped: bool,
    pub type_name: &'static str,
}

#[derive(Default)]
pub(crate) struct OverrideTable {
    scoped_by_key: HashMap<(TypeId, KeyValue), OverrideEntry>,
    unscoped_by_key: HashMap<(TypeId, KeyValue), OverrideEntry>,
    scoped_by_type: HashMap<TypeId, OverrideEntry>,
    unscoped_by_type: HashMap<TypeId, OverrideEntry>,
}

impl OverrideTable {
    pub fn set_by_key<A: 'static>(&mut self, key: KeyValue, scoped: bool, produce: ProduceFn) {
        let entry = OverrideEntry { produce, type_name: std::any::type_name::<A>() };
        let map = if scoped { &mut self.scoped_by_key } else { &mut self.unscoped_by_key };
        map.insert((TypeId::of::<A>(), key), entry);
    }

    pub fn set_by_type<A: 'static>(&mut self, scoped: bool, produce: ProduceFn) {
        let entry = OverrideEntry { produce, type_name: std::any::type_name::<A>() };
        let map = if scoped { &mut self.scoped_by_type } else { &mut self.unscoped_by_type };
        map.insert(TypeId::of::<A>(), entry);
    }

    pub fn resolve<A: 'static>(&self, key: &KeyValue) -> Option<Resolved> {
        let type_id = TypeId::of::<A>();
        if let Some(e) = self.scoped_by_key.get(&(type_id, key.clone())) {
            return Some(Resolved { produce: e.produce.clone(), is_scoped: true, type_name: e.type_name });
        }
        if let Some(e) = self.unscoped_by_key.get(&(type_id, key.clone())) {
            return Some(Resolved { produce: e.produce.clone(), is_scoped: false, type_name: e.type_name });
        }
        if let Some(e) = self.scoped_by_type.get(&type_id) {
            return Some(Resolved { produce: e.produce.clone(), is_scoped: true, type_name: e.type_name });
        }
        if let Some(e) = self.unscoped_by_type.get(&type_id) {
            return Some(Resolved { produce: e.produce.clone(), is_scoped: false, type_name: e.type_name });
        }
        None
    }
}

fn wrap<A, F>(produce: F) -> ProduceFn
where
    A: Atom,
    F: Fn(&Context) -> A::Value + 'static,
{
    Rc::new(move |ctx: &Context| -> Box<dyn Any> { Box::new(produce(ctx)) })
}

/// A bundle of override registrations, built fluently and handed to
/// `StoreContext::scoped`/`inherited` at construction time.
#[derive(Default)]
pub struct OverrideSet(pub(crate) OverrideTable);

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom<A, F>(mut self, atom: &A, produce: F) -> Self
    where
        A: Atom,
        F: Fn(&Context) -> A::Value + 'static,
    {
        self.0.set_by_key::<A>(atom.key(), false, wrap::<A, F>(produce));
        self
    }

    pub fn atom_scoped<A, F>(mut self, atom: &A, produce: F) -> Self
    where
        A: Atom,
        F: Fn(&Context) -> A::Value + 'static,
    {
        self.0.set_by_key::<A>(atom.key(), true, wrap::<A, F>(produce));
        self
    }

    pub fn atom_type<A, F>(mut self, produce: F) -> Self
    where
        A: Atom,
        F: Fn(&Context) -> A::Value + 'static,
    {
        self.0.set_by_type::<A>(false, wrap::<A, F>(produce));
        self
    }

    pub fn atom_type_scoped<A, F>(mut self, produce: F) -> Self
    where
        A: Atom,
        F: Fn(&Context) -> A::Value + 'static,
    {
        self.0.set_by_type::<A>(true, wrap::<A, F>(produce));
        self
    }
}

pub(crate) fn wrap_pub<A, F>(produce: F) -> ProduceFn
where
    A: Atom,
    F: Fn(&Context) -> A::Value + 'static,
{
    wrap::<A, F>(produce)
}
