//! Subscribers: external consumers of one or more atoms.
//!
//! A `Subscriber` tracks every key it has ever watched and unsubscribes
//! from all of them when dropped — the idiomatic stand-in for the explicit
//! "unsubscribe" closure the kernel's source design hands back from `sub`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::keys::{AtomKey, SubscriberKey};
use crate::store::StoreContext;

pub(crate) struct Subscription {
    pub update: Rc<dyn Fn()>,
}

pub struct Subscriber {
    key: SubscriberKey,
    store: StoreContext,
    keys: RefCell<HashSet<AtomKey>>,
}

impl Subscriber {
    pub(crate) fn new(store: StoreContext) -> Rc<Self> {
        Rc::new(Subscriber { key: SubscriberKey::new(), store, keys: RefCell::new(HashSet::new()) })
    }

    pub(crate) fn key(&self) -> SubscriberKey {
        self.key
    }

    pub(crate) fn track(&self, key: AtomKey) {
        self.keys.borrow_mut().insert(key);
    }

    pub(crate) fn untrack(&self, key: &AtomKey) {
        self.keys.borrow_mut().remove(key);
    }

    pub fn watched_count(&self) -> usize {
        self.keys.borrow().len()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let keys: Vec<AtomKey> = self.keys.borrow_mut().drain().collect();
        for k in keys {
            self.store.unwatch_key(&k, self.key);
        }
    }
}
