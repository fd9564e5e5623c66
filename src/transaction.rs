//! The in-flight evaluation of one atom.
//!
//! A `Transaction` exists for the lifetime of a single `value`/`refresh`
//! call. Creating a new one for a key terminates whatever transaction was
//! previously running for that key, which is how a `set` or a superseding
//! `refresh` cancels a stale async recompute (see `StoreContext::refresh`).

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use crate::keys::AtomKey;

pub(crate) struct Transaction {
    key: AtomKey,
    terminated: Cell<bool>,
    callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
    previous_dependencies: RefCell<HashSet<AtomKey>>,
}

impl Transaction {
    pub fn new(key: AtomKey) -> Rc<Self> {
        Rc::new(Transaction {
            key,
            terminated: Cell::new(false),
            callbacks: RefCell::new(Vec::new()),
            previous_dependencies: RefCell::new(HashSet::new()),
        })
    }

    pub fn key(&self) -> &AtomKey {
        &self.key
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.get()
    }

    /// Idempotent: terminating an already-terminated transaction is a no-op.
    pub fn terminate(&self) {
        if self.terminated.replace(true) {
            return;
        }
        let callbacks = std::mem::take(&mut *self.callbacks.borrow_mut());
        for cb in callbacks {
            cb();
        }
    }

    /// Registers a cancellation callback. If the transaction is already
    /// terminated, the callback runs immediately.
    pub fn on_termination(&self, f: impl FnOnce() + 'static) {
        if self.is_terminated() {
            f();
            return;
        }
        self.callbacks.borrow_mut().push(Box::new(f));
    }

    pub fn set_previous_dependencies(&self, deps: HashSet<AtomKey>) {
        *self.previous_dependencies.borrow_mut() = deps;
    }

    pub fn previous_dependencies(&self) -> HashSet<AtomKey> {
        self.previous_dependencies.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyValue;

    struct Marker;

    #[test]
    fn terminate_runs_callbacks_exactly_once() {
        let txn = Transaction::new(AtomKey::new::<Marker>(KeyValue::new(1i32), None));
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        txn.on_termination(move || c.set(c.get() + 1));
        txn.terminate();
        txn.terminate();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn on_termination_after_terminate_runs_immediately() {
        let txn = Transaction::new(AtomKey::new::<Marker>(KeyValue::new(1i32), None));
        txn.terminate();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        txn.on_termination(move || r.set(true));
        assert!(ran.get());
    }
}
