//! A derived atom that selects and memoizes a slice of another atom's
//! value, only producing a new value when the slice itself changes —
//! avoids re-deriving everything downstream just because an unrelated part
//! of a larger atom changed.

use std::cell::RefCell;
use std::rc::Rc;

use crate::atom::Atom;
use crate::flavors::{self, StateAtom};

/// Builds a derived atom over `source` that applies `selector` to its value
/// and only changes when `equal` says the newly selected slice differs from
/// the previously memoized one.
pub fn select_atom<A, S, Sel, Eqf>(source: A, selector: Sel, equal: Eqf) -> StateAtom<S>
where
    A: Atom,
    S: Clone + 'static,
    Sel: Fn(&A::Value) -> S + 'static,
    Eqf: Fn(&S, &S) -> bool + 'static,
{
    let memo: Rc<RefCell<Option<S>>> = Rc::new(RefCell::new(None));
    flavors::derived_state(move |ctx| {
        let value = ctx.watch(&source);
        let selected = selector(&value);
        let mut memo = memo.borrow_mut();
        if let Some(prev) = memo.as_ref() {
            if equal(prev, &selected) {
                return prev.clone();
            }
        }
        *memo = Some(selected.clone());
        selected
    })
}

/// [`select_atom`] using `PartialEq` as the slice-equality check.
pub fn select_atom_default<A, S, Sel>(source: A, selector: Sel) -> StateAtom<S>
where
    A: Atom,
    S: Clone + PartialEq + 'static,
    Sel: Fn(&A::Value) -> S + 'static,
{
    select_atom(source, selector, |a, b| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavors;
    use crate::store::StoreContext;

    #[derive(Clone, PartialEq, Debug)]
    struct Pair(i32, i32);

    #[test]
    fn select_atom_follows_source_changes() {
        let store = StoreContext::root();
        let source = flavors::value(Pair(1, 2));
        let first = select_atom_default(source.clone(), |p: &Pair| p.0);

        assert_eq!(store.read(&first), 1);
        store.set(&source, Pair(9, 2));
        assert_eq!(store.read(&first), 9);
    }

    #[test]
    fn select_atom_memoizes_when_the_slice_is_unchanged() {
        let store = StoreContext::root();
        let source = flavors::value(Pair(1, 2));
        let first = select_atom_default(source.clone(), |p: &Pair| p.0);

        assert_eq!(store.read(&first), 1);
        store.set(&source, Pair(1, 99));
        assert_eq!(store.read(&first), 1);
    }
}
