//! The `Atom` trait: the pluggable "producer" every atom flavor implements.
//!
//! An atom is a descriptor, not a cell — the value is *produced*, not
//! stored, by the atom. Everything the kernel keeps on its behalf (cache,
//! coordinator, in-flight transaction, subscriptions) lives inside
//! `StoreContext`, keyed by the atom's resolved `AtomKey`.

use futures::future::LocalBoxFuture;

use crate::context::Context;
use crate::keys::{KeyValue, ScopeId};

/// A piece of reactive state or a derived computation over other atoms.
///
/// `Value` is what consumers read. `Coordinator` is a long-lived, per-key
/// scratch object the kernel creates once (via [`Atom::make_coordinator`])
/// and hands back to every later synchronous hook by mutable reference — the
/// place to stash e.g. a retry counter or a handle a `refresh` run needs to
/// remember between calls.
pub trait Atom: Clone + 'static {
    type Value: Clone + 'static;
    type Coordinator: 'static;

    /// Identity of this atom within its scope. Defaults to a fresh token
    /// unique to this atom instance; flavors expose `.with_key(...)` to make
    /// several atom instances share identity-by-value (see
    /// `utils::atom_family`).
    fn key(&self) -> KeyValue;

    /// The scope this atom resolves into, absent an override forcing
    /// re-keying. `None` means "root scope only."
    fn scope_id(&self) -> Option<ScopeId> {
        None
    }

    /// Pins this atom's cache alive even with no children or subscribers.
    /// Ignored for scoped atoms and atoms resolved via a scoped override.
    fn keep_alive(&self) -> bool {
        false
    }

    fn debug_label(&self) -> Option<&str> {
        None
    }

    /// Creates this atom's coordinator. Called exactly once per `AtomKey`,
    /// the first time the atom is evaluated.
    fn make_coordinator(&self) -> Self::Coordinator;

    /// Computes the atom's value. May call `ctx.watch(..)` to read (and
    /// depend on) other atoms.
    fn value(&self, coordinator: &mut Self::Coordinator, ctx: &Context) -> Self::Value;

    /// Installs whatever side effects an override-supplied value needs
    /// (e.g. priming a coordinator so later hooks see consistent state) and
    /// returns the value actually stored in the cache.
    fn manage_overridden(
        &self,
        value: Self::Value,
        _coordinator: &mut Self::Coordinator,
        _ctx: &Context,
    ) -> Self::Value {
        value
    }

    /// Equality policy gating propagation: if this returns `false`, the new
    /// value is discarded and dependents are not notified.
    fn should_update(&self, _new: &Self::Value, _old: &Self::Value) -> bool {
        true
    }

    /// Schedules the propagation body. Default: run it synchronously.
    fn perform_update(&self, body: Box<dyn FnOnce() + '_>) {
        body();
    }

    /// Side effect run after a successfully propagated value change.
    fn updated(&self, _new: &Self::Value, _old: &Self::Value, _ctx: &Context) {}
}

/// Opt-in extension for atoms supporting `StoreContext::refresh`.
///
/// `refresh` takes and returns the coordinator *by value* rather than by
/// mutable reference: the returned future must be `'static` to be awaited
/// across a suspension point without holding a kernel-internal borrow, and
/// ownership transfer sidesteps that cleanly.
pub trait AsyncAtom: Atom {
    fn refresh(
        &self,
        coordinator: Self::Coordinator,
        ctx: Context,
    ) -> LocalBoxFuture<'static, (Self::Value, Self::Coordinator)>;
}

/// Opt-in extension for atoms with a user-defined reset hook, bypassing the
/// kernel's generic "rebuild from scratch" reset.
pub trait ResettableAtom: Atom {
    fn reset(&self, coordinator: &mut Self::Coordinator, ctx: &Context);
}
