//! Ready-made atom shapes built on top of the `Atom`/`AsyncAtom`/`ResettableAtom`
//! traits: a plain value cell, a derived computation, an async task, and a
//! value cell with a user-defined reset hook.
//!
//! Every flavor follows the same builder shape: a free function constructs
//! it with sensible defaults, and `.with_key(..)`, `.in_scope(..)`,
//! `.keep_alive()`, `.with_label(..)` customize it before use.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::atom::{Atom, AsyncAtom, ResettableAtom};
use crate::context::Context;
use crate::keys::{KeyValue, ScopeId};

#[derive(Clone)]
struct Builder {
    key: Option<KeyValue>,
    scope_id: Option<ScopeId>,
    keep_alive: bool,
    label: Option<Rc<str>>,
}

impl Default for Builder {
    fn default() -> Self {
        // Assigned once here, not lazily in `key()`: every `Atom::key()` call
        // on the same atom value must return the same `KeyValue`, and
        // `KeyValue::auto()` mints a fresh id each time it runs.
        Builder { key: Some(KeyValue::auto()), scope_id: None, keep_alive: false, label: None }
    }
}

/// A plain value cell, computed once from `init` and otherwise held exactly
/// as written by `set`/`modify`.
#[derive(Clone)]
pub struct ValueAtom<T> {
    init: Rc<dyn Fn(&Context) -> T>,
    builder: Rc<Builder>,
}

impl<T: Clone + 'static> ValueAtom<T> {
    pub fn with_key(mut self, key: impl Into<KeyValue>) -> Self {
        Rc::make_mut(&mut self.builder).key = Some(key.into());
        self
    }

    pub fn in_scope(mut self, scope_id: ScopeId) -> Self {
        Rc::make_mut(&mut self.builder).scope_id = Some(scope_id);
        self
    }

    pub fn keep_alive(mut self) -> Self {
        Rc::make_mut(&mut self.builder).keep_alive = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<Rc<str>>) -> Self {
        Rc::make_mut(&mut self.builder).label = Some(label.into());
        self
    }
}

impl<T: Clone + 'static> Atom for ValueAtom<T> {
    type Value = T;
    type Coordinator = ();

    fn key(&self) -> KeyValue {
        self.builder.key.clone().expect("atom key is always assigned by the constructor")
    }

    fn scope_id(&self) -> Option<ScopeId> {
        self.builder.scope_id.clone()
    }

    fn keep_alive(&self) -> bool {
        self.builder.keep_alive
    }

    fn debug_label(&self) -> Option<&str> {
        self.builder.label.as_deref()
    }

    fn make_coordinator(&self) {}

    fn value(&self, _coordinator: &mut (), ctx: &Context) -> T {
        (self.init)(ctx)
    }
}

/// Constructs a [`ValueAtom`] seeded with `initial`.
pub fn value<T: Clone + 'static>(initial: T) -> ValueAtom<T> {
    ValueAtom {
        init: Rc::new(move |_ctx| initial.clone()),
        builder: Rc::new(Builder::default()),
    }
}

/// Constructs a [`ValueAtom`] whose initial value is computed from other
/// atoms via `ctx.watch(..)`. Every later `set`/`modify` replaces it wholesale
/// — this is the "derived on first read, then free-standing" flavor.
pub fn derived<T, F>(init: F) -> ValueAtom<T>
where
    T: Clone + 'static,
    F: Fn(&Context) -> T + 'static,
{
    ValueAtom { init: Rc::new(init), builder: Rc::new(Builder::default()) }
}

/// A fully recomputed derived atom: `compute` reruns from scratch on every
/// dependency change, with no intermediate cached-value carryover beyond
/// what the kernel's own cache provides.
#[derive(Clone)]
pub struct StateAtom<T> {
    compute: Rc<dyn Fn(&Context) -> T>,
    builder: Rc<Builder>,
}

impl<T: Clone + 'static> StateAtom<T> {
    pub fn with_key(mut self, key: impl Into<KeyValue>) -> Self {
        Rc::make_mut(&mut self.builder).key = Some(key.into());
        self
    }

    pub fn in_scope(mut self, scope_id: ScopeId) -> Self {
        Rc::make_mut(&mut self.builder).scope_id = Some(scope_id);
        self
    }

    pub fn keep_alive(mut self) -> Self {
        Rc::make_mut(&mut self.builder).keep_alive = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<Rc<str>>) -> Self {
        Rc::make_mut(&mut self.builder).label = Some(label.into());
        self
    }
}

impl<T: Clone + 'static> Atom for StateAtom<T> {
    type Value = T;
    type Coordinator = ();

    fn key(&self) -> KeyValue {
        self.builder.key.clone().expect("atom key is always assigned by the constructor")
    }

    fn scope_id(&self) -> Option<ScopeId> {
        self.builder.scope_id.clone()
    }

    fn keep_alive(&self) -> bool {
        self.builder.keep_alive
    }

    fn debug_label(&self) -> Option<&str> {
        self.builder.label.as_deref()
    }

    fn make_coordinator(&self) {}

    fn value(&self, _coordinator: &mut (), ctx: &Context) -> T {
        (self.compute)(ctx)
    }
}

/// Constructs a [`StateAtom`] recomputed from `compute` on every dependency
/// change (the classic derived-atom shape).
pub fn derived_state<T, F>(compute: F) -> StateAtom<T>
where
    T: Clone + 'static,
    F: Fn(&Context) -> T + 'static,
{
    StateAtom { compute: Rc::new(compute), builder: Rc::new(Builder::default()) }
}

/// An atom whose value is produced by an asynchronous task, refreshed via
/// `StoreContext::refresh`. The task closure builds the future from the
/// current `Context` each time a refresh is requested; it is stored as a
/// trait object so `TaskAtom` stays `Clone` regardless of what the closure
/// captures.
#[derive(Clone)]
pub struct TaskAtom<T> {
    seed: T,
    task: Rc<dyn Fn(Context) -> LocalBoxFuture<'static, T>>,
    builder: Rc<Builder>,
}

impl<T: Clone + 'static> TaskAtom<T> {
    pub fn with_key(mut self, key: impl Into<KeyValue>) -> Self {
        Rc::make_mut(&mut self.builder).key = Some(key.into());
        self
    }

    pub fn in_scope(mut self, scope_id: ScopeId) -> Self {
        Rc::make_mut(&mut self.builder).scope_id = Some(scope_id);
        self
    }

    pub fn keep_alive(mut self) -> Self {
        Rc::make_mut(&mut self.builder).keep_alive = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<Rc<str>>) -> Self {
        Rc::make_mut(&mut self.builder).label = Some(label.into());
        self
    }
}

impl<T> fmt::Debug for TaskAtom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskAtom").finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> Atom for TaskAtom<T> {
    type Value = T;
    type Coordinator = ();

    fn key(&self) -> KeyValue {
        self.builder.key.clone().expect("atom key is always assigned by the constructor")
    }

    fn scope_id(&self) -> Option<ScopeId> {
        self.builder.scope_id.clone()
    }

    fn keep_alive(&self) -> bool {
        self.builder.keep_alive
    }

    fn debug_label(&self) -> Option<&str> {
        self.builder.label.as_deref()
    }

    fn make_coordinator(&self) {}

    fn value(&self, _coordinator: &mut (), _ctx: &Context) -> T {
        self.seed.clone()
    }
}

impl<T: Clone + 'static> AsyncAtom for TaskAtom<T> {
    fn refresh(&self, coordinator: (), ctx: Context) -> LocalBoxFuture<'static, (T, ())> {
        let fut = (self.task)(ctx);
        Box::pin(async move { (fut.await, coordinator) })
    }
}

/// Constructs a [`TaskAtom`] seeded with `seed` until the first
/// `StoreContext::refresh` call resolves, then driven by `task`.
pub fn task<T, F, Fut>(seed: T, task: F) -> TaskAtom<T>
where
    T: Clone + 'static,
    F: Fn(Context) -> Fut + 'static,
    Fut: std::future::Future<Output = T> + 'static,
{
    TaskAtom {
        seed,
        task: Rc::new(move |ctx: Context| -> LocalBoxFuture<'static, T> { Box::pin(task(ctx)) }),
        builder: Rc::new(Builder::default()),
    }
}

/// A value cell with a user-supplied reset hook, bypassing the kernel's
/// default "rebuild from `value()`" reset when `StoreContext::reset_custom`
/// is called. Both closures are stored as trait objects, the same reason
/// as [`TaskAtom`]: so `Clone` doesn't pick up a spurious bound on whatever
/// they capture.
#[derive(Clone)]
pub struct CustomResettableAtom<T> {
    init: Rc<dyn Fn(&Context) -> T>,
    reset_fn: Rc<dyn Fn(&Cell<Option<T>>, &Context)>,
    builder: Rc<Builder>,
}

impl<T: Clone + 'static> CustomResettableAtom<T> {
    pub fn with_key(mut self, key: impl Into<KeyValue>) -> Self {
        Rc::make_mut(&mut self.builder).key = Some(key.into());
        self
    }

    pub fn in_scope(mut self, scope_id: ScopeId) -> Self {
        Rc::make_mut(&mut self.builder).scope_id = Some(scope_id);
        self
    }

    pub fn keep_alive(mut self) -> Self {
        Rc::make_mut(&mut self.builder).keep_alive = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<Rc<str>>) -> Self {
        Rc::make_mut(&mut self.builder).label = Some(label.into());
        self
    }
}

impl<T: Clone + 'static> Atom for CustomResettableAtom<T> {
    type Value = T;
    type Coordinator = Cell<Option<T>>;

    fn key(&self) -> KeyValue {
        self.builder.key.clone().expect("atom key is always assigned by the constructor")
    }

    fn scope_id(&self) -> Option<ScopeId> {
        self.builder.scope_id.clone()
    }

    fn keep_alive(&self) -> bool {
        self.builder.keep_alive
    }

    fn debug_label(&self) -> Option<&str> {
        self.builder.label.as_deref()
    }

    fn make_coordinator(&self) -> Cell<Option<T>> {
        Cell::new(None)
    }

    fn value(&self, _coordinator: &mut Cell<Option<T>>, ctx: &Context) -> T {
        (self.init)(ctx)
    }
}

impl<T: Clone + 'static> ResettableAtom for CustomResettableAtom<T> {
    fn reset(&self, coordinator: &mut Cell<Option<T>>, ctx: &Context) {
        (self.reset_fn)(coordinator, ctx);
    }
}

/// Constructs a [`CustomResettableAtom`] seeded with `initial` whose reset
/// behavior is `on_reset` instead of the kernel's default rebuild.
pub fn custom_resettable<T, R>(initial: T, on_reset: R) -> CustomResettableAtom<T>
where
    T: Clone + 'static,
    R: Fn(&Cell<Option<T>>, &Context) + 'static,
{
    CustomResettableAtom {
        init: Rc::new(move |_ctx| initial.clone()),
        reset_fn: Rc::new(on_reset),
        builder: Rc::new(Builder::default()),
    }
}
