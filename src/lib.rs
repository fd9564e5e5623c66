//! A reactive atom store kernel.
//!
//! An *atom* is a descriptor of a piece of state or a derived computation —
//! not a cell. A [`StoreContext`] is where values actually live: it
//! evaluates atoms lazily, tracks the dependency graph formed by
//! `Context::watch` calls, propagates changes to dependents, and releases
//! cache entries that no longer have any subscriber or dependent keeping
//! them alive.
//!
//! ## Core concepts
//!
//! - **Atoms** implement [`atom::Atom`] (and optionally [`atom::AsyncAtom`]
//!   or [`atom::ResettableAtom`]); [`flavors`] provides ready-made shapes
//!   (`value`, `derived_state`, `task`, `custom_resettable`) so most callers
//!   never implement the trait directly.
//! - **`StoreContext`** is the runtime: `read`, `watch`, `set`, `modify`,
//!   `refresh`, `reset` and scope/override construction all live on it.
//! - **Scopes** let the same atom type resolve into isolated storage per
//!   scope instance, via `StoreContext::scoped`.
//! - **Overrides** replace an atom's computation at the type or instance
//!   level, for tests or environment-specific wiring.
//! - **Snapshots** are cheap point-in-time views supporting restore and DOT
//!   graph export.
//!
//! ```
//! use atomstore::{flavors, StoreContext};
//!
//! let store = StoreContext::root();
//! let count = flavors::value(0);
//! let doubled = flavors::derived_state({
//!     let count = count.clone();
//!     move |ctx| ctx.watch(&count) * 2
//! });
//!
//! assert_eq!(store.read(&doubled), 0);
//! store.set(&count, 5);
//! assert_eq!(store.read(&doubled), 10);
//! ```

pub mod atom;
pub mod cache;
pub mod context;
pub mod error;
pub mod flavors;
pub mod graph;
mod graphviz;
pub mod keys;
pub mod override_table;
pub mod snapshot;
mod state;
pub mod store;
pub mod subscription;
mod transaction;
pub mod utils;

pub use atom::{AsyncAtom, Atom, ResettableAtom};
pub use context::Context;
pub use error::Diagnostic;
pub use keys::{AtomKey, KeyValue, ScopeId};
pub use override_table::OverrideSet;
pub use snapshot::Snapshot;
pub use store::StoreContext;
pub use subscription::Subscriber;

pub use utils::atom_family::atom_family;
pub use utils::select_atom::{select_atom, select_atom_default};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_store_constructs() {
        let store = StoreContext::root();
        let counter = flavors::value(0);
        assert_eq!(store.read(&counter), 0);
    }
}
