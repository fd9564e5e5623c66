//! Diagnostics for the failure modes the kernel never surfaces as `Result`s.
//!
//! Every operation here (`read`, `set`, `refresh`, ...) returns a plain
//! value, never a `Result` — a cache/coordinator type mismatch or an
//! override whose produced value doesn't match the atom's declared `Value`
//! type can only happen if a caller manufactures colliding keys directly
//! against crate-internal APIs, or mixes up override registrations. Those
//! are logged via `tracing` and treated as a miss/no-op, not propagated.
//! `Diagnostic` exists so call sites have a single, structured shape to log.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Diagnostic {
    #[error("cache entry for {key} has a different concrete type than expected ({expected}); releasing it")]
    CacheTypeMismatch { key: String, expected: &'static str },

    #[error("coordinator for {key} has a different concrete type than expected ({expected}); releasing it")]
    CoordinatorTypeMismatch { key: String, expected: &'static str },

    #[error("override registered for {key} produced a value of the wrong type (expected {expected}); ignoring override")]
    IllegalOverride { key: String, expected: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_render_the_offending_key() {
        let d = Diagnostic::CacheTypeMismatch { key: "Counter:1".into(), expected: "i32" };
        assert!(d.to_string().contains("Counter:1"));
        assert!(d.to_string().contains("i32"));
    }
}
