//! Helpers built on top of the core `Atom` trait: parameterized atom
//! families and memoized slice-selection over another atom.

pub mod atom_family;
pub mod select_atom;
