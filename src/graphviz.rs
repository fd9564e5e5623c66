//! DOT serialization for `Snapshot::graph_description()` (`spec.md` §6).
//!
//! Nodes and edges are collected into `BTreeSet`s so the output is sorted
//! and deduplicated regardless of the `HashMap` iteration order underneath.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::cache::ErasedCache;
use crate::graph::Graph;
use crate::keys::AtomKey;

pub(crate) fn describe(graph: &Graph, caches: &HashMap<AtomKey, Rc<dyn ErasedCache>>) -> String {
    let mut nodes: BTreeSet<String> = BTreeSet::new();
    let mut edges: BTreeSet<String> = BTreeSet::new();

    for key in caches.keys() {
        nodes.insert(format!("\"{key}\""));
    }
    for (from, tos) in graph.dependencies_iter() {
        for to in tos {
            nodes.insert(format!("\"{from}\""));
            nodes.insert(format!("\"{to}\""));
            edges.insert(format!("\"{from}\" -> \"{to}\";"));
        }
    }

    let mut out = String::from("digraph atom_store {\n  node [shape=box];\n");
    for n in &nodes {
        out.push_str(&format!("  {n};\n"));
    }
    for e in &edges {
        out.push_str(&format!("  {e}\n"));
    }
    out.push_str("}\n");
    out
}
