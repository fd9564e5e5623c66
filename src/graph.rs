//! The dependency graph: who reads whom.
//!
//! `dependencies[k]` and `children[k]` are kept as mirror images of each
//! other at all times — every mutation here updates both sides in the same
//! call, which is what property 1 (graph symmetry) checks.

use std::collections::{HashMap, HashSet};

use crate::keys::AtomKey;

#[derive(Default, Clone)]
pub(crate) struct Graph {
    dependencies: HashMap<AtomKey, HashSet<AtomKey>>,
    children: HashMap<AtomKey, HashSet<AtomKey>>,
}

impl Graph {
    pub fn insert_edge(&mut self, from: &AtomKey, to: &AtomKey) {
        self.dependencies.entry(from.clone()).or_default().insert(to.clone());
        self.children.entry(to.clone()).or_default().insert(from.clone());
    }

    /// Drops every dependency edge originating at `key`, returning the set
    /// that was removed. Called at the start of a transaction so the run can
    /// rebuild `dependencies[key]` from scratch via `insert_edge`.
    pub fn clear_dependencies(&mut self, key: &AtomKey) -> HashSet<AtomKey> {
        let prev = self.dependencies.remove(key).unwrap_or_default();
        for p in &prev {
            if let Some(s) = self.children.get_mut(p) {
                s.remove(key);
                if s.is_empty() {
                    self.children.remove(p);
                }
            }
        }
        prev
    }

    /// Removes `key` entirely from the graph (both as a dependent and, if it
    /// has no children left, as an upstream), returning its former
    /// dependencies so the caller can cascade `checkAndRelease`.
    pub fn remove_key(&mut self, key: &AtomKey) -> HashSet<AtomKey> {
        let deps = self.clear_dependencies(key);
        self.children.remove(key);
        deps
    }

    pub fn dependencies_snapshot(&self, key: &AtomKey) -> HashSet<AtomKey> {
        self.dependencies.get(key).cloned().unwrap_or_default()
    }

    pub fn children_snapshot(&self, key: &AtomKey) -> HashSet<AtomKey> {
        self.children.get(key).cloned().unwrap_or_default()
    }

    pub fn has_children(&self, key: &AtomKey) -> bool {
        self.children.get(key).is_some_and(|s| !s.is_empty())
    }

    pub fn dependencies_iter(&self) -> impl Iterator<Item = (&AtomKey, &HashSet<AtomKey>)> {
        self.dependencies.iter()
    }

    #[cfg(test)]
    pub fn assert_symmetric(&self) {
        for (from, tos) in &self.dependencies {
            for to in tos {
                assert!(
                    self.children.get(to).is_some_and(|s| s.contains(from)),
                    "dependency edge {:?} -> {:?} has no mirrored child edge",
                    from,
                    to
                );
            }
        }
        for (to, froms) in &self.children {
            for from in froms {
                assert!(
                    self.dependencies.get(from).is_some_and(|s| s.contains(to)),
                    "child edge {:?} <- {:?} has no mirrored dependency edge",
                    to,
                    from
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyValue;

    struct Marker;

    fn key(n: i32) -> AtomKey {
        AtomKey::new::<Marker>(KeyValue::new(n), None)
    }

    #[test]
    fn insert_edge_is_mirrored() {
        let mut g = Graph::default();
        let (a, b) = (key(1), key(2));
        g.insert_edge(&a, &b);
        assert!(g.dependencies_snapshot(&a).contains(&b));
        assert!(g.children_snapshot(&b).contains(&a));
        g.assert_symmetric();
    }

    #[test]
    fn clear_dependencies_removes_mirrored_child_entries() {
        let mut g = Graph::default();
        let (a, b, c) = (key(1), key(2), key(3));
        g.insert_edge(&a, &b);
        g.insert_edge(&a, &c);
        let removed = g.clear_dependencies(&a);
        assert_eq!(removed.len(), 2);
        assert!(!g.has_children(&b));
        assert!(!g.has_children(&c));
        g.assert_symmetric();
    }

    #[test]
    fn remove_key_drops_both_directions() {
        let mut g = Graph::default();
        let (a, b) = (key(1), key(2));
        g.insert_edge(&a, &b);
        let deps = g.remove_key(&a);
        assert!(deps.contains(&b));
        assert!(g.dependencies_snapshot(&a).is_empty());
        assert!(!g.has_children(&b));
    }
}
