//! The relationship graph between named variables.
//!
//! Undirected edges record that two names ever met in an emotional
//! expression (or a function call); directed relations carry the
//! behavioural links (`hates`, `fears`, ...).

use sanity_types::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    Hates,
    Fears,
    Envies,
    Ignores,
    Mirrors,
    Haunts,
}

impl Relation {
    pub const ALL: [Relation; 6] = [
        Relation::Hates,
        Relation::Fears,
        Relation::Envies,
        Relation::Ignores,
        Relation::Mirrors,
        Relation::Haunts,
    ];
}

#[derive(Debug, Default)]
pub struct RelationshipGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
    relations: BTreeMap<Relation, BTreeMap<String, BTreeSet<String>>>,
    /// Mirror writes armed at the end of one statement, applied at the end
    /// of the next: mirrorer → value.
    pending_mirrors: BTreeMap<String, Value>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Undirected edges ──

    pub fn add_edge(&mut self, a: &str, b: &str) {
        self.edges.entry(a.to_string()).or_default().insert(b.to_string());
        self.edges.entry(b.to_string()).or_default().insert(a.to_string());
    }

    pub fn remove_edge(&mut self, a: &str, b: &str) {
        if let Some(set) = self.edges.get_mut(a) {
            set.remove(b);
        }
        if let Some(set) = self.edges.get_mut(b) {
            set.remove(a);
        }
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.edges.get(a).is_some_and(|set| set.contains(b))
    }

    pub fn neighbours(&self, name: &str) -> Vec<String> {
        self.edges
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn degree(&self, name: &str) -> usize {
        self.edges.get(name).map_or(0, BTreeSet::len)
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Every edge once, as `(a, b)` with `a < b`.
    pub fn all_edges(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (a, set) in &self.edges {
            for b in set {
                if a < b {
                    out.push((a.clone(), b.clone()));
                }
            }
        }
        out
    }

    /// Names present in the graph that currently have no edges.
    pub fn isolated(&self) -> Vec<String> {
        self.edges
            .iter()
            .filter(|(_, set)| set.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Breadth-first hop count, or `None` when unreachable.
    pub fn distance(&self, from: &str, to: &str) -> Option<usize> {
        if from == to {
            return Some(0);
        }
        let mut seen = BTreeSet::from([from.to_string()]);
        let mut queue = VecDeque::from([(from.to_string(), 0usize)]);
        while let Some((node, depth)) = queue.pop_front() {
            for next in self.edges.get(&node).into_iter().flatten() {
                if next == to {
                    return Some(depth + 1);
                }
                if seen.insert(next.clone()) {
                    queue.push_back((next.clone(), depth + 1));
                }
            }
        }
        None
    }

    // ── Directed relations ──

    pub fn relate(&mut self, rel: Relation, from: &str, to: &str) {
        self.relations
            .entry(rel)
            .or_default()
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    pub fn relates(&self, rel: Relation, from: &str, to: &str) -> bool {
        self.targets_ref(rel, from).is_some_and(|set| set.contains(to))
    }

    fn targets_ref(&self, rel: Relation, from: &str) -> Option<&BTreeSet<String>> {
        self.relations.get(&rel).and_then(|m| m.get(from))
    }

    /// Names `from` holds `rel` towards.
    pub fn targets(&self, rel: Relation, from: &str) -> Vec<String> {
        self.targets_ref(rel, from)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Names that hold `rel` towards `to`.
    pub fn sources(&self, rel: Relation, to: &str) -> Vec<String> {
        self.relations
            .get(&rel)
            .map(|m| {
                m.iter()
                    .filter(|(_, set)| set.contains(to))
                    .map(|(from, _)| from.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All `(mirrorer, target)` pairs.
    pub fn mirror_pairs(&self) -> Vec<(String, String)> {
        self.relations
            .get(&Relation::Mirrors)
            .map(|m| {
                m.iter()
                    .flat_map(|(from, set)| set.iter().map(move |to| (from.clone(), to.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The first pair of names, one from each side, linked by `ignores` in
    /// either direction.
    pub fn ignores_conflict(&self, left: &[String], right: &[String]) -> Option<(String, String)> {
        for a in left {
            for b in right {
                if self.relates(Relation::Ignores, a, b) || self.relates(Relation::Ignores, b, a) {
                    return Some((a.clone(), b.clone()));
                }
            }
        }
        None
    }

    /// Drop every directed link between `a` and `b`, and their edge.
    pub fn forget_pair(&mut self, a: &str, b: &str) {
        self.remove_edge(a, b);
        for map in self.relations.values_mut() {
            if let Some(set) = map.get_mut(a) {
                set.remove(b);
            }
            if let Some(set) = map.get_mut(b) {
                set.remove(a);
            }
        }
    }

    /// Remove `name` from every store.
    pub fn purge(&mut self, name: &str) {
        if let Some(neighbours) = self.edges.remove(name) {
            for other in neighbours {
                if let Some(set) = self.edges.get_mut(&other) {
                    set.remove(name);
                }
            }
        }
        for map in self.relations.values_mut() {
            map.remove(name);
            for set in map.values_mut() {
                set.remove(name);
            }
        }
        self.pending_mirrors.remove(name);
    }

    // ── Mirrors ──

    pub fn take_pending_mirrors(&mut self) -> BTreeMap<String, Value> {
        std::mem::take(&mut self.pending_mirrors)
    }

    pub fn arm_mirror(&mut self, mirrorer: &str, value: Value) {
        self.pending_mirrors.insert(mirrorer.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_symmetric() {
        let mut g = RelationshipGraph::new();
        g.add_edge("a", "b");
        assert!(g.has_edge("b", "a"));
        assert_eq!(g.edge_count(), 1);
        g.remove_edge("b", "a");
        assert!(!g.has_edge("a", "b"));
        assert_eq!(g.isolated(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn forget_pair_is_idempotent() {
        let mut g = RelationshipGraph::new();
        g.add_edge("a", "b");
        g.relate(Relation::Hates, "a", "b");
        g.relate(Relation::Fears, "b", "a");
        g.forget_pair("a", "b");
        g.forget_pair("a", "b");
        assert!(!g.relates(Relation::Hates, "a", "b"));
        assert!(!g.relates(Relation::Fears, "b", "a"));
        assert!(!g.has_edge("a", "b"));
    }

    #[test]
    fn distance_uses_bfs() {
        let mut g = RelationshipGraph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        g.add_edge("a", "c");
        g.add_edge("c", "d");
        assert_eq!(g.distance("a", "d"), Some(2));
        assert_eq!(g.distance("a", "zzz"), None);
        assert_eq!(g.distance("a", "a"), Some(0));
    }

    #[test]
    fn ignores_checked_both_ways() {
        let mut g = RelationshipGraph::new();
        g.relate(Relation::Ignores, "b", "a");
        let hit = g.ignores_conflict(&["a".into()], &["b".into()]);
        assert_eq!(hit, Some(("a".to_string(), "b".to_string())));
    }

    #[test]
    fn sources_lists_fearers() {
        let mut g = RelationshipGraph::new();
        g.relate(Relation::Fears, "x", "target");
        g.relate(Relation::Fears, "y", "target");
        g.relate(Relation::Fears, "z", "other");
        assert_eq!(g.sources(Relation::Fears, "target"), vec!["x".to_string(), "y".to_string()]);
    }
}
