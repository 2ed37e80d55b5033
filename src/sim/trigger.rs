//! Directed trigger wiring between gadgets
//!
//! An edge A → B means a ball hitting A runs B's action. The graph is owned by
//! the board and keyed by [`GadgetId`], so gadgets never hold references to
//! one another. Cycles and self-loops are allowed; firing only ever follows
//! one level of edges, so they cannot recurse.

use std::collections::{BTreeMap, BTreeSet};

use super::gadget::GadgetId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerGraph {
    edges: BTreeMap<GadgetId, BTreeSet<GadgetId>>,
}

impl TriggerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `source → target`. Returns false if the edge already existed.
    pub fn link(&mut self, source: GadgetId, target: GadgetId) -> bool {
        self.edges.entry(source).or_default().insert(target)
    }

    /// Remove `source → target`. Returns false if there was no such edge.
    pub fn unlink(&mut self, source: GadgetId, target: GadgetId) -> bool {
        let Some(targets) = self.edges.get_mut(&source) else {
            return false;
        };
        let removed = targets.remove(&target);
        if targets.is_empty() {
            self.edges.remove(&source);
        }
        removed
    }

    pub fn is_linked(&self, source: GadgetId, target: GadgetId) -> bool {
        self.edges
            .get(&source)
            .is_some_and(|targets| targets.contains(&target))
    }

    /// Gadgets fired when `source` is hit, in id order
    pub fn targets(&self, source: GadgetId) -> impl Iterator<Item = GadgetId> + '_ {
        self.edges.get(&source).into_iter().flatten().copied()
    }

    /// Every edge as (source, target), in id order
    pub fn edges(&self) -> impl Iterator<Item = (GadgetId, GadgetId)> + '_ {
        self.edges
            .iter()
            .flat_map(|(&source, targets)| targets.iter().map(move |&target| (source, target)))
    }

    pub fn link_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_and_targets() {
        let mut graph = TriggerGraph::new();
        assert!(graph.link(GadgetId(0), GadgetId(2)));
        assert!(graph.link(GadgetId(0), GadgetId(1)));
        assert!(!graph.link(GadgetId(0), GadgetId(1)));

        let targets: Vec<_> = graph.targets(GadgetId(0)).collect();
        assert_eq!(targets, vec![GadgetId(1), GadgetId(2)]);
        assert_eq!(graph.targets(GadgetId(5)).count(), 0);
        assert_eq!(graph.link_count(), 2);
    }

    #[test]
    fn test_cycles_and_self_loops_allowed() {
        let mut graph = TriggerGraph::new();
        assert!(graph.link(GadgetId(3), GadgetId(3)));
        assert!(graph.link(GadgetId(1), GadgetId(2)));
        assert!(graph.link(GadgetId(2), GadgetId(1)));
        assert!(graph.is_linked(GadgetId(3), GadgetId(3)));
        assert_eq!(
            graph.edges().collect::<Vec<_>>(),
            vec![
                (GadgetId(1), GadgetId(2)),
                (GadgetId(2), GadgetId(1)),
                (GadgetId(3), GadgetId(3)),
            ]
        );
    }

    #[test]
    fn test_unlink() {
        let mut graph = TriggerGraph::new();
        graph.link(GadgetId(0), GadgetId(1));
        assert!(graph.unlink(GadgetId(0), GadgetId(1)));
        assert!(!graph.unlink(GadgetId(0), GadgetId(1)));
        assert!(!graph.is_linked(GadgetId(0), GadgetId(1)));
        assert_eq!(graph.link_count(), 0);
    }
}
