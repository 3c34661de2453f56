//! In-memory concept graph with copy-on-write snapshots.
//!
//! Uses `petgraph` for the arena (nodes addressed by `NodeIndex`, never
//! removed, so index order is insertion order) and a `HashMap` for O(1)
//! lookups by node id. Every node carries a version counter bumped on each
//! write touching it.
//!
//! Readers call [`ConceptGraph::snapshot`] and get an `Arc<GraphState>` that
//! never changes underneath them. Writers go through `Arc::make_mut`, which
//! clones the state only while a snapshot is still held.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::concept::{ConceptNode, clamp_unit};
use crate::error::GraphError;

use super::{Edge, EdgeData};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Immutable view of the graph at one point in time.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    graph: DiGraph<ConceptNode, EdgeData>,
    node_index: HashMap<String, NodeIndex>,
    versions: Vec<u64>,
}

impl GraphState {
    /// Get a node by id.
    pub fn get_node(&self, id: &str) -> Option<&ConceptNode> {
        self.node_index.get(id).map(|idx| &self.graph[*idx])
    }

    /// Insertion position of a node, used for deterministic tie-breaking.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).map(|idx| idx.index())
    }

    /// Write version of a node (0 for unknown ids).
    pub fn version(&self, id: &str) -> u64 {
        self.node_index
            .get(id)
            .and_then(|idx| self.versions.get(idx.index()).copied())
            .unwrap_or(0)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ConceptNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// Outgoing edges of a node as `(neighbor, edge weight)`, in edge insertion order.
    pub fn neighbors(&self, id: &str) -> Vec<(&ConceptNode, f64)> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight().weight))
            .collect();
        // petgraph walks adjacency lists newest-first.
        edges.sort_by_key(|(edge_idx, _, _)| *edge_idx);
        edges
            .into_iter()
            .map(|(_, target, weight)| (&self.graph[target], weight))
            .collect()
    }

    /// Weight of the edge `from → to`, if present.
    pub fn edge_weight(&self, from: &str, to: &str) -> Option<f64> {
        let from_idx = self.node_index.get(from)?;
        let to_idx = self.node_index.get(to)?;
        let edge_idx = self.graph.find_edge(*from_idx, *to_idx)?;
        Some(self.graph[edge_idx].weight)
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<Edge> {
        self.graph
            .edge_indices()
            .filter_map(|ei| {
                let (src, dst) = self.graph.edge_endpoints(ei)?;
                Some(Edge {
                    from: self.graph[src].id.clone(),
                    to: self.graph[dst].id.clone(),
                    weight: self.graph[ei].weight,
                })
            })
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Insert or replace a node. A replaced node keeps its position and edges.
    pub fn add_node(&mut self, node: ConceptNode) -> GraphResult<()> {
        validate_id(&node.id)?;
        let mut node = node;
        node.weight = clamp_unit(node.weight);
        if let Some(&idx) = self.node_index.get(&node.id) {
            self.graph[idx] = node;
            self.bump(idx);
        } else {
            let id = node.id.clone();
            let idx = self.graph.add_node(node);
            self.node_index.insert(id, idx);
            self.versions.push(1);
        }
        Ok(())
    }

    /// Insert or replace the edge `from → to`, clamping the weight.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: f64) -> GraphResult<()> {
        let (from_idx, to_idx) = self.endpoints(from, to)?;
        let data = EdgeData {
            weight: clamp_unit(weight),
        };
        match self.graph.find_edge(from_idx, to_idx) {
            Some(edge_idx) => self.graph[edge_idx] = data,
            None => {
                self.graph.add_edge(from_idx, to_idx, data);
            }
        }
        self.bump(from_idx);
        Ok(())
    }

    /// Raise the weight of `from → to` by `delta`, creating the edge at 0.0
    /// when absent. Returns the new weight, `min(1, w + delta)`.
    pub fn strengthen(&mut self, from: &str, to: &str, delta: f64) -> GraphResult<f64> {
        let current = self.edge_weight(from, to).unwrap_or(0.0);
        let updated = clamp_unit(current + delta);
        self.add_edge(from, to, updated)?;
        Ok(updated)
    }

    /// Record that a node took part in an interaction.
    pub fn touch(&mut self, id: &str, timestamp: u64) -> GraphResult<()> {
        let idx = *self
            .node_index
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound { id: id.to_string() })?;
        self.graph[idx].last_used = timestamp;
        self.bump(idx);
        Ok(())
    }

    fn endpoints(&self, from: &str, to: &str) -> GraphResult<(NodeIndex, NodeIndex)> {
        let from_idx = *self
            .node_index
            .get(from)
            .ok_or_else(|| GraphError::NodeNotFound { id: from.to_string() })?;
        let to_idx = *self
            .node_index
            .get(to)
            .ok_or_else(|| GraphError::NodeNotFound { id: to.to_string() })?;
        Ok((from_idx, to_idx))
    }

    fn bump(&mut self, idx: NodeIndex) {
        if let Some(v) = self.versions.get_mut(idx.index()) {
            *v += 1;
        }
    }
}

fn validate_id(id: &str) -> GraphResult<()> {
    if id.is_empty() {
        return Err(GraphError::InvalidId {
            reason: "id is empty".into(),
        });
    }
    if id.trim() != id {
        return Err(GraphError::InvalidId {
            reason: format!("id {id:?} has surrounding whitespace"),
        });
    }
    Ok(())
}

/// Shared concept graph. Cheap snapshots for readers, serialised writers.
pub struct ConceptGraph {
    state: RwLock<Arc<GraphState>>,
}

impl ConceptGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(GraphState::default())),
        }
    }

    /// Take an immutable snapshot of the current graph.
    pub fn snapshot(&self) -> Arc<GraphState> {
        Arc::clone(&self.state.read().expect("graph lock poisoned"))
    }

    /// Apply several writes atomically with respect to readers.
    pub fn update<T>(&self, f: impl FnOnce(&mut GraphState) -> GraphResult<T>) -> GraphResult<T> {
        let mut guard = self.state.write().expect("graph lock poisoned");
        f(Arc::make_mut(&mut guard))
    }

    /// Insert or replace a node (last write wins).
    pub fn add_node(&self, node: ConceptNode) -> GraphResult<()> {
        self.update(|state| state.add_node(node))
    }

    /// Insert or replace an edge; the weight is clamped into [0.0, 1.0].
    pub fn add_edge(&self, from: &str, to: &str, weight: f64) -> GraphResult<()> {
        self.update(|state| state.add_edge(from, to, weight))
    }

    /// Reinforce `from → to` by `delta`; returns `min(1, w + delta)`.
    pub fn strengthen_connection(&self, from: &str, to: &str, delta: f64) -> GraphResult<f64> {
        self.update(|state| state.strengthen(from, to, delta))
    }

    /// Get a copy of a node.
    pub fn get_node(&self, id: &str) -> Option<ConceptNode> {
        self.snapshot().get_node(id).cloned()
    }

    /// Outgoing edges of a node.
    pub fn neighbors(&self, id: &str) -> Vec<Edge> {
        let snapshot = self.snapshot();
        snapshot
            .neighbors(id)
            .into_iter()
            .map(|(node, weight)| Edge {
                from: id.to_string(),
                to: node.id.clone(),
                weight,
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.snapshot().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.snapshot().edge_count()
    }

    /// Bulk-load nodes then edges. Used when restoring from persistent storage.
    pub fn bulk_load(&self, nodes: Vec<ConceptNode>, edges: &[Edge]) -> GraphResult<usize> {
        self.update(|state| {
            for node in nodes {
                state.add_node(node)?;
            }
            for edge in edges {
                state.add_edge(&edge.from, &edge.to, edge.weight)?;
            }
            Ok(state.node_count())
        })
    }
}

impl Default for ConceptGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConceptGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("ConceptGraph")
            .field("nodes", &snapshot.node_count())
            .field("edges", &snapshot.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptKind;

    fn node(id: &str, weight: f64) -> ConceptNode {
        ConceptNode::new(id, ConceptKind::Domain, weight)
    }

    #[test]
    fn add_and_get_node() {
        let graph = ConceptGraph::new();
        graph.add_node(node("math", 0.8)).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.get_node("math").unwrap().weight, 0.8);
        assert!(graph.get_node("physics").is_none());
    }

    #[test]
    fn add_node_replaces_in_place() {
        let graph = ConceptGraph::new();
        graph.add_node(node("a", 0.3)).unwrap();
        graph.add_node(node("b", 0.3)).unwrap();
        graph.add_edge("a", "b", 0.5).unwrap();
        let before = graph.snapshot().version("a");

        graph.add_node(node("a", 0.9)).unwrap();

        let snap = graph.snapshot();
        assert_eq!(snap.node_count(), 2);
        assert_eq!(snap.get_node("a").unwrap().weight, 0.9);
        assert_eq!(snap.position("a"), Some(0));
        assert_eq!(snap.edge_weight("a", "b"), Some(0.5));
        assert!(snap.version("a") > before);
    }

    #[test]
    fn edge_weight_is_clamped() {
        let graph = ConceptGraph::new();
        graph.add_node(node("a", 0.5)).unwrap();
        graph.add_node(node("b", 0.5)).unwrap();
        graph.add_edge("a", "b", 3.0).unwrap();
        assert_eq!(graph.snapshot().edge_weight("a", "b"), Some(1.0));
        graph.add_edge("a", "b", -1.0).unwrap();
        assert_eq!(graph.snapshot().edge_weight("a", "b"), Some(0.0));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn edge_requires_both_endpoints() {
        let graph = ConceptGraph::new();
        graph.add_node(node("a", 0.5)).unwrap();
        let err = graph.add_edge("a", "ghost", 0.5).unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound { id } if id == "ghost"));
    }

    #[test]
    fn neighbors_are_outgoing_in_insertion_order() {
        let graph = ConceptGraph::new();
        for id in ["a", "b", "c", "d"] {
            graph.add_node(node(id, 0.5)).unwrap();
        }
        graph.add_edge("a", "c", 0.2).unwrap();
        graph.add_edge("a", "b", 0.4).unwrap();
        graph.add_edge("d", "a", 0.9).unwrap();

        let out = graph.neighbors("a");
        let targets: Vec<&str> = out.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(targets, vec!["c", "b"]);
        assert!(graph.neighbors("zzz").is_empty());
    }

    #[test]
    fn strengthen_is_min_one_of_sum() {
        let graph = ConceptGraph::new();
        graph.add_node(node("a", 0.5)).unwrap();
        graph.add_node(node("b", 0.5)).unwrap();

        assert!((graph.strengthen_connection("a", "b", 0.3).unwrap() - 0.3).abs() < 1e-12);
        assert!((graph.strengthen_connection("a", "b", 0.25).unwrap() - 0.55).abs() < 1e-12);
        assert_eq!(graph.strengthen_connection("a", "b", 0.9).unwrap(), 1.0);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let graph = ConceptGraph::new();
        graph.add_node(node("a", 0.5)).unwrap();
        let snap = graph.snapshot();
        graph.add_node(node("b", 0.5)).unwrap();
        graph.add_node(node("a", 0.1)).unwrap();

        assert_eq!(snap.node_count(), 1);
        assert_eq!(snap.get_node("a").unwrap().weight, 0.5);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn invalid_ids_rejected() {
        let graph = ConceptGraph::new();
        assert!(graph.add_node(node("", 0.5)).is_err());
        assert!(graph.add_node(node(" padded", 0.5)).is_err());
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let graph = Arc::new(ConceptGraph::new());
        graph.add_node(node("a", 0.5)).unwrap();
        graph.add_node(node("b", 0.5)).unwrap();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let graph = Arc::clone(&graph);
                std::thread::spawn(move || {
                    let _reader = graph.snapshot();
                    graph.strengthen_connection("a", "b", 0.01).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let w = graph.snapshot().edge_weight("a", "b").unwrap();
        assert!((w - 0.2).abs() < 1e-9, "expected 0.2, got {w}");
    }
}
