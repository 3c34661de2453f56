//! Activation engine: pattern matching plus one-hop weighted propagation.
//!
//! For a node, every node-pattern that matches any query pattern (substring in
//! either direction) contributes `weight * direct_gain` once. Every node then
//! receives `neighbor.weight * edge.weight * propagation_gain` for each
//! outgoing edge, using the neighbor's static weight (single pass, no
//! convergence loop), so a node with no match of its own can still activate
//! through a strong edge. The total is clamped to [0, 1].
//!
//! [`ActivationConfig::require_direct_match`] restricts propagation to nodes
//! that matched directly.
//!
//! The engine is stateless: activation lives only in the returned
//! [`ActivatedNode`] values and is recomputed for every query.

use std::collections::HashSet;

use crate::concept::{ActivatedNode, ConceptKind, ConceptNode, clamp_unit};
use crate::graph::index::GraphState;
use crate::text::mutual_contains;

/// Tunables for activation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationConfig {
    /// Nodes at or below this activation are dropped (default: 0.1).
    pub threshold: f64,
    /// Gain applied to `node.weight` per matched node-pattern (default: 0.5).
    pub direct_gain: f64,
    /// Gain applied to `neighbor.weight * edge.weight` (default: 0.3).
    pub propagation_gain: f64,
    /// Only propagate into nodes with a direct match (default: false).
    pub require_direct_match: bool,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            direct_gain: 0.5,
            propagation_gain: 0.3,
            require_direct_match: false,
        }
    }
}

/// Stateless activation engine.
#[derive(Debug, Clone, Default)]
pub struct ActivationEngine {
    config: ActivationConfig,
}

impl ActivationEngine {
    pub fn new(config: ActivationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ActivationConfig {
        &self.config
    }

    /// Activate every node of the snapshot against the query patterns.
    pub fn activate(&self, graph: &GraphState, patterns: &[String]) -> Vec<ActivatedNode> {
        self.activate_within(graph, patterns, None)
    }

    /// Activate, optionally restricting domain nodes to `domain_scope`.
    ///
    /// Non-domain nodes (foundations, skills, strategies) are always
    /// considered. The result holds only nodes above the threshold, sorted by
    /// activation descending with ties in node insertion order.
    pub fn activate_within(
        &self,
        graph: &GraphState,
        patterns: &[String],
        domain_scope: Option<&HashSet<String>>,
    ) -> Vec<ActivatedNode> {
        if patterns.is_empty() {
            return Vec::new();
        }

        let mut activated: Vec<ActivatedNode> = graph
            .nodes()
            .filter(|node| match (node.kind, domain_scope) {
                (ConceptKind::Domain, Some(scope)) => scope.contains(&node.id),
                _ => true,
            })
            .filter_map(|node| {
                let activation = self.node_activation(graph, node, patterns);
                (activation > self.config.threshold).then(|| ActivatedNode {
                    node: node.clone(),
                    activation,
                })
            })
            .collect();

        // Stable sort keeps insertion order among equal activations.
        activated.sort_by(|a, b| {
            b.activation
                .partial_cmp(&a.activation)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        activated
    }

    /// Activation of a single node, clamped to [0, 1].
    pub fn node_activation(
        &self,
        graph: &GraphState,
        node: &ConceptNode,
        patterns: &[String],
    ) -> f64 {
        let matched = matched_pattern_count(node, patterns);
        if matched == 0 && self.config.require_direct_match {
            return 0.0;
        }
        let mut total = node.weight * self.config.direct_gain * matched as f64;
        for (neighbor, edge_weight) in graph.neighbors(&node.id) {
            total += neighbor.weight * edge_weight * self.config.propagation_gain;
        }
        clamp_unit(total)
    }
}

/// Number of node-patterns with at least one matching query pattern.
///
/// Each node-pattern counts once, however many query patterns it matches.
pub fn matched_pattern_count(node: &ConceptNode, patterns: &[String]) -> usize {
    node.patterns
        .iter()
        .filter(|np| patterns.iter().any(|qp| mutual_contains(qp, np)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::index::ConceptGraph;

    fn pats(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn node(id: &str, weight: f64, patterns: &[&str]) -> ConceptNode {
        ConceptNode::new(id, ConceptKind::Domain, weight).with_patterns(patterns.iter().copied())
    }

    #[test]
    fn single_match_no_edges() {
        let graph = ConceptGraph::new();
        graph.add_node(node("x", 0.9, &["cat"])).unwrap();

        let result = ActivationEngine::default().activate(&graph.snapshot(), &pats(&["cat"]));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].node.id, "x");
        assert!((result[0].activation - 0.45).abs() < 1e-12);
    }

    #[test]
    fn one_hop_propagation_uses_static_neighbor_weight() {
        let graph = ConceptGraph::new();
        graph.add_node(node("x", 0.9, &["cat"])).unwrap();
        graph.add_node(node("y", 0.5, &["dog"])).unwrap();
        graph.add_edge("x", "y", 0.8).unwrap();

        let result = ActivationEngine::default().activate(&graph.snapshot(), &pats(&["cat"]));
        assert_eq!(result.len(), 1);
        assert!((result[0].activation - 0.57).abs() < 1e-12);
    }

    #[test]
    fn each_node_pattern_counts_once() {
        let graph = ConceptGraph::new();
        graph.add_node(node("x", 0.4, &["cat"])).unwrap();

        let result = ActivationEngine::default()
            .activate(&graph.snapshot(), &pats(&["cat", "cats", "wildcat"]));
        assert!((result[0].activation - 0.2).abs() < 1e-12);
    }

    #[test]
    fn activation_is_clamped_to_one() {
        let graph = ConceptGraph::new();
        graph
            .add_node(node("x", 1.0, &["alpha", "beta", "gamma"]))
            .unwrap();
        let result = ActivationEngine::default()
            .activate(&graph.snapshot(), &pats(&["alpha", "beta", "gamma"]));
        assert_eq!(result[0].activation, 1.0);
    }

    #[test]
    fn threshold_is_strict_and_ties_follow_insertion() {
        let graph = ConceptGraph::new();
        graph.add_node(node("low", 0.2, &["cat"])).unwrap(); // 0.1, not > 0.1
        graph.add_node(node("b", 0.6, &["cat"])).unwrap();
        graph.add_node(node("a", 0.6, &["cat"])).unwrap();
        graph.add_node(node("top", 0.8, &["cat"])).unwrap();

        let result = ActivationEngine::default().activate(&graph.snapshot(), &pats(&["cat"]));
        let ids: Vec<&str> = result.iter().map(|a| a.node.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "b", "a"]);
    }

    #[test]
    fn empty_patterns_activate_nothing() {
        let graph = ConceptGraph::new();
        graph.add_node(node("x", 0.9, &["cat"])).unwrap();
        assert!(ActivationEngine::default().activate(&graph.snapshot(), &[]).is_empty());
    }

    #[test]
    fn unmatched_node_activates_through_strong_edge() {
        let graph = ConceptGraph::new();
        graph.add_node(node("x", 0.9, &["cat"])).unwrap();
        graph.add_node(node("z", 0.9, &["zebra"])).unwrap();
        graph.add_node(node("y", 1.0, &["dog"])).unwrap();
        graph.add_edge("z", "y", 1.0).unwrap();

        let result = ActivationEngine::default().activate(&graph.snapshot(), &pats(&["cat"]));
        let ids: Vec<&str> = result.iter().map(|a| a.node.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "z"]);
        assert!((result[0].activation - 0.45).abs() < 1e-12);
        assert!((result[1].activation - 0.3).abs() < 1e-12);
    }

    #[test]
    fn direct_match_gate_is_opt_in() {
        let graph = ConceptGraph::new();
        graph.add_node(node("x", 0.9, &["cat"])).unwrap();
        graph.add_node(node("y", 1.0, &["dog"])).unwrap();
        graph.add_edge("x", "y", 1.0).unwrap();
        let snap = graph.snapshot();

        let open = ActivationEngine::default().activate(&snap, &pats(&["bird"]));
        assert_eq!(open.len(), 1);
        assert!((open[0].activation - 0.3).abs() < 1e-12);

        let gated = ActivationEngine::new(ActivationConfig {
            require_direct_match: true,
            ..Default::default()
        });
        assert!(gated.activate(&snap, &pats(&["bird"])).is_empty());
        let matched = gated.activate(&snap, &pats(&["cat"]));
        assert!((matched[0].activation - 0.75).abs() < 1e-12);
    }

    #[test]
    fn domain_scope_filters_only_domains() {
        let graph = ConceptGraph::new();
        graph.add_node(node("math", 0.9, &["proof"])).unwrap();
        graph.add_node(node("bio", 0.9, &["proof"])).unwrap();
        graph
            .add_node(
                ConceptNode::new("rigor", ConceptKind::Foundation, 0.9).with_patterns(["proof"]),
            )
            .unwrap();

        let scope: HashSet<String> = ["math".to_string()].into_iter().collect();
        let result = ActivationEngine::default().activate_within(
            &graph.snapshot(),
            &pats(&["proof"]),
            Some(&scope),
        );
        let ids: Vec<&str> = result.iter().map(|a| a.node.id.as_str()).collect();
        assert_eq!(ids, vec!["math", "rigor"]);
    }

    #[test]
    fn repeated_activation_is_deterministic() {
        let graph = ConceptGraph::new();
        for i in 0..20 {
            graph
                .add_node(node(&format!("n{i}"), 0.3 + (i as f64) * 0.03, &["shared"]))
                .unwrap();
        }
        for i in 0..19 {
            graph
                .add_edge(&format!("n{i}"), &format!("n{}", i + 1), 0.5)
                .unwrap();
        }
        let snap = graph.snapshot();
        let engine = ActivationEngine::default();
        let first = engine.activate(&snap, &pats(&["shared"]));
        for _ in 0..5 {
            assert_eq!(engine.activate(&snap, &pats(&["shared"])), first);
        }
        assert!(first.iter().all(|a| (0.0..=1.0).contains(&a.activation)));
    }
}
