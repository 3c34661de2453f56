//! Concept graph: weighted directed graph of concept and domain nodes.
//!
//! - [`ConceptGraph`](index::ConceptGraph): the shared, lock-protected store
//! - [`GraphState`](index::GraphState): an immutable snapshot readers work on
//!
//! Edges are directed and stored on their source node. Domain-to-domain edges
//! double as association weights for the recursive search and are reinforced
//! by the adaptive learner.

pub mod index;

use serde::{Deserialize, Serialize};

use crate::concept::clamp_unit;

/// A directed weighted edge `from → to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Weight in [0.0, 1.0].
    pub weight: f64,
}

impl Edge {
    /// Create an edge, clamping the weight into [0.0, 1.0].
    pub fn new(from: impl Into<String>, to: impl Into<String>, weight: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            weight: clamp_unit(weight),
        }
    }
}

/// Edge data stored on petgraph edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Weight in [0.0, 1.0].
    pub weight: f64,
}
