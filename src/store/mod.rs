//! Shared knowledge store for noema.
//!
//! [`KnowledgeStore`] owns every piece of mutable shared state, each behind
//! its own locking discipline:
//!
//! - the concept graph: copy-on-write `RwLock<Arc<GraphState>>`
//! - [`DomainMap`](mem::DomainMap): domains in a DashMap, per-key locking
//! - [`InteractionLog`](log::InteractionLog): bounded log behind a mutex
//! - static domain relations behind an `RwLock`
//!
//! Durability is pluggable through [`SnapshotStore`]; the default backend is
//! [`DurableStore`](durable::DurableStore) (redb), fed asynchronously by the
//! [`Flusher`](flush::Flusher).

pub mod durable;
pub mod flush;
pub mod log;
pub mod mem;

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::concept::{ConceptKind, ConceptNode, Domain, DomainRelations, InteractionRecord};
use crate::error::{GraphError, StoreError};
use crate::graph::Edge;
use crate::graph::index::{ConceptGraph, GraphResult, GraphState};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Everything needed to rebuild a [`KnowledgeStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Nodes in insertion order.
    pub nodes: Vec<ConceptNode>,
    /// Edges in insertion order.
    pub edges: Vec<Edge>,
    /// Domains in definition order.
    pub domains: Vec<Domain>,
    pub relations: DomainRelations,
    /// Interaction log, oldest first.
    pub log: Vec<InteractionRecord>,
}

/// Durable backend for store snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, if any.
    fn load(&self) -> StoreResult<Option<StoreSnapshot>>;

    /// Persist a snapshot, replacing the previous one.
    fn save(&self, snapshot: &StoreSnapshot) -> StoreResult<()>;
}

/// In-memory view of all knowledge: graph, domains, relations and history.
#[derive(Debug)]
pub struct KnowledgeStore {
    graph: ConceptGraph,
    domains: mem::DomainMap,
    relations: RwLock<DomainRelations>,
    log: log::InteractionLog,
}

impl KnowledgeStore {
    /// Create an empty store whose log keeps `log_cap` records.
    pub fn new(log_cap: usize) -> Self {
        Self {
            graph: ConceptGraph::new(),
            domains: mem::DomainMap::new(),
            relations: RwLock::new(DomainRelations::new()),
            log: log::InteractionLog::new(log_cap),
        }
    }

    pub fn graph(&self) -> &ConceptGraph {
        &self.graph
    }

    pub fn domains(&self) -> &mem::DomainMap {
        &self.domains
    }

    pub fn log(&self) -> &log::InteractionLog {
        &self.log
    }

    /// Immutable snapshot of the graph.
    pub fn graph_snapshot(&self) -> Arc<GraphState> {
        self.graph.snapshot()
    }

    /// Clone of the static relation table.
    pub fn relations(&self) -> DomainRelations {
        self.relations.read().expect("relations lock poisoned").clone()
    }

    /// Mark two domains as statically related.
    pub fn relate_domains(&self, a: &str, b: &str) -> GraphResult<()> {
        for id in [a, b] {
            if !self.domains.contains(id) {
                return Err(GraphError::DomainNotFound { id: id.to_string() });
            }
        }
        self.relations
            .write()
            .expect("relations lock poisoned")
            .relate(a, b);
        Ok(())
    }

    /// Register a domain together with its mirror node in the graph.
    ///
    /// The node is created with kind [`ConceptKind::Domain`]; its patterns
    /// default to the domain's concepts when `node` is `None`.
    pub fn add_domain(
        &self,
        domain: Domain,
        node: Option<ConceptNode>,
        weight: f64,
    ) -> GraphResult<()> {
        let node = match node {
            Some(mut node) => {
                node.id = domain.id.clone();
                node.kind = ConceptKind::Domain;
                node
            }
            None => ConceptNode::new(domain.id.clone(), ConceptKind::Domain, weight)
                .with_patterns(domain.concepts.iter())
                .with_principles(domain.principles.iter().cloned()),
        };
        self.graph.add_node(node)?;
        self.domains.insert(domain);
        Ok(())
    }

    /// Association weight between two domains (the graph edge `a → b`).
    pub fn association(&self, a: &str, b: &str) -> Option<f64> {
        self.graph.snapshot().edge_weight(a, b)
    }

    /// Set the association weight in both directions.
    pub fn set_association(&self, a: &str, b: &str, weight: f64) -> GraphResult<()> {
        self.graph.update(|state| {
            state.add_edge(a, b, weight)?;
            state.add_edge(b, a, weight)
        })
    }

    /// Capture the full store.
    pub fn snapshot(&self) -> StoreSnapshot {
        let graph = self.graph.snapshot();
        StoreSnapshot {
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges(),
            domains: self.domains.all(),
            relations: self.relations(),
            log: self.log.records(),
        }
    }

    /// Load a snapshot into this store.
    pub fn restore(&self, snapshot: StoreSnapshot) -> GraphResult<()> {
        let StoreSnapshot {
            nodes,
            edges,
            domains,
            relations,
            log,
        } = snapshot;
        self.graph.bulk_load(nodes, &edges)?;
        for domain in domains {
            self.domains.insert(domain);
        }
        *self.relations.write().expect("relations lock poisoned") = relations;
        self.log.restore(log);
        Ok(())
    }

    /// Whether nothing has been loaded or seeded yet.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0 && self.domains.is_empty()
    }
}

impl Default for KnowledgeStore {
    fn default() -> Self {
        Self::new(log::DEFAULT_LOG_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> KnowledgeStore {
        let store = KnowledgeStore::default();
        store
            .add_domain(
                Domain::new("mathematics", "Mathematics").with_concepts(["proof", "theorem"]),
                None,
                0.9,
            )
            .unwrap();
        store
            .add_domain(Domain::new("physics", "Physics").with_concepts(["energy"]), None, 0.8)
            .unwrap();
        store
    }

    #[test]
    fn domains_are_mirrored_in_graph() {
        let store = seeded();
        let node = store.graph().get_node("mathematics").unwrap();
        assert_eq!(node.kind, ConceptKind::Domain);
        assert!(node.patterns.contains("theorem"));
        assert_eq!(node.weight, 0.9);
        assert_eq!(store.domains().len(), 2);
    }

    #[test]
    fn associations_are_symmetric_edges() {
        let store = seeded();
        store.set_association("mathematics", "physics", 0.8).unwrap();
        assert_eq!(store.association("physics", "mathematics"), Some(0.8));
        assert_eq!(store.association("mathematics", "physics"), Some(0.8));
        assert!(store.set_association("mathematics", "ghost", 0.5).is_err());
    }

    #[test]
    fn relations_require_known_domains() {
        let store = seeded();
        store.relate_domains("mathematics", "physics").unwrap();
        assert!(store.relations().are_related("physics", "mathematics"));
        let err = store.relate_domains("mathematics", "ghost").unwrap_err();
        assert!(matches!(err, GraphError::DomainNotFound { .. }));
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let store = seeded();
        store.set_association("mathematics", "physics", 0.75).unwrap();
        store.relate_domains("mathematics", "physics").unwrap();

        let restored = KnowledgeStore::default();
        assert!(restored.is_empty());
        restored.restore(store.snapshot()).unwrap();

        assert_eq!(restored.snapshot(), store.snapshot());
        assert_eq!(restored.domains().ids(), vec!["mathematics", "physics"]);
    }
}
