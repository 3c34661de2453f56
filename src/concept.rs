//! Core record types for the noema engine.
//!
//! A [`ConceptNode`] is the unit the activation engine and the fusion scorers
//! work on. A [`Domain`] is the unit the router, the recursive search and the
//! adaptive learner work on. Every domain is mirrored in the graph by a node of
//! kind [`ConceptKind::Domain`] with the same id, so both views share one store.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// Current time in seconds since the UNIX epoch.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Clamp a weight or activation into `[0.0, 1.0]`. NaN collapses to `0.0`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Classification of a node in the concept graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptKind {
    /// A knowledge domain (mathematics, biology, ...).
    Domain,
    /// A foundational reasoning principle shared across domains.
    Foundation,
    /// A reusable skill (decomposition, critical analysis, ...).
    Skill,
    /// A response strategy carrying concrete techniques.
    Strategy,
}

impl std::fmt::Display for ConceptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConceptKind::Domain => "domain",
            ConceptKind::Foundation => "foundation",
            ConceptKind::Skill => "skill",
            ConceptKind::Strategy => "strategy",
        };
        f.pad(name)
    }
}

/// A node in the concept graph.
///
/// Activation is deliberately absent: it is computed per query and only
/// exists on [`ActivatedNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    /// Unique identifier.
    pub id: String,
    /// What kind of node this is.
    pub kind: ConceptKind,
    /// Literal substrings used for matching, stored lower-cased.
    pub patterns: BTreeSet<String>,
    /// Match weight in [0.0, 1.0].
    pub weight: f64,
    /// Ordered principle statements.
    #[serde(default)]
    pub principles: Vec<String>,
    /// Concrete techniques, mostly carried by strategy nodes.
    #[serde(default)]
    pub techniques: Vec<String>,
    /// Last time this node took part in an interaction (seconds since UNIX epoch).
    #[serde(default)]
    pub last_used: u64,
}

impl ConceptNode {
    /// Create a node with no patterns, principles or techniques.
    pub fn new(id: impl Into<String>, kind: ConceptKind, weight: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            patterns: BTreeSet::new(),
            weight: clamp_unit(weight),
            principles: Vec::new(),
            techniques: Vec::new(),
            last_used: 0,
        }
    }

    /// Add match patterns (lower-cased, blanks skipped).
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for p in patterns {
            let p = p.as_ref().trim().to_lowercase();
            if !p.is_empty() {
                self.patterns.insert(p);
            }
        }
        self
    }

    /// Set the principle list.
    pub fn with_principles<I, S>(mut self, principles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.principles = principles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the technique list.
    pub fn with_techniques<I, S>(mut self, techniques: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.techniques = techniques.into_iter().map(Into::into).collect();
        self
    }
}

/// A node together with its activation for the current query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivatedNode {
    pub node: ConceptNode,
    /// Activation in [0.0, 1.0].
    pub activation: f64,
}

/// Deduplicated, case-normalised, insertion-ordered set of concept strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ConceptSet {
    items: Vec<String>,
    index: HashSet<String>,
}

impl ConceptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalise a concept: trim and lower-case.
    pub fn normalize(concept: &str) -> String {
        concept.trim().to_lowercase()
    }

    /// Insert a concept. Returns `true` if it was not already present.
    pub fn insert(&mut self, concept: &str) -> bool {
        let key = Self::normalize(concept);
        if key.is_empty() || self.index.contains(&key) {
            return false;
        }
        self.index.insert(key.clone());
        self.items.push(key);
        true
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, concept: &str) -> bool {
        self.index.contains(&Self::normalize(concept))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for ConceptSet {
    fn from(items: Vec<String>) -> Self {
        let mut set = ConceptSet::new();
        for item in &items {
            set.insert(item);
        }
        set
    }
}

impl From<ConceptSet> for Vec<String> {
    fn from(set: ConceptSet) -> Self {
        set.items
    }
}

impl<S: AsRef<str>> FromIterator<S> for ConceptSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = ConceptSet::new();
        for item in iter {
            set.insert(item.as_ref());
        }
        set
    }
}

/// A knowledge domain: a named concept cluster with principles and usage counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub concepts: ConceptSet,
    #[serde(default)]
    pub principles: Vec<String>,
    #[serde(default)]
    pub interaction_count: u64,
    #[serde(default)]
    pub last_used: u64,
}

impl Domain {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            concepts: ConceptSet::new(),
            principles: Vec::new(),
            interaction_count: 0,
            last_used: 0,
        }
    }

    pub fn with_concepts<I, S>(mut self, concepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for c in concepts {
            self.concepts.insert(c.as_ref());
        }
        self
    }

    pub fn with_principles<I, S>(mut self, principles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.principles = principles.into_iter().map(Into::into).collect();
        self
    }
}

/// Static, symmetric relatedness between domains, used by the router.
///
/// Hand-seeded and never touched by learning; learned association strength
/// lives on graph edges instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRelations {
    related: BTreeMap<String, BTreeSet<String>>,
}

impl DomainRelations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relate two domains in both directions. Self-relations are ignored.
    pub fn relate(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.related
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.related
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    pub fn are_related(&self, a: &str, b: &str) -> bool {
        self.related.get(a).is_some_and(|set| set.contains(b))
    }

    /// Domains related to `id`, in lexical order.
    pub fn related_to(&self, id: &str) -> impl Iterator<Item = &str> {
        self.related
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Number of related pairs.
    pub fn pair_count(&self) -> usize {
        self.related.values().map(BTreeSet::len).sum::<usize>() / 2
    }
}

/// One processed query, as kept in the bounded interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub query: String,
    pub response: String,
    pub confidence: f64,
    pub domains_used: Vec<String>,
    pub new_concepts: Vec<String>,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_weight_is_clamped() {
        assert_eq!(ConceptNode::new("a", ConceptKind::Skill, 1.7).weight, 1.0);
        assert_eq!(ConceptNode::new("b", ConceptKind::Skill, -0.2).weight, 0.0);
        assert_eq!(ConceptNode::new("c", ConceptKind::Skill, f64::NAN).weight, 0.0);
    }

    #[test]
    fn patterns_are_lowercased_and_deduplicated() {
        let node = ConceptNode::new("x", ConceptKind::Domain, 0.5)
            .with_patterns(["Cat", "cat ", "", "DOG"]);
        let patterns: Vec<&str> = node.patterns.iter().map(String::as_str).collect();
        assert_eq!(patterns, vec!["cat", "dog"]);
    }

    #[test]
    fn concept_set_is_case_insensitive_and_ordered() {
        let mut set = ConceptSet::new();
        assert!(set.insert("Neural Network"));
        assert!(!set.insert("neural network"));
        assert!(set.insert("gradient"));
        assert!(set.contains("NEURAL NETWORK"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["neural network", "gradient"]);
    }

    #[test]
    fn concept_set_serde_roundtrip_rebuilds_index() {
        let set: ConceptSet = ["Alpha", "beta", "ALPHA"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["alpha","beta"]"#);
        let back: ConceptSet = serde_json::from_str(&json).unwrap();
        assert!(back.contains("Beta"));
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn relations_are_symmetric() {
        let mut rel = DomainRelations::new();
        rel.relate("mathematics", "physics");
        rel.relate("physics", "mathematics");
        rel.relate("physics", "physics");
        assert!(rel.are_related("physics", "mathematics"));
        assert!(!rel.are_related("physics", "biology"));
        assert_eq!(rel.pair_count(), 1);
        assert_eq!(rel.related_to("physics").collect::<Vec<_>>(), vec!["mathematics"]);
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&ConceptKind::Strategy).unwrap();
        assert_eq!(json, "\"strategy\"");
    }
}
