//! Seed packs: knowledge bootstrapping for an empty store.
//!
//! A seed pack is a TOML bundle of domains, auxiliary nodes (foundations,
//! skills, strategies), edges, static domain relations and initial
//! association weights. The `core` pack is bundled into the binary; external
//! packs are directories containing a `seed.toml`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::concept::{ConceptKind, ConceptNode, Domain};
use crate::error::{SeedError, SeedResult};
use crate::store::KnowledgeStore;

// ── Seed pack data model ────────────────────────────────────────────────

/// A parsed seed pack.
#[derive(Debug, Clone)]
pub struct SeedPack {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub domains: Vec<SeedDomain>,
    pub nodes: Vec<SeedNode>,
    pub edges: Vec<SeedEdge>,
    pub relations: Vec<SeedRelation>,
    pub associations: Vec<SeedAssociation>,
    /// Source: `Bundled` or `External(path)`.
    pub source: SeedSource,
}

/// Where a seed pack came from.
#[derive(Debug, Clone)]
pub enum SeedSource {
    /// Bundled into the binary via `include_str!`.
    Bundled,
    /// Loaded from an external directory.
    External(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedDomain {
    pub id: String,
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub principles: Vec<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedNode {
    pub id: String,
    pub kind: ConceptKind,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub principles: Vec<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedEdge {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRelation {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAssociation {
    pub a: String,
    pub b: String,
    pub weight: f64,
}

fn default_weight() -> f64 {
    0.7
}

/// Report after applying a seed pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub id: String,
    pub domains: usize,
    pub nodes: usize,
    pub edges: usize,
    pub relations: usize,
}

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SeedToml {
    seed: SeedMeta,
    #[serde(default)]
    domains: Vec<SeedDomain>,
    #[serde(default)]
    nodes: Vec<SeedNode>,
    #[serde(default)]
    edges: Vec<SeedEdge>,
    #[serde(default)]
    relations: Vec<SeedRelation>,
    #[serde(default)]
    associations: Vec<SeedAssociation>,
}

#[derive(Debug, Deserialize)]
struct SeedMeta {
    id: String,
    name: String,
    version: String,
    description: String,
}

// ── Bundled seed packs ──────────────────────────────────────────────────

const CORE_TOML: &str = include_str!("../../data/seeds/core/seed.toml");

/// Id of the pack used when nothing else is configured.
pub const DEFAULT_PACK: &str = "core";

fn parse_seed_toml(toml_str: &str, source: SeedSource) -> SeedResult<SeedPack> {
    let parsed: SeedToml = toml::from_str(toml_str).map_err(|e| SeedError::Parse {
        id: "(unknown)".into(),
        message: e.to_string(),
    })?;
    Ok(SeedPack {
        id: parsed.seed.id,
        name: parsed.seed.name,
        version: parsed.seed.version,
        description: parsed.seed.description,
        domains: parsed.domains,
        nodes: parsed.nodes,
        edges: parsed.edges,
        relations: parsed.relations,
        associations: parsed.associations,
        source,
    })
}

fn bundled_packs() -> Vec<SeedPack> {
    [(CORE_TOML, DEFAULT_PACK)]
        .iter()
        .filter_map(
            |(toml, id)| match parse_seed_toml(toml, SeedSource::Bundled) {
                Ok(pack) => Some(pack),
                Err(e) => {
                    tracing::warn!(seed = id, "Failed to parse bundled seed: {e}");
                    None
                }
            },
        )
        .collect()
}

impl SeedPack {
    /// Load a pack from a `seed.toml` file or a directory containing one.
    pub fn from_path(path: &Path) -> SeedResult<Self> {
        let file = if path.is_dir() {
            path.join("seed.toml")
        } else {
            path.to_path_buf()
        };
        let content = std::fs::read_to_string(&file).map_err(|e| SeedError::Io {
            path: file.display().to_string(),
            source: e,
        })?;
        let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
        parse_seed_toml(&content, SeedSource::External(dir))
    }

    /// Populate a store with this pack.
    ///
    /// Domains and nodes first, then edges, relations and associations, so
    /// every reference can be checked against what was declared.
    pub fn apply(&self, store: &KnowledgeStore) -> SeedResult<SeedReport> {
        let apply_err = |message: String| SeedError::Apply {
            id: self.id.clone(),
            message,
        };

        for d in &self.domains {
            let domain = Domain::new(&d.id, &d.name)
                .with_concepts(&d.concepts)
                .with_principles(d.principles.iter().cloned());
            let node = ConceptNode::new(&d.id, ConceptKind::Domain, d.weight)
                .with_patterns(&d.patterns)
                .with_principles(d.principles.iter().cloned())
                .with_techniques(d.techniques.iter().cloned());
            store
                .add_domain(domain, Some(node), d.weight)
                .map_err(|e| apply_err(format!("domain '{}': {e}", d.id)))?;
        }

        for n in &self.nodes {
            let node = ConceptNode::new(&n.id, n.kind, n.weight)
                .with_patterns(&n.patterns)
                .with_principles(n.principles.iter().cloned())
                .with_techniques(n.techniques.iter().cloned());
            store
                .graph()
                .add_node(node)
                .map_err(|e| apply_err(format!("node '{}': {e}", n.id)))?;
        }

        for e in &self.edges {
            store
                .graph()
                .add_edge(&e.from, &e.to, e.weight)
                .map_err(|err| apply_err(format!("edge '{}' -> '{}': {err}", e.from, e.to)))?;
        }

        for r in &self.relations {
            store
                .relate_domains(&r.a, &r.b)
                .map_err(|e| apply_err(format!("relation '{}' ~ '{}': {e}", r.a, r.b)))?;
        }

        for a in &self.associations {
            store
                .set_association(&a.a, &a.b, a.weight)
                .map_err(|e| apply_err(format!("association '{}' ~ '{}': {e}", a.a, a.b)))?;
        }

        let report = SeedReport {
            id: self.id.clone(),
            domains: self.domains.len(),
            nodes: self.nodes.len(),
            edges: self.edges.len() + 2 * self.associations.len(),
            relations: self.relations.len(),
        };
        tracing::info!(
            seed = %report.id,
            domains = report.domains,
            nodes = report.nodes,
            edges = report.edges,
            "seed pack applied"
        );
        Ok(report)
    }
}

// ── Seed Registry ───────────────────────────────────────────────────────

/// Registry of available seed packs (bundled + discovered from disk).
pub struct SeedRegistry {
    packs: HashMap<String, SeedPack>,
}

impl SeedRegistry {
    /// Create a registry with only bundled packs.
    pub fn bundled() -> Self {
        let packs = bundled_packs()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { packs }
    }

    /// Discover seed packs from a directory (in addition to bundled packs).
    ///
    /// Each subdirectory containing a `seed.toml` is loaded as a pack.
    pub fn discover(seeds_dir: &Path) -> Self {
        let mut registry = Self::bundled();

        if let Ok(entries) = std::fs::read_dir(seeds_dir) {
            for entry in entries.flatten() {
                let seed_file = entry.path().join("seed.toml");
                if !seed_file.is_file() {
                    continue;
                }
                match SeedPack::from_path(&seed_file) {
                    Ok(pack) => {
                        registry.packs.insert(pack.id.clone(), pack);
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %seed_file.display(),
                            "Failed to load seed pack: {e}"
                        );
                    }
                }
            }
        }

        registry
    }

    /// List all available seed packs.
    pub fn list(&self) -> Vec<&SeedPack> {
        let mut packs: Vec<&SeedPack> = self.packs.values().collect();
        packs.sort_by(|a, b| a.id.cmp(&b.id));
        packs
    }

    /// Get a seed pack by ID.
    pub fn get(&self, id: &str) -> SeedResult<&SeedPack> {
        self.packs
            .get(id)
            .ok_or_else(|| SeedError::NotFound { id: id.to_string() })
    }

    /// Resolve a pack reference: a registered id, or a path to a pack.
    pub fn resolve(&self, reference: &str) -> SeedResult<SeedPack> {
        if let Ok(pack) = self.get(reference) {
            return Ok(pack.clone());
        }
        let path = Path::new(reference);
        if path.exists() {
            return SeedPack::from_path(path);
        }
        Err(SeedError::NotFound {
            id: reference.to_string(),
        })
    }
}
