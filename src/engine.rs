//! Engine facade: top-level API for noema.
//!
//! The `Engine` owns the knowledge store and every pipeline stage, and runs
//! one query as: validate → route → activate → (fuse ∥ search) → render →
//! learn → flush.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::activation::{ActivationConfig, ActivationEngine, matched_pattern_count};
use crate::cache::{QueryCache, TtlCache};
use crate::concept::{ActivatedNode, ConceptKind, Domain, InteractionRecord};
use crate::error::{EngineError, NoemaResult, QueryError, QueryResult, StoreError};
use crate::fusion::{Explanation, FusionEngine, FusionOutcome, ScoringInput};
use crate::learning::{AdaptiveLearner, Interaction, LearningRecord};
use crate::outcome::{ActivatedDomain, Decision, QueryOutcome};
use crate::render::{RenderContext, ResponseRenderer, SummaryRenderer};
use crate::router::KnowledgeRouter;
use crate::search::{RecursiveSearch, SearchConfig, SearchHit};
use crate::seeds::{DEFAULT_PACK, SeedRegistry};
use crate::store::durable::DurableStore;
use crate::store::flush::Flusher;
use crate::store::{KnowledgeStore, SnapshotStore, StoreSnapshot};
use crate::text;

/// Bounds for the out-of-scope floor confidence.
pub const OUT_OF_SCOPE_RANGE: (f64, f64) = (0.05, 0.3);

/// Longest accepted query cache TTL: one year.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration for the noema engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Data directory for persistence. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Longest accepted query, in characters (default: 1000).
    pub max_query_len: usize,
    /// Domains selected by the router (default: 3).
    pub top_k_domains: usize,
    /// Activation threshold, exclusive (default: 0.1).
    pub activation_threshold: f64,
    /// Recursive search depth (default: 3).
    pub search_depth: usize,
    /// Search branching per level (default: 8).
    pub max_branching: usize,
    /// Minimum association weight followed by search (default: 0.7).
    pub semantic_threshold: f64,
    /// Confidence reported when nothing activates (default: 0.2).
    pub out_of_scope_confidence: f64,
    /// Interaction log capacity (default: 1000).
    pub interaction_log_cap: usize,
    /// Query cache TTL in seconds. `None` disables the cache.
    pub cache_ttl_secs: Option<u64>,
    /// Whether interactions update the store (default: true).
    pub learning_enabled: bool,
    /// Seed pack applied to an empty store: a bundled id or a path.
    pub seed_pack: Option<String>,
    /// Flush snapshots in the background after learning (default: true).
    pub background_flush: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            max_query_len: 1000,
            top_k_domains: 3,
            activation_threshold: 0.1,
            search_depth: 3,
            max_branching: 8,
            semantic_threshold: 0.7,
            out_of_scope_confidence: 0.2,
            interaction_log_cap: 1000,
            cache_ttl_secs: None,
            learning_enabled: true,
            seed_pack: Some(DEFAULT_PACK.to_string()),
            background_flush: true,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file; missing fields keep their defaults.
    pub fn from_toml_file(path: &Path) -> NoemaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::ConfigFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| EngineError::ConfigFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |message: String| Err(EngineError::InvalidConfig { message });

        if self.max_query_len == 0 {
            return invalid("max_query_len must be > 0".into());
        }
        if self.top_k_domains == 0 {
            return invalid("top_k_domains must be > 0".into());
        }
        if !(0.0..1.0).contains(&self.activation_threshold) {
            return invalid(format!(
                "activation_threshold must be in [0, 1), got {}",
                self.activation_threshold
            ));
        }
        if self.max_branching == 0 {
            return invalid("max_branching must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.semantic_threshold) {
            return invalid(format!(
                "semantic_threshold must be in [0, 1], got {}",
                self.semantic_threshold
            ));
        }
        let (lo, hi) = OUT_OF_SCOPE_RANGE;
        if !(lo..=hi).contains(&self.out_of_scope_confidence) {
            return invalid(format!(
                "out_of_scope_confidence must be in [{lo}, {hi}], got {}",
                self.out_of_scope_confidence
            ));
        }
        if self.interaction_log_cap == 0 {
            return invalid("interaction_log_cap must be > 0".into());
        }
        if let Some(ttl) = self.cache_ttl_secs {
            if ttl > MAX_CACHE_TTL_SECS {
                return invalid(format!(
                    "cache_ttl_secs must be <= {MAX_CACHE_TTL_SECS}, got {ttl}"
                ));
            }
        }
        Ok(())
    }
}

/// Optional caller-supplied context for a query.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    /// Free-form tags, recorded nowhere but used to bypass the cache.
    pub tags: Vec<String>,
    /// Extra activation patterns merged with those derived from the query.
    pub extra_patterns: Vec<String>,
}

impl QueryContext {
    fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.extra_patterns.is_empty()
    }
}

/// The noema engine.
///
/// Owns the knowledge store and every pipeline stage. All methods take
/// `&self`; the engine can be shared across threads behind an `Arc`.
pub struct Engine {
    config: EngineConfig,
    store: Arc<KnowledgeStore>,
    router: KnowledgeRouter,
    activation: ActivationEngine,
    fusion: FusionEngine,
    search: RecursiveSearch,
    learner: AdaptiveLearner,
    renderer: Box<dyn ResponseRenderer>,
    cache: Option<Box<dyn QueryCache<QueryOutcome>>>,
    flusher: Option<Flusher>,
    durable: Option<Arc<dyn SnapshotStore>>,
}

impl Engine {
    /// Create a new engine with the given configuration.
    ///
    /// With a `data_dir`, the last saved snapshot is restored; an empty store
    /// is populated from the configured seed pack.
    pub fn new(config: EngineConfig) -> NoemaResult<Self> {
        config.validate()?;
        tracing::info!(
            data_dir = ?config.data_dir,
            top_k = config.top_k_domains,
            search_depth = config.search_depth,
            "initializing noema engine"
        );

        let store = Arc::new(KnowledgeStore::new(config.interaction_log_cap));

        let durable: Option<Arc<dyn SnapshotStore>> = match config.data_dir {
            Some(ref dir) => {
                std::fs::create_dir_all(dir).map_err(|_| EngineError::DataDir {
                    path: dir.display().to_string(),
                })?;
                let durable = DurableStore::open(dir)?;
                match durable.load() {
                    Ok(Some(snapshot)) => {
                        store.restore(snapshot)?;
                        tracing::info!(
                            nodes = store.graph().node_count(),
                            domains = store.domains().len(),
                            "restored knowledge store"
                        );
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "failed to load snapshot, starting fresh"),
                }
                Some(Arc::new(durable))
            }
            None => None,
        };

        if store.is_empty() {
            if let Some(reference) = &config.seed_pack {
                let registry = match &config.data_dir {
                    Some(dir) => SeedRegistry::discover(&dir.join("seeds")),
                    None => SeedRegistry::bundled(),
                };
                registry.resolve(reference)?.apply(&store)?;
            }
        }

        let flusher = match (&durable, config.background_flush) {
            (Some(sink), true) => Some(Flusher::spawn(Arc::clone(&store), Arc::clone(sink))?),
            _ => None,
        };

        let cache: Option<Box<dyn QueryCache<QueryOutcome>>> = config.cache_ttl_secs.map(|_| {
            Box::new(TtlCache::<QueryOutcome>::new()) as Box<dyn QueryCache<QueryOutcome>>
        });

        Ok(Self {
            router: KnowledgeRouter::new(config.top_k_domains),
            activation: ActivationEngine::new(ActivationConfig {
                threshold: config.activation_threshold,
                ..Default::default()
            }),
            fusion: FusionEngine::standard(),
            search: RecursiveSearch::new(SearchConfig {
                max_depth: config.search_depth,
                max_branching: config.max_branching,
                semantic_threshold: config.semantic_threshold,
                ..Default::default()
            }),
            learner: AdaptiveLearner::default(),
            renderer: Box::new(SummaryRenderer::default()),
            cache,
            flusher,
            durable,
            store,
            config,
        })
    }

    /// Replace the response renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn ResponseRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the fusion scorers.
    pub fn with_fusion(mut self, fusion: FusionEngine) -> Self {
        self.fusion = fusion;
        self
    }

    /// Replace (or install) the query cache.
    pub fn with_cache(mut self, cache: Box<dyn QueryCache<QueryOutcome>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    /// Reject empty and over-long queries before any graph work.
    pub fn validate_query(&self, query: &str) -> QueryResult<()> {
        if query.trim().is_empty() {
            return Err(QueryError::Empty);
        }
        let length = query.chars().count();
        if length > self.config.max_query_len {
            return Err(QueryError::TooLong {
                length,
                limit: self.config.max_query_len,
            });
        }
        Ok(())
    }

    /// Process a query end to end.
    pub fn process(&self, query: &str) -> NoemaResult<QueryOutcome> {
        self.process_with(query, &QueryContext::default())
    }

    /// Process a query with caller-supplied context.
    pub fn process_with(&self, query: &str, context: &QueryContext) -> NoemaResult<QueryOutcome> {
        self.validate_query(query)?;
        let cache_key = text::normalize(query);
        let cacheable = context.is_empty();

        if cacheable {
            if let Some(mut hit) = self.cache.as_ref().and_then(|c| c.get(&cache_key)) {
                tracing::debug!(query = %cache_key, "query cache hit");
                hit.cached = true;
                return Ok(hit);
            }
        }

        let mut patterns = text::query_patterns(query);
        for extra in &context.extra_patterns {
            let extra = text::normalize(extra);
            if !extra.is_empty() && !patterns.contains(&extra) {
                patterns.push(extra);
            }
        }

        let domains = self.store.domains().all();
        let relations = self.store.relations();
        let routed: Vec<String> = self
            .router
            .route(&domains, &relations, query)
            .into_iter()
            .map(|r| r.id)
            .collect();

        let graph = self.store.graph_snapshot();
        let scope: Option<HashSet<String>> =
            (!routed.is_empty()).then(|| routed.iter().cloned().collect());
        let activated = self
            .activation
            .activate_within(&graph, &patterns, scope.as_ref());
        tracing::debug!(
            patterns = patterns.len(),
            activated = activated.len(),
            "activation complete"
        );

        let input = ScoringInput::new(query, &patterns, &activated);
        let (fusion, search_hits) = rayon::join(
            || {
                if activated.is_empty() {
                    return None;
                }
                match self.fusion.run(&input) {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        tracing::warn!(error = %e, "fusion produced no confidence");
                        None
                    }
                }
            },
            || self.search.search(&domains, &graph, query),
        );

        let (decision, final_confidence) = match &fusion {
            Some(outcome) => (Decision::Answer, outcome.final_confidence),
            None => (Decision::OutOfScope, self.config.out_of_scope_confidence),
        };

        let principles = relevant_principles(fusion.as_ref());
        let response = self.renderer.render(&RenderContext {
            query,
            decision,
            confidence: final_confidence,
            activated: &activated,
            hits: &search_hits,
            principles,
        });

        let learning_record = if self.config.learning_enabled {
            self.learn(query, &response, final_confidence, &activated, &patterns)
        } else {
            LearningRecord::default()
        };

        let FusionOutcome {
            results, failures, ..
        } = fusion.unwrap_or_else(|| FusionOutcome {
            final_confidence,
            results: Vec::new(),
            failures: Vec::new(),
        });

        let outcome = QueryOutcome {
            query: query.to_string(),
            final_confidence,
            per_algorithm_results: results,
            scorer_failures: failures,
            activated_domains: activated
                .iter()
                .map(|a| ActivatedDomain {
                    id: a.node.id.clone(),
                    activation: a.activation,
                })
                .collect(),
            routed_domains: routed,
            search_hits,
            decision,
            response,
            learning_record,
            cached: false,
        };

        if cacheable {
            if let (Some(cache), Some(ttl)) = (&self.cache, self.config.cache_ttl_secs) {
                cache.set(&cache_key, outcome.clone(), Duration::from_secs(ttl));
            }
        }

        tracing::info!(
            decision = %outcome.decision,
            confidence = outcome.final_confidence,
            activated = outcome.activated_domains.len(),
            hits = outcome.search_hits.len(),
            "query processed"
        );
        Ok(outcome)
    }

    /// Learning step plus background flush.
    ///
    /// Only domains that matched the query directly count as used; domains
    /// reached purely through propagation are left untouched. Best-effort:
    /// failures are logged and an empty record is returned.
    fn learn(
        &self,
        query: &str,
        response: &str,
        confidence: f64,
        activated: &[ActivatedNode],
        patterns: &[String],
    ) -> LearningRecord {
        let domains_used: Vec<String> = activated
            .iter()
            .filter(|a| a.node.kind == ConceptKind::Domain)
            .filter(|a| matched_pattern_count(&a.node, patterns) > 0)
            .map(|a| a.node.id.clone())
            .collect();
        let interaction = Interaction {
            query: query.to_string(),
            response: response.to_string(),
            confidence,
            domains_used,
        };

        let record = match self.learner.learn(&self.store, &interaction) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "learning step failed");
                return LearningRecord::default();
            }
        };

        if let Some(flusher) = &self.flusher {
            if let Err(e) = flusher.request() {
                tracing::warn!(error = %e, "could not queue background flush");
            }
        }
        record
    }

    /// Activate the graph for a query without fusion, search or learning.
    pub fn activate(&self, query: &str) -> NoemaResult<Vec<ActivatedNode>> {
        self.validate_query(query)?;
        let patterns = text::query_patterns(query);
        Ok(self.activation.activate(&self.store.graph_snapshot(), &patterns))
    }

    /// Run only the recursive search, to an explicit depth.
    pub fn search(&self, query: &str, max_depth: usize) -> NoemaResult<Vec<SearchHit>> {
        self.validate_query(query)?;
        let domains = self.store.domains().all();
        Ok(self
            .search
            .search_to_depth(&domains, &self.store.graph_snapshot(), query, max_depth))
    }

    /// All domains in definition order.
    pub fn domains(&self) -> Vec<Domain> {
        self.store.domains().all()
    }

    /// The most recent interactions, newest first.
    pub fn recent_interactions(&self, n: usize) -> Vec<InteractionRecord> {
        self.store.log().recent(n)
    }

    /// Save the store synchronously. A no-op without a data directory.
    pub fn persist(&self) -> NoemaResult<()> {
        if let Some(durable) = &self.durable {
            durable.save(&self.store.snapshot())?;
            tracing::info!("knowledge store persisted");
        }
        Ok(())
    }

    /// Capture the whole store.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    /// The store snapshot as pretty JSON.
    pub fn export_snapshot_json(&self) -> NoemaResult<String> {
        to_json(&self.store.snapshot())
    }

    /// The interaction log (oldest first) as pretty JSON.
    pub fn export_log_json(&self) -> NoemaResult<String> {
        to_json(&self.store.log().records())
    }

    /// Get engine statistics.
    pub fn info(&self) -> EngineInfo {
        let graph = self.store.graph_snapshot();
        EngineInfo {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            domain_count: self.store.domains().len(),
            concept_count: self.store.domains().concept_count(),
            relation_pairs: self.store.relations().pair_count(),
            log_len: self.store.log().len(),
            log_cap: self.store.log().cap(),
            scorers: self.fusion.scorer_ids().iter().map(|s| s.to_string()).collect(),
            persistent: self.durable.is_some(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> NoemaResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| {
        StoreError::Serialization {
            message: format!("failed to export JSON: {e}"),
        }
        .into()
    })
}

/// Principles the inference scorer kept, most relevant first.
fn relevant_principles(fusion: Option<&FusionOutcome>) -> Vec<&str> {
    let Some(outcome) = fusion else {
        return Vec::new();
    };
    let mut scored: Vec<(&str, f64)> = outcome
        .results
        .iter()
        .filter_map(|r| match &r.explanation {
            Explanation::Inference { principles } => Some(principles),
            _ => None,
        })
        .flatten()
        .map(|p| (p.principle.as_str(), p.relevance))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(p, _)| p).collect()
}

/// Summary statistics about the engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub node_count: usize,
    pub edge_count: usize,
    pub domain_count: usize,
    pub concept_count: usize,
    pub relation_pairs: usize,
    pub log_len: usize,
    pub log_cap: usize,
    pub scorers: Vec<String>,
    pub persistent: bool,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "noema engine info")?;
        writeln!(f, "  nodes:        {}", self.node_count)?;
        writeln!(f, "  edges:        {}", self.edge_count)?;
        writeln!(f, "  domains:      {}", self.domain_count)?;
        writeln!(f, "  concepts:     {}", self.concept_count)?;
        writeln!(f, "  relations:    {}", self.relation_pairs)?;
        writeln!(f, "  log:          {}/{}", self.log_len, self.log_cap)?;
        writeln!(f, "  scorers:      {}", self.scorers.join(", "))?;
        writeln!(f, "  persistent:   {}", self.persistent)?;
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("fusion", &self.fusion)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoemaError;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn create_memory_only_engine() {
        let engine = engine();
        let info = engine.info();
        assert_eq!(info.domain_count, 8);
        assert!(info.node_count > info.domain_count);
        assert!(!info.persistent);
        assert_eq!(info.scorers.len(), 4);
    }

    #[test]
    fn empty_and_long_queries_are_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.process("   ").unwrap_err(),
            NoemaError::Query(QueryError::Empty)
        ));
        let long = "a".repeat(1001);
        assert!(matches!(
            engine.process(&long).unwrap_err(),
            NoemaError::Query(QueryError::TooLong { length: 1001, limit: 1000 })
        ));
        assert!(engine.store().log().is_empty());
    }

    #[test]
    fn config_validation_rejects_bad_floor() {
        let err = Engine::new(EngineConfig {
            out_of_scope_confidence: 0.5,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, NoemaError::Engine(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn config_validation_rejects_huge_cache_ttl() {
        let err = Engine::new(EngineConfig {
            cache_ttl_secs: Some(u64::MAX),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, NoemaError::Engine(EngineError::InvalidConfig { .. })));

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("noema.toml");
        std::fs::write(&path, "cache_ttl_secs = 18446744073709551615\n").unwrap();
        assert!(EngineConfig::from_toml_file(&path).is_err());
    }

    #[test]
    fn longest_cache_ttl_still_serves_queries() {
        let engine = Engine::new(EngineConfig {
            cache_ttl_secs: Some(MAX_CACHE_TTL_SECS),
            ..Default::default()
        })
        .unwrap();
        engine.process("What is a neural network?").unwrap();
        assert!(engine.process("What is a neural network?").unwrap().cached);
    }

    #[test]
    fn config_from_toml_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("noema.toml");
        std::fs::write(&path, "top_k_domains = 2\ncache_ttl_secs = 30\n").unwrap();
        let config = EngineConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.top_k_domains, 2);
        assert_eq!(config.cache_ttl_secs, Some(30));
        assert_eq!(config.max_query_len, 1000);
        assert_eq!(config.seed_pack.as_deref(), Some(DEFAULT_PACK));
    }

    #[test]
    fn unseeded_engine_is_always_out_of_scope() {
        let engine = Engine::new(EngineConfig {
            seed_pack: None,
            ..Default::default()
        })
        .unwrap();
        let outcome = engine.process("quantum entanglement").unwrap();
        assert_eq!(outcome.decision, Decision::OutOfScope);
        assert_eq!(outcome.final_confidence, 0.2);
        assert!(outcome.per_algorithm_results.is_empty());
    }

    #[test]
    fn cache_serves_repeated_queries() {
        let engine = Engine::new(EngineConfig {
            cache_ttl_secs: Some(60),
            ..Default::default()
        })
        .unwrap();
        let first = engine.process("What is a neural network?").unwrap();
        let second = engine.process("what is a   NEURAL network?").unwrap();
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.final_confidence, first.final_confidence);
        assert_eq!(engine.store().log().len(), 1);
    }

    #[test]
    fn principles_sorted_by_relevance() {
        use crate::fusion::{AlgorithmResult, RelevantPrinciple};
        let outcome = FusionOutcome {
            final_confidence: 0.5,
            results: vec![AlgorithmResult {
                algorithm_id: "logical-inference".into(),
                confidence: 0.5,
                weight: 0.9,
                explanation: Explanation::Inference {
                    principles: vec![
                        RelevantPrinciple {
                            node: "a".into(),
                            principle: "weak".into(),
                            relevance: 0.3,
                        },
                        RelevantPrinciple {
                            node: "b".into(),
                            principle: "strong".into(),
                            relevance: 0.9,
                        },
                    ],
                },
            }],
            failures: vec![],
        };
        assert_eq!(relevant_principles(Some(&outcome)), vec!["strong", "weak"]);
    }
}
