//! Adaptive learning: deterministic bookkeeping after every interaction.
//!
//! A learning step extracts candidate concepts from the query, merges the new
//! ones into the concept sets of the domains used, bumps their usage
//! counters, reinforces the association between every pair of co-used
//! domains by `confidence × reinforcement_rate` in both directions, and
//! appends the interaction to the bounded log. Concepts no domain owns feed a
//! [`ClusterDetector`]; a recurring cluster becomes a new domain.
//!
//! Steps, domain creation included, are serialised by an internal mutex so
//! concurrent queries never lose updates. Nothing decays: concept sets and
//! association weights only grow.

pub mod extract;

use std::sync::Mutex;

use serde::Serialize;

use crate::concept::{Domain, InteractionRecord, now_secs};
use crate::error::NoemaResult;
use crate::router::{ClusterDetector, ProposedDomain};
use crate::store::KnowledgeStore;

pub use extract::ConceptExtractor;

/// Weight of a domain created from a recurring concept cluster.
pub const LEARNED_DOMAIN_WEIGHT: f64 = 0.5;

/// What one interaction contributes to learning.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub query: String,
    pub response: String,
    pub confidence: f64,
    /// Domains that took part in answering, in routing order.
    pub domains_used: Vec<String>,
}

/// One association reinforcement, with the resulting weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reinforcement {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

/// What a learning step changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearningRecord {
    /// Concepts newly added to at least one domain.
    pub new_concepts_found: Vec<String>,
    /// Domains whose counters (and possibly concepts) were updated.
    pub domains_updated: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reinforced: Vec<Reinforcement>,
    /// Domains created from recurring unaffiliated concepts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub domains_created: Vec<String>,
    /// Extracted concepts no domain owns after the merge.
    #[serde(skip)]
    pub unaffiliated: Vec<String>,
}

/// Applies learning steps to a [`KnowledgeStore`].
#[derive(Debug)]
pub struct AdaptiveLearner {
    extractor: ConceptExtractor,
    reinforcement_rate: f64,
    clusters: ClusterDetector,
    step: Mutex<()>,
}

impl AdaptiveLearner {
    pub fn new(extractor: ConceptExtractor, reinforcement_rate: f64) -> Self {
        Self {
            extractor,
            reinforcement_rate,
            clusters: ClusterDetector::default(),
            step: Mutex::new(()),
        }
    }

    /// Replace the cluster detector used for domain creation.
    pub fn with_clusters(mut self, clusters: ClusterDetector) -> Self {
        self.clusters = clusters;
        self
    }

    pub fn clusters(&self) -> &ClusterDetector {
        &self.clusters
    }

    pub fn extractor(&self) -> &ConceptExtractor {
        &self.extractor
    }

    /// Run one learning step.
    pub fn learn(
        &self,
        store: &KnowledgeStore,
        interaction: &Interaction,
    ) -> NoemaResult<LearningRecord> {
        let _guard = self.step.lock().expect("learning lock poisoned");
        let now = now_secs();
        let candidates = self.extractor.extract(&interaction.query);

        let mut record = LearningRecord::default();
        let domains_used: Vec<&String> = interaction
            .domains_used
            .iter()
            .filter(|id| store.domains().contains(id))
            .collect();

        for id in &domains_used {
            let added: Vec<String> = store
                .domains()
                .update(id, |domain| {
                    domain.interaction_count += 1;
                    domain.last_used = now;
                    candidates
                        .iter()
                        .filter(|c| domain.concepts.insert(c))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if store.graph().snapshot().contains(id) {
                store.graph().update(|state| state.touch(id, now))?;
            }
            for concept in added {
                if !record.new_concepts_found.contains(&concept) {
                    record.new_concepts_found.push(concept);
                }
            }
            record.domains_updated.push((*id).clone());
        }

        let delta = interaction.confidence.max(0.0) * self.reinforcement_rate;
        if delta > 0.0 {
            for (i, a) in domains_used.iter().enumerate() {
                for b in &domains_used[i + 1..] {
                    let (ab, ba) = store.graph().update(|state| {
                        Ok((state.strengthen(a, b, delta)?, state.strengthen(b, a, delta)?))
                    })?;
                    record.reinforced.push(Reinforcement {
                        from: (*a).clone(),
                        to: (*b).clone(),
                        weight: ab,
                    });
                    record.reinforced.push(Reinforcement {
                        from: (*b).clone(),
                        to: (*a).clone(),
                        weight: ba,
                    });
                }
            }
        }

        record.unaffiliated = candidates
            .iter()
            .filter(|c| store.domains().owner_of(c).is_none())
            .cloned()
            .collect();

        if let Some(proposal) = self.clusters.observe(&record.unaffiliated) {
            let id = proposal.id.clone();
            match create_learned_domain(store, proposal) {
                Ok(concepts) => {
                    tracing::info!(domain = %id, concepts, "learned new domain");
                    record
                        .unaffiliated
                        .retain(|c| store.domains().owner_of(c).is_none());
                    record.domains_created.push(id);
                }
                Err(e) => {
                    tracing::warn!(domain = %id, error = %e, "failed to create learned domain")
                }
            }
        }

        store.log().push(InteractionRecord {
            query: interaction.query.clone(),
            response: interaction.response.clone(),
            confidence: interaction.confidence,
            domains_used: record.domains_updated.clone(),
            new_concepts: record.new_concepts_found.clone(),
            timestamp: now,
        });

        tracing::debug!(
            new_concepts = record.new_concepts_found.len(),
            domains = record.domains_updated.len(),
            reinforced = record.reinforced.len(),
            "learning step applied"
        );
        Ok(record)
    }
}

/// Add the proposed domain, or merge into it if the id already exists.
///
/// Returns the size of the domain's concept set afterwards.
fn create_learned_domain(store: &KnowledgeStore, proposal: ProposedDomain) -> NoemaResult<usize> {
    let merged = store.domains().update(&proposal.id, |d| {
        for c in &proposal.concepts {
            d.concepts.insert(c);
        }
        d.concepts.len()
    });
    if let Some(len) = merged {
        return Ok(len);
    }
    let domain = Domain::new(&proposal.id, &proposal.name).with_concepts(&proposal.concepts);
    let len = domain.concepts.len();
    store.add_domain(domain, None, LEARNED_DOMAIN_WEIGHT)?;
    Ok(len)
}

impl Default for AdaptiveLearner {
    fn default() -> Self {
        Self::new(ConceptExtractor::default(), 0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Domain;
    use std::sync::Arc;

    fn store() -> KnowledgeStore {
        let store = KnowledgeStore::default();
        for (id, name) in [("mathematics", "Mathematics"), ("physics", "Physics")] {
            store.add_domain(Domain::new(id, name), None, 0.8).unwrap();
        }
        store
    }

    fn interaction(query: &str, confidence: f64, domains: &[&str]) -> Interaction {
        Interaction {
            query: query.into(),
            response: "ok".into(),
            confidence,
            domains_used: domains.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn merges_new_concepts_and_counts_usage() {
        let store = store();
        let learner = AdaptiveLearner::default();

        let record = learner
            .learn(&store, &interaction("tensor calculus", 0.5, &["mathematics"]))
            .unwrap();
        assert_eq!(record.new_concepts_found, vec!["tensor calculus", "tensor", "calculus"]);
        assert_eq!(record.domains_updated, vec!["mathematics"]);

        let again = learner
            .learn(&store, &interaction("Tensor Calculus", 0.5, &["mathematics"]))
            .unwrap();
        assert!(again.new_concepts_found.is_empty());

        let math = store.domains().get("mathematics").unwrap();
        assert_eq!(math.interaction_count, 2);
        assert_eq!(math.concepts.len(), 3);
        assert!(math.last_used > 0);
        assert_eq!(store.log().len(), 2);
    }

    #[test]
    fn co_used_domains_reinforce_both_directions() {
        let store = store();
        let learner = AdaptiveLearner::default();
        learner
            .learn(&store, &interaction("orbital mechanics", 0.8, &["mathematics", "physics"]))
            .unwrap();
        let w = store.association("mathematics", "physics").unwrap();
        assert!((w - 0.08).abs() < 1e-12);
        assert_eq!(store.association("physics", "mathematics"), Some(w));

        for _ in 0..20 {
            learner
                .learn(&store, &interaction("orbital mechanics", 1.0, &["mathematics", "physics"]))
                .unwrap();
        }
        assert_eq!(store.association("mathematics", "physics"), Some(1.0));
    }

    #[test]
    fn unknown_domains_are_ignored() {
        let store = store();
        let record = AdaptiveLearner::default()
            .learn(&store, &interaction("quantum foam", 0.9, &["ghost"]))
            .unwrap();
        assert!(record.domains_updated.is_empty());
        assert_eq!(record.unaffiliated, vec!["quantum foam", "quantum", "foam"]);
        assert_eq!(store.log().len(), 1);
    }

    #[test]
    fn concurrent_steps_do_not_lose_updates() {
        let store = Arc::new(store());
        let learner = Arc::new(AdaptiveLearner::default());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                let learner = Arc::clone(&learner);
                std::thread::spawn(move || {
                    let query = format!("topic{i} lattice");
                    learner
                        .learn(&store, &interaction(&query, 0.5, &["mathematics", "physics"]))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let math = store.domains().get("mathematics").unwrap();
        assert_eq!(math.interaction_count, 16);
        assert!(math.concepts.contains("lattice"));
        assert!((0..16).all(|i| math.concepts.contains(&format!("topic{i}"))));
        let w = store.association("mathematics", "physics").unwrap();
        assert!((w - 0.8).abs() < 1e-9);
    }

    #[test]
    fn recurring_cluster_becomes_a_domain() {
        let store = store();
        let learner = AdaptiveLearner::default();
        let query = "origami crease pattern";

        let first = learner.learn(&store, &interaction(query, 0.2, &[])).unwrap();
        assert!(first.domains_created.is_empty());
        let second = learner.learn(&store, &interaction(query, 0.2, &[])).unwrap();
        assert_eq!(second.domains_created, vec!["learned-origami-crease"]);
        assert!(second.unaffiliated.is_empty());

        let learned = store.domains().get("learned-origami-crease").unwrap();
        assert_eq!(learned.concepts.len(), learner.extractor().extract(query).len());
        assert!(store.graph().snapshot().contains("learned-origami-crease"));
    }

    #[test]
    fn concurrent_steps_create_a_learned_domain_once() {
        let store = Arc::new(store());
        let learner = Arc::new(AdaptiveLearner::default());
        let query = "zorblax quintessence flumogen";
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let learner = Arc::clone(&learner);
                std::thread::spawn(move || {
                    learner
                        .learn(&store, &interaction(query, 0.2, &[]))
                        .unwrap()
                        .domains_created
                })
            })
            .collect();
        let created: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(created, vec!["learned-zorblax-quintessence"]);
        assert_eq!(store.domains().len(), 3);
        let learned = store.domains().get(&created[0]).unwrap();
        assert_eq!(learned.concepts.len(), learner.extractor().extract(query).len());
        assert_eq!(learner.clusters().tracked(), 0);
        assert_eq!(store.log().len(), 16);
    }
}
