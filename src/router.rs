//! Knowledge routing: which domains should answer a query.
//!
//! A domain's relevance is `2 × (concept matches) + 0.5 × (related domains
//! already selected)`. Ranking is greedy, so a domain related to an earlier
//! pick can overtake an unrelated one with the same match count.
//!
//! [`ClusterDetector`] watches for recurring concepts no domain owns and
//! proposes a new domain once enough of them keep showing up together. The
//! learning step drives it.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use crate::concept::{Domain, DomainRelations};
use crate::text;

/// A domain with its greedy ranking score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDomain {
    pub id: String,
    pub score: f64,
}

/// Greedy domain ranker.
#[derive(Debug, Clone)]
pub struct KnowledgeRouter {
    /// Number of domains selected per query (default: 3).
    pub top_k: usize,
    /// Score per matching concept (default: 2.0).
    pub match_gain: f64,
    /// Score per related, already selected domain (default: 0.5).
    pub related_gain: f64,
}

impl Default for KnowledgeRouter {
    fn default() -> Self {
        Self {
            top_k: 3,
            match_gain: 2.0,
            related_gain: 0.5,
        }
    }
}

impl KnowledgeRouter {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }

    /// Number of the domain's concepts occurring as substrings of the
    /// normalised query. Sharing a word is not enough.
    pub fn concept_matches(domain: &Domain, normalized_query: &str) -> usize {
        domain
            .concepts
            .iter()
            .filter(|concept| normalized_query.contains(concept))
            .count()
    }

    /// Rank every domain greedily. Ties go to the earlier-defined domain.
    pub fn rank(
        &self,
        domains: &[Domain],
        relations: &DomainRelations,
        query: &str,
    ) -> Vec<RankedDomain> {
        let normalized = text::normalize(query);
        let base: Vec<f64> = domains
            .iter()
            .map(|d| self.match_gain * Self::concept_matches(d, &normalized) as f64)
            .collect();

        let mut remaining: Vec<usize> = (0..domains.len()).collect();
        let mut ranked: Vec<RankedDomain> = Vec::with_capacity(domains.len());

        while !remaining.is_empty() {
            let mut best: Option<(usize, f64)> = None;
            for (slot, &i) in remaining.iter().enumerate() {
                let related = ranked
                    .iter()
                    .filter(|r| relations.are_related(&domains[i].id, &r.id))
                    .count();
                let score = base[i] + self.related_gain * related as f64;
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((slot, score));
                }
            }
            let Some((slot, score)) = best else { break };
            let i = remaining.remove(slot);
            ranked.push(RankedDomain {
                id: domains[i].id.clone(),
                score,
            });
        }
        ranked
    }

    /// The top-K domains with a positive score, best first.
    ///
    /// An empty result means no domain has a matching concept and activation
    /// should run unrestricted. Relation bonuses alone never route a domain.
    pub fn route(
        &self,
        domains: &[Domain],
        relations: &DomainRelations,
        query: &str,
    ) -> Vec<RankedDomain> {
        let normalized = text::normalize(query);
        if !domains
            .iter()
            .any(|d| Self::concept_matches(d, &normalized) > 0)
        {
            tracing::debug!("no domain matched, routing unrestricted");
            return Vec::new();
        }
        let routed: Vec<RankedDomain> = self
            .rank(domains, relations, query)
            .into_iter()
            .take(self.top_k)
            .filter(|r| r.score > 0.0)
            .collect();
        tracing::debug!(
            routed = ?routed.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            "domains routed"
        );
        routed
    }
}

/// A proposed domain built from a recurring cluster of unowned concepts.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedDomain {
    pub id: String,
    pub name: String,
    pub concepts: Vec<String>,
}

/// Counts unaffiliated concepts across interactions and proposes new domains.
#[derive(Debug)]
pub struct ClusterDetector {
    counts: Mutex<HashMap<String, u32>>,
    /// Sightings needed before a concept counts towards a cluster (default: 2).
    pub min_sightings: u32,
    /// Recurring concepts needed in one interaction (default: 3).
    pub min_cluster: usize,
}

impl Default for ClusterDetector {
    fn default() -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            min_sightings: 2,
            min_cluster: 3,
        }
    }
}

impl ClusterDetector {
    /// Record the unaffiliated concepts of one interaction.
    ///
    /// Returns a proposal when at least `min_cluster` of them have now been
    /// seen `min_sightings` times; their counters are then reset.
    pub fn observe(&self, unaffiliated: &[String]) -> Option<ProposedDomain> {
        let mut counts = self.counts.lock().expect("cluster counts lock poisoned");
        let mut recurring: Vec<String> = Vec::new();
        for concept in unaffiliated {
            let seen = counts.entry(concept.clone()).or_insert(0);
            *seen += 1;
            if *seen >= self.min_sightings && !recurring.contains(concept) {
                recurring.push(concept.clone());
            }
        }
        if recurring.len() < self.min_cluster {
            return None;
        }
        for concept in &recurring {
            counts.remove(concept);
        }

        let first = &recurring[0];
        let slug: String = first
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        Some(ProposedDomain {
            id: format!("learned-{slug}"),
            name: format!("Learned: {first}"),
            concepts: recurring,
        })
    }

    /// Number of distinct concepts being tracked.
    pub fn tracked(&self) -> usize {
        self.counts.lock().expect("cluster counts lock poisoned").len()
    }
}
