//! Depth-bounded recursive search over domain concepts.
//!
//! Each level does three things:
//!
//! 1. **Direct match**: the query text against stored concept strings. 0.9
//!    on containment: the concept occurs in the query starting at a word
//!    boundary (`networks` contains `network`), or the concept contains the
//!    whole query. 0.7 on token overlap: the two only share a word or a word
//!    stem.
//! 2. **Association expansion**: every domain matched at this level pulls in
//!    the concepts of associated domains whose association weight is at least
//!    the semantic threshold, at relevance = association weight.
//! 3. **Recursion**: each direct match becomes the query for its owning
//!    domain's sibling concepts one level down, discounted by 0.1 per level.
//!
//! The visited set is cloned into every branch, so sibling branches do not
//! see each other's visits. Per-level branching is capped, and depth is never
//! exceeded, so the search terminates on cyclic association graphs.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::concept::{ConceptKind, Domain, clamp_unit};
use crate::graph::index::GraphState;
use crate::text;

/// Tunables for the recursive search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Maximum recursion depth (default: 3). Depth 0 returns nothing.
    pub max_depth: usize,
    /// Maximum matches followed per level (default: 8).
    pub max_branching: usize,
    /// Minimum association weight followed during expansion (default: 0.7).
    pub semantic_threshold: f64,
    /// Relevance subtracted per level below the first (default: 0.1).
    pub depth_discount: f64,
    /// Relevance of a containment match (default: 0.9).
    pub containment_relevance: f64,
    /// Relevance of a stem-overlap match (default: 0.7).
    pub overlap_relevance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_branching: 8,
            semantic_threshold: 0.7,
            depth_discount: 0.1,
            containment_relevance: 0.9,
            overlap_relevance: 0.7,
        }
    }
}

/// How a hit was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HitSource {
    /// Matched the query directly.
    Direct,
    /// Pulled in through an association from domain `via`.
    Association { via: String, weight: f64 },
    /// Sibling of the concept `via`, found `depth` levels down.
    Sibling { via: String, depth: usize },
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub domain: String,
    pub concept: String,
    /// Relevance in [0, 1].
    pub relevance: f64,
    pub source: HitSource,
}

impl SearchHit {
    /// Association weight used for ranking: the edge weight for
    /// association hits, 1.0 otherwise.
    pub fn association_weight(&self) -> f64 {
        match self.source {
            HitSource::Association { weight, .. } => weight,
            _ => 1.0,
        }
    }

    /// Ranking key: `relevance × association weight`.
    pub fn rank(&self) -> f64 {
        self.relevance * self.association_weight()
    }
}

/// What is being looked for at one level.
#[derive(Debug, Clone)]
struct Needle {
    normalized: String,
    /// `normalized` padded with spaces for word-boundary containment.
    padded: String,
    terms: Vec<String>,
    stems: HashSet<String>,
}

impl Needle {
    fn new(text: &str) -> Self {
        let normalized = text::normalize(text);
        let terms: Vec<String> = text::content_tokens(&normalized)
            .into_iter()
            .map(str::to_string)
            .collect();
        let stems = terms.iter().map(|t| text::light_stem(t)).collect();
        Self {
            padded: format!(" {normalized} "),
            normalized,
            terms,
            stems,
        }
    }

    fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Match relevance of a stored concept against this needle, if any.
    fn relevance(&self, concept: &str, config: &SearchConfig) -> Option<f64> {
        if concept.is_empty() {
            return None;
        }
        let contained = self.padded.contains(&format!(" {concept}"))
            || (!self.normalized.is_empty() && concept.contains(self.normalized.as_str()));
        if contained {
            return Some(config.containment_relevance);
        }
        let overlaps = text::tokens(concept).iter().any(|w| {
            self.terms.iter().any(|t| t.as_str() == *w) || self.stems.contains(&text::light_stem(w))
        });
        overlaps.then_some(config.overlap_relevance)
    }
}

/// A direct match found at one level.
#[derive(Debug, Clone)]
struct Match {
    domain: String,
    concept: String,
    relevance: f64,
}

type Visited = HashSet<(String, String)>;

/// Read-only inputs of one search.
struct SearchScope<'a> {
    domains: &'a [Domain],
    by_id: HashMap<&'a str, &'a Domain>,
    graph: &'a GraphState,
}

/// Recursive semantic search over domains and their associations.
#[derive(Debug, Clone, Default)]
pub struct RecursiveSearch {
    config: SearchConfig,
}

impl RecursiveSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search with the configured maximum depth.
    pub fn search(&self, domains: &[Domain], graph: &GraphState, query: &str) -> Vec<SearchHit> {
        self.search_to_depth(domains, graph, query, self.config.max_depth)
    }

    /// Search the domains (definition order) and their associations in `graph`.
    ///
    /// Results are deduplicated by `(domain, concept)` keeping the highest
    /// relevance, and ordered by [`SearchHit::rank`] descending with ties in
    /// discovery order.
    pub fn search_to_depth(
        &self,
        domains: &[Domain],
        graph: &GraphState,
        query: &str,
        max_depth: usize,
    ) -> Vec<SearchHit> {
        let needle = Needle::new(query);
        if max_depth == 0 || needle.is_empty() {
            return Vec::new();
        }
        let scope = SearchScope {
            domains,
            by_id: domains.iter().map(|d| (d.id.as_str(), d)).collect(),
            graph,
        };

        let mut hits = Vec::new();
        self.descend(&scope, &needle, None, 0, max_depth, Visited::new(), &mut hits);
        let ranked = rank(hits);
        tracing::debug!(query, max_depth, hits = ranked.len(), "search complete");
        ranked
    }

    #[allow(clippy::too_many_arguments)]
    fn descend(
        &self,
        scope: &SearchScope<'_>,
        needle: &Needle,
        within: Option<(&str, &str)>,
        level: usize,
        depth_left: usize,
        visited: Visited,
        hits: &mut Vec<SearchHit>,
    ) {
        if depth_left == 0 {
            return;
        }
        let discount = self.config.depth_discount * level as f64;
        let matches = self.direct_matches(scope, needle, within.map(|(d, _)| d), &visited);
        if matches.is_empty() {
            return;
        }

        let mut visited = visited;
        for m in &matches {
            visited.insert((m.domain.clone(), m.concept.clone()));
        }

        for m in &matches {
            let relevance = clamp_unit(m.relevance - discount);
            if relevance <= 0.0 {
                continue;
            }
            let source = match within {
                None => HitSource::Direct,
                Some((_, via)) => HitSource::Sibling {
                    via: via.to_string(),
                    depth: level,
                },
            };
            hits.push(SearchHit {
                domain: m.domain.clone(),
                concept: m.concept.clone(),
                relevance,
                source,
            });
        }

        self.expand_associations(scope, &matches, discount, &visited, hits);

        for m in &matches {
            let next = Needle::new(&m.concept);
            if next.is_empty() {
                continue;
            }
            self.descend(
                scope,
                &next,
                Some((m.domain.as_str(), m.concept.as_str())),
                level + 1,
                depth_left - 1,
                visited.clone(),
                hits,
            );
        }
    }

    /// Concepts matching the needle, restricted to one domain when `only` is set.
    fn direct_matches(
        &self,
        scope: &SearchScope<'_>,
        needle: &Needle,
        only: Option<&str>,
        visited: &Visited,
    ) -> Vec<Match> {
        let candidates: Vec<&Domain> = match only {
            Some(id) => scope.by_id.get(id).copied().into_iter().collect(),
            None => scope.domains.iter().collect(),
        };
        let mut matches = Vec::new();
        for domain in candidates {
            for concept in domain.concepts.iter() {
                if visited.contains(&(domain.id.clone(), concept.to_string())) {
                    continue;
                }
                if let Some(relevance) = needle.relevance(concept, &self.config) {
                    matches.push(Match {
                        domain: domain.id.clone(),
                        concept: concept.to_string(),
                        relevance,
                    });
                    if matches.len() == self.config.max_branching {
                        return matches;
                    }
                }
            }
        }
        matches
    }

    fn expand_associations(
        &self,
        scope: &SearchScope<'_>,
        matches: &[Match],
        discount: f64,
        visited: &Visited,
        hits: &mut Vec<SearchHit>,
    ) {
        let mut seen_domains: Vec<&str> = Vec::new();
        for m in matches {
            if !seen_domains.contains(&m.domain.as_str()) {
                seen_domains.push(&m.domain);
            }
        }

        for via in seen_domains {
            let associated = scope
                .graph
                .neighbors(via)
                .into_iter()
                .filter(|(node, weight)| {
                    node.kind == ConceptKind::Domain
                        && node.id != via
                        && *weight >= self.config.semantic_threshold
                })
                .take(self.config.max_branching);

            for (node, weight) in associated {
                let Some(domain) = scope.by_id.get(node.id.as_str()) else {
                    continue;
                };
                let relevance = clamp_unit(weight - discount);
                if relevance <= 0.0 {
                    continue;
                }
                for concept in domain
                    .concepts
                    .iter()
                    .filter(|c| !visited.contains(&(domain.id.clone(), c.to_string())))
                    .take(self.config.max_branching)
                {
                    hits.push(SearchHit {
                        domain: domain.id.clone(),
                        concept: concept.to_string(),
                        relevance,
                        source: HitSource::Association {
                            via: via.to_string(),
                            weight,
                        },
                    });
                }
            }
        }
    }
}

/// Deduplicate by `(domain, concept)` keeping the best relevance, then sort
/// by rank descending. Sorting is stable, so ties keep discovery order.
fn rank(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut unique: Vec<SearchHit> = Vec::new();
    for hit in hits {
        let key = (hit.domain.clone(), hit.concept.clone());
        match positions.get(&key) {
            Some(&i) if unique[i].relevance < hit.relevance => unique[i] = hit,
            Some(_) => {}
            None => {
                positions.insert(key, unique.len());
                unique.push(hit);
            }
        }
    }
    unique.sort_by(|a, b| {
        b.rank()
            .partial_cmp(&a.rank())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    unique
}
