//! Structured result of processing one query.

use std::fmt;

use serde::Serialize;

use crate::fusion::{AlgorithmResult, ScorerFailure};
use crate::learning::LearningRecord;
use crate::search::SearchHit;

/// Whether the engine has something to say about the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Answer,
    OutOfScope,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Answer => write!(f, "ANSWER"),
            Decision::OutOfScope => write!(f, "OUT_OF_SCOPE"),
        }
    }
}

/// An activated node as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivatedDomain {
    pub id: String,
    pub activation: f64,
}

/// Everything the engine produced for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub query: String,
    pub final_confidence: f64,
    pub per_algorithm_results: Vec<AlgorithmResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scorer_failures: Vec<ScorerFailure>,
    pub activated_domains: Vec<ActivatedDomain>,
    /// Domains selected by the router, best first.
    pub routed_domains: Vec<String>,
    pub search_hits: Vec<SearchHit>,
    pub decision: Decision,
    pub response: String,
    pub learning_record: LearningRecord,
    /// Whether this outcome was served from the query cache.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.response)?;
        writeln!(f)?;
        writeln!(
            f,
            "decision: {}  confidence: {:.3}",
            self.decision, self.final_confidence
        )?;
        for r in &self.per_algorithm_results {
            writeln!(
                f,
                "  {:<18} {:.3} (weight {:.2})",
                r.algorithm_id, r.confidence, r.weight
            )?;
        }
        if !self.activated_domains.is_empty() {
            let active: Vec<String> = self
                .activated_domains
                .iter()
                .map(|a| format!("{} {:.2}", a.id, a.activation))
                .collect();
            writeln!(f, "activated: {}", active.join(", "))?;
        }
        if !self.learning_record.new_concepts_found.is_empty() {
            writeln!(
                f,
                "learned: {}",
                self.learning_record.new_concepts_found.join(", ")
            )?;
        }
        Ok(())
    }
}
