//! Multi-algorithm confidence fusion.
//!
//! Independent [`Scorer`]s each turn `(query, activated nodes)` into a
//! confidence in [0, 1] plus an explanation. Their confidences are combined by
//! a weighted mean over the scorers that succeeded:
//!
//! ```text
//! final = Σ(c_i · w_i) / Σ(w_i)
//! ```
//!
//! The reduction is order-independent, so scorers run in parallel on rayon.
//! A failing scorer is logged and excluded; the mean is renormalised over the
//! rest.

pub mod inference;
pub mod pattern;
pub mod shaping;
pub mod synthesis;

use rayon::prelude::*;
use serde::Serialize;

use crate::concept::{ActivatedNode, clamp_unit};
use crate::error::{FusionError, FusionResult};
use crate::text;

pub use inference::LogicalInference;
pub use pattern::PatternAnalysis;
pub use shaping::{QualityVector, ResponseShaping};
pub use synthesis::KnowledgeSynthesis;

/// What a scorer sees: the query and the activated nodes of one snapshot.
#[derive(Debug, Clone)]
pub struct ScoringInput<'a> {
    /// Normalised query text.
    pub query: String,
    /// Activation patterns derived from the query.
    pub patterns: &'a [String],
    /// Content words of the query (stopwords and short tokens removed).
    pub words: Vec<String>,
    /// Activated nodes, strongest first.
    pub activated: &'a [ActivatedNode],
}

impl<'a> ScoringInput<'a> {
    pub fn new(query: &str, patterns: &'a [String], activated: &'a [ActivatedNode]) -> Self {
        let query = text::normalize(query);
        let words = text::content_tokens(&query)
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            query,
            patterns,
            words,
            activated,
        }
    }
}

/// A principle judged relevant to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevantPrinciple {
    pub node: String,
    pub principle: String,
    pub relevance: f64,
}

/// Pairwise synergy between two activated nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSynergy {
    pub first: String,
    pub second: String,
    pub score: f64,
}

/// Scorer-specific explanation payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Explanation {
    Patterns {
        matched_domains: Vec<String>,
        matched_patterns: usize,
    },
    Inference {
        principles: Vec<RelevantPrinciple>,
    },
    Synthesis {
        pairs: Vec<PairSynergy>,
        total_score: f64,
    },
    Quality {
        metrics: QualityVector,
    },
    Note {
        message: String,
    },
}

/// Output of a single scorer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorerOutput {
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub explanation: Explanation,
}

/// An independent scoring strategy.
pub trait Scorer: Send + Sync {
    /// Stable identifier reported in results.
    fn id(&self) -> &str;

    /// Static importance weight, strictly positive.
    fn weight(&self) -> f64;

    /// Score the input. Must not depend on any other scorer.
    fn score(&self, input: &ScoringInput<'_>) -> FusionResult<ScorerOutput>;
}

/// One successful scorer, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmResult {
    pub algorithm_id: String,
    pub confidence: f64,
    pub weight: f64,
    pub explanation: Explanation,
}

/// A scorer that was excluded from the fusion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorerFailure {
    pub algorithm_id: String,
    pub message: String,
}

/// Result of running every scorer and fusing their confidences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionOutcome {
    pub final_confidence: f64,
    pub results: Vec<AlgorithmResult>,
    pub failures: Vec<ScorerFailure>,
}

/// Weighted mean `Σ(c·w)/Σ(w)` of `(confidence, weight)` pairs.
///
/// Returns `None` for an empty input or a zero total weight.
pub fn combine(scores: &[(f64, f64)]) -> Option<f64> {
    let (numerator, denominator) = scores
        .iter()
        .fold((0.0, 0.0), |(n, d), (c, w)| (n + c * w, d + w));
    (denominator > 0.0).then(|| numerator / denominator)
}

/// Runs a fixed set of scorers and fuses their output.
pub struct FusionEngine {
    scorers: Vec<Box<dyn Scorer>>,
}

impl FusionEngine {
    /// The four standard scorers with their default importance weights.
    pub fn standard() -> Self {
        Self {
            scorers: vec![
                Box::new(PatternAnalysis::default()),
                Box::new(LogicalInference::default()),
                Box::new(KnowledgeSynthesis::default()),
                Box::new(ResponseShaping::default()),
            ],
        }
    }

    /// Build from custom scorers; every weight must be strictly positive.
    pub fn with_scorers(scorers: Vec<Box<dyn Scorer>>) -> FusionResult<Self> {
        for scorer in &scorers {
            let weight = scorer.weight();
            if !(weight > 0.0 && weight.is_finite()) {
                return Err(FusionError::InvalidWeight {
                    scorer: scorer.id().to_string(),
                    weight,
                });
            }
        }
        Ok(Self { scorers })
    }

    pub fn scorer_ids(&self) -> Vec<&str> {
        self.scorers.iter().map(|s| s.id()).collect()
    }

    /// Run every scorer in parallel and fuse the successful ones.
    ///
    /// Fails only when no scorer succeeds.
    pub fn run(&self, input: &ScoringInput<'_>) -> FusionResult<FusionOutcome> {
        let outputs: Vec<(usize, FusionResult<ScorerOutput>)> = self
            .scorers
            .par_iter()
            .enumerate()
            .map(|(i, scorer)| (i, scorer.score(input)))
            .collect();

        let mut results = Vec::with_capacity(outputs.len());
        let mut failures = Vec::new();
        for (i, output) in outputs {
            let scorer = &self.scorers[i];
            match output {
                Ok(out) if out.confidence.is_finite() => results.push(AlgorithmResult {
                    algorithm_id: scorer.id().to_string(),
                    confidence: clamp_unit(out.confidence),
                    weight: scorer.weight(),
                    explanation: out.explanation,
                }),
                Ok(out) => {
                    tracing::warn!(
                        scorer = scorer.id(),
                        confidence = out.confidence,
                        "scorer returned a non-finite confidence, excluding"
                    );
                    failures.push(ScorerFailure {
                        algorithm_id: scorer.id().to_string(),
                        message: format!("non-finite confidence {}", out.confidence),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        scorer = scorer.id(),
                        error = %e,
                        "scorer failed, excluding from fusion"
                    );
                    failures.push(ScorerFailure {
                        algorithm_id: scorer.id().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let pairs: Vec<(f64, f64)> = results.iter().map(|r| (r.confidence, r.weight)).collect();
        let final_confidence = combine(&pairs).ok_or(FusionError::AllFailed {
            count: self.scorers.len(),
        })?;

        tracing::debug!(
            final_confidence,
            succeeded = results.len(),
            failed = failures.len(),
            "fusion complete"
        );

        Ok(FusionOutcome {
            final_confidence,
            results,
            failures,
        })
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for FusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionEngine")
            .field("scorers", &self.scorer_ids())
            .finish()
    }
}
