//! Response shaping: estimates how well-formed an answer built from the
//! activated nodes would be.

use serde::Serialize;

use crate::concept::{ConceptKind, clamp_unit};
use crate::error::FusionResult;

use super::{Explanation, Scorer, ScorerOutput, ScoringInput};

/// Five answer-quality metrics, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityVector {
    pub clarity: f64,
    pub completeness: f64,
    pub actionability: f64,
    pub structure: f64,
    pub relevance: f64,
}

impl QualityVector {
    /// Quality assumed before looking at any structural cue.
    pub const BASELINE: QualityVector = QualityVector {
        clarity: 0.6,
        completeness: 0.5,
        actionability: 0.5,
        structure: 0.5,
        relevance: 0.6,
    };

    pub fn mean(&self) -> f64 {
        (self.clarity + self.completeness + self.actionability + self.structure + self.relevance)
            / 5.0
    }

    fn clamped(self) -> Self {
        Self {
            clarity: clamp_unit(self.clarity),
            completeness: clamp_unit(self.completeness),
            actionability: clamp_unit(self.actionability),
            structure: clamp_unit(self.structure),
            relevance: clamp_unit(self.relevance),
        }
    }
}

impl Default for QualityVector {
    fn default() -> Self {
        Self::BASELINE
    }
}

#[derive(Debug, Clone)]
pub struct ResponseShaping {
    pub weight: f64,
}

impl Default for ResponseShaping {
    fn default() -> Self {
        Self { weight: 0.80 }
    }
}

impl ResponseShaping {
    /// Nudge the baseline by the cues present in the activated set.
    pub fn assess(&self, input: &ScoringInput<'_>) -> QualityVector {
        let nodes = input.activated;
        let mut q = QualityVector::BASELINE;

        if nodes.iter().any(|a| a.node.kind == ConceptKind::Strategy) {
            q.actionability += 0.2;
            q.structure += 0.15;
        }
        if nodes.iter().any(|a| !a.node.principles.is_empty()) {
            q.completeness += 0.2;
            q.clarity += 0.1;
        }
        if nodes.iter().any(|a| !a.node.techniques.is_empty()) {
            q.actionability += 0.1;
            q.structure += 0.1;
            q.completeness += 0.05;
        }
        if nodes.iter().any(|a| a.node.kind == ConceptKind::Domain) {
            q.relevance += 0.2;
        }
        q.clamped()
    }
}

impl Scorer for ResponseShaping {
    fn id(&self) -> &str {
        "response-shaping"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, input: &ScoringInput<'_>) -> FusionResult<ScorerOutput> {
        let metrics = self.assess(input);
        Ok(ScorerOutput {
            confidence: clamp_unit(metrics.mean()),
            explanation: Explanation::Quality { metrics },
        })
    }
}
