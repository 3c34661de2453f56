//! Pattern analysis: re-derives node-vs-query matches, weighted by activation.

use crate::activation::matched_pattern_count;
use crate::concept::{ConceptKind, clamp_unit};
use crate::error::FusionResult;

use super::{Explanation, Scorer, ScorerOutput, ScoringInput};

/// Every matched node-pattern contributes `activation * per_match_gain`.
#[derive(Debug, Clone)]
pub struct PatternAnalysis {
    pub weight: f64,
    pub per_match_gain: f64,
}

impl Default for PatternAnalysis {
    fn default() -> Self {
        Self {
            weight: 0.95,
            per_match_gain: 0.3,
        }
    }
}

impl Scorer for PatternAnalysis {
    fn id(&self) -> &str {
        "pattern-analysis"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, input: &ScoringInput<'_>) -> FusionResult<ScorerOutput> {
        let mut confidence = 0.0;
        let mut matched_patterns = 0;
        let mut matched_domains = Vec::new();

        for activated in input.activated {
            let matches = matched_pattern_count(&activated.node, input.patterns);
            if matches == 0 {
                continue;
            }
            matched_patterns += matches;
            confidence += activated.activation * self.per_match_gain * matches as f64;
            if activated.node.kind == ConceptKind::Domain {
                matched_domains.push(activated.node.id.clone());
            }
        }

        Ok(ScorerOutput {
            confidence: clamp_unit(confidence),
            explanation: Explanation::Patterns {
                matched_domains,
                matched_patterns,
            },
        })
    }
}
