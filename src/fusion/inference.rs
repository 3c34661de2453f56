//! Logical inference: which principles of the activated nodes bear on the query.
//!
//! A principle's relevance is the share of its words (length > 2) that share
//! a substring with some query word. Principles above `min_relevance` are
//! kept, and each kept principle adds `activation * per_principle_gain`.

use crate::concept::clamp_unit;
use crate::error::FusionResult;
use crate::text;

use super::{Explanation, RelevantPrinciple, Scorer, ScorerOutput, ScoringInput};

#[derive(Debug, Clone)]
pub struct LogicalInference {
    pub weight: f64,
    pub min_relevance: f64,
    pub per_principle_gain: f64,
}

impl Default for LogicalInference {
    fn default() -> Self {
        Self {
            weight: 0.90,
            min_relevance: 0.2,
            per_principle_gain: 0.4,
        }
    }
}

/// Fraction of principle words (length > 2) overlapping a query word.
pub fn principle_relevance(principle: &str, query_words: &[String]) -> f64 {
    let normalized = text::normalize(principle);
    let words = text::tokens(&normalized);
    if words.is_empty() {
        return 0.0;
    }
    let overlapping = words
        .iter()
        .filter(|w| w.chars().count() > 2)
        .filter(|w| query_words.iter().any(|q| text::mutual_contains(q, w)))
        .count();
    overlapping as f64 / words.len() as f64
}

impl Scorer for LogicalInference {
    fn id(&self) -> &str {
        "logical-inference"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, input: &ScoringInput<'_>) -> FusionResult<ScorerOutput> {
        let mut confidence = 0.0;
        let mut principles = Vec::new();

        for activated in input.activated {
            let mut kept = 0usize;
            for principle in &activated.node.principles {
                let relevance = principle_relevance(principle, &input.words);
                if relevance > self.min_relevance {
                    kept += 1;
                    principles.push(RelevantPrinciple {
                        node: activated.node.id.clone(),
                        principle: principle.clone(),
                        relevance,
                    });
                }
            }
            confidence += activated.activation * self.per_principle_gain * kept as f64;
        }

        Ok(ScorerOutput {
            confidence: clamp_unit(confidence),
            explanation: Explanation::Inference { principles },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{ActivatedNode, ConceptKind, ConceptNode};

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn relevance_counts_long_overlapping_words() {
        // "energy" and "conserved" overlap; "is" is too short; 2 of 3 words.
        let r = principle_relevance("Energy is conserved", &words(&["energy", "conserve"]));
        assert!((r - 2.0 / 3.0).abs() < 1e-12, "got {r}");
    }

    #[test]
    fn unrelated_principle_has_zero_relevance() {
        assert_eq!(principle_relevance("Cells divide", &words(&["market"])), 0.0);
        assert_eq!(principle_relevance("", &words(&["market"])), 0.0);
    }

    #[test]
    fn kept_principles_accumulate_by_activation() {
        let node = ConceptNode::new("physics", ConceptKind::Domain, 0.9).with_principles([
            "Energy is conserved",
            "Forces cause acceleration",
            "Entropy tends to increase",
        ]);
        let nodes = vec![ActivatedNode {
            node,
            activation: 0.5,
        }];
        let input = ScoringInput::new("why is energy conserved under force", &[], &nodes);

        let out = LogicalInference::default().score(&input).unwrap();
        // "Energy is conserved" and "Forces cause acceleration" (force ⊂ forces: 1/3 > 0.2).
        assert!((out.confidence - 0.5 * 0.4 * 2.0).abs() < 1e-12);
        match out.explanation {
            Explanation::Inference { principles } => {
                assert_eq!(principles.len(), 2);
                assert_eq!(principles[0].node, "physics");
            }
            other => panic!("unexpected explanation {other:?}"),
        }
    }
}
