//! Knowledge fusion: rewards combinations of activated nodes that work well together.
//!
//! Every unordered pair scores `both_principled_bonus` when both nodes carry
//! principles, plus a table bonus for known productive domain pairings. The
//! confidence is the pair total divided by the number of activated nodes.

use crate::concept::clamp_unit;
use crate::error::FusionResult;

use super::{Explanation, PairSynergy, Scorer, ScorerOutput, ScoringInput};

/// Domain pairings known to produce useful cross-domain answers.
pub const PRODUCTIVE_PAIRS: &[(&str, &str, f64)] = &[
    ("mathematics", "physics", 0.6),
    ("mathematics", "computer_science", 0.6),
    ("computer_science", "linguistics", 0.5),
    ("biology", "psychology", 0.5),
    ("economics", "psychology", 0.5),
    ("economics", "mathematics", 0.5),
    ("philosophy", "psychology", 0.4),
    ("computer_science", "physics", 0.4),
    ("biology", "computer_science", 0.4),
    ("mathematics", "philosophy", 0.4),
    ("first_principles", "physics", 0.4),
    ("problem_decomposition", "computer_science", 0.4),
];

/// Table bonus for a pair, independent of argument order.
pub fn pair_bonus(a: &str, b: &str) -> f64 {
    PRODUCTIVE_PAIRS
        .iter()
        .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
        .map(|(_, _, bonus)| *bonus)
        .unwrap_or(0.0)
}

#[derive(Debug, Clone)]
pub struct KnowledgeSynthesis {
    pub weight: f64,
    pub both_principled_bonus: f64,
}

impl Default for KnowledgeSynthesis {
    fn default() -> Self {
        Self {
            weight: 0.85,
            both_principled_bonus: 0.4,
        }
    }
}

impl Scorer for KnowledgeSynthesis {
    fn id(&self) -> &str {
        "knowledge-fusion"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, input: &ScoringInput<'_>) -> FusionResult<ScorerOutput> {
        let nodes = input.activated;
        let mut pairs = Vec::new();
        let mut total_score = 0.0;

        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let mut score = 0.0;
                if !a.node.principles.is_empty() && !b.node.principles.is_empty() {
                    score += self.both_principled_bonus;
                }
                score += pair_bonus(&a.node.id, &b.node.id);
                if score > 0.0 {
                    total_score += score;
                    pairs.push(PairSynergy {
                        first: a.node.id.clone(),
                        second: b.node.id.clone(),
                        score,
                    });
                }
            }
        }

        let confidence = clamp_unit(total_score / (nodes.len().max(1) as f64));
        Ok(ScorerOutput {
            confidence,
            explanation: Explanation::Synthesis { pairs, total_score },
        })
    }
}
