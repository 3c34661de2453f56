//! Response rendering.
//!
//! The engine only needs a short human-readable summary of what it found;
//! anything richer belongs to a caller-supplied [`ResponseRenderer`].
//! [`SummaryRenderer`] picks its phrasing with an RNG seeded from the
//! normalised query, so the same query always renders the same text.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::concept::ActivatedNode;
use crate::outcome::Decision;
use crate::search::SearchHit;
use crate::text;

/// What a renderer gets to work with.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub query: &'a str,
    pub decision: Decision,
    pub confidence: f64,
    pub activated: &'a [ActivatedNode],
    pub hits: &'a [SearchHit],
    /// Principles the inference scorer judged relevant, best first.
    pub principles: Vec<&'a str>,
}

/// Turns a processed query into response text.
pub trait ResponseRenderer: Send + Sync {
    fn render(&self, ctx: &RenderContext<'_>) -> String;
}

const ANSWER_OPENERS: &[&str] = &[
    "Drawing on",
    "Combining insight from",
    "From the perspective of",
    "Looking at this through",
];

const OUT_OF_SCOPE_LINES: &[&str] = &[
    "This falls outside what I currently know well enough to answer.",
    "I don't have enough grounding to answer this with confidence.",
    "Nothing I know connects strongly to this question yet.",
];

/// Deterministic summary renderer.
#[derive(Debug, Clone)]
pub struct SummaryRenderer {
    /// Principles quoted at most.
    pub max_principles: usize,
    /// Related concepts listed at most.
    pub max_concepts: usize,
}

impl Default for SummaryRenderer {
    fn default() -> Self {
        Self {
            max_principles: 2,
            max_concepts: 5,
        }
    }
}

impl SummaryRenderer {
    fn rng_for(query: &str) -> StdRng {
        let mut hasher = DefaultHasher::new();
        text::normalize(query).hash(&mut hasher);
        StdRng::seed_from_u64(hasher.finish())
    }
}

impl ResponseRenderer for SummaryRenderer {
    fn render(&self, ctx: &RenderContext<'_>) -> String {
        let mut rng = Self::rng_for(ctx.query);

        if ctx.decision == Decision::OutOfScope {
            let line = OUT_OF_SCOPE_LINES.choose(&mut rng).copied().unwrap_or_default();
            return format!("{line} (confidence {:.2})", ctx.confidence);
        }

        let names: Vec<String> = ctx
            .activated
            .iter()
            .take(3)
            .map(|a| a.node.id.replace('_', " "))
            .collect();
        let opener = ANSWER_OPENERS.choose(&mut rng).copied().unwrap_or_default();
        let mut out = format!("{opener} {}:", join_names(&names));

        for principle in ctx.principles.iter().take(self.max_principles) {
            out.push(' ');
            out.push_str(principle.trim_end_matches('.'));
            out.push('.');
        }

        let mut concepts: Vec<&str> = Vec::new();
        for hit in ctx.hits {
            if concepts.len() == self.max_concepts {
                break;
            }
            if !concepts.contains(&hit.concept.as_str()) {
                concepts.push(&hit.concept);
            }
        }
        if !concepts.is_empty() {
            out.push_str(&format!(" Related concepts: {}.", concepts.join(", ")));
        }
        out.push_str(&format!(" (confidence {:.2})", ctx.confidence));
        out
    }
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => "general knowledge".to_string(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
