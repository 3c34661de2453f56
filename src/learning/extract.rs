//! Candidate concept extraction from interaction text.
//!
//! Two passes over the content tokens (stopwords and short words removed):
//! runs of two and three adjacent tokens become phrase candidates unless the
//! phrase is on the denylist, then each remaining token becomes a single-word
//! candidate after plural stripping, unless it is a common filler word.

use crate::text;

/// Phrases that look like concepts but carry no domain meaning.
pub const MEANINGLESS_PHRASES: &[&str] = &[
    "best way",
    "different ways",
    "explain like",
    "give example",
    "good example",
    "help understand",
    "lot more",
    "make sense",
    "need help",
    "please explain",
    "real world",
    "step step",
    "tell more",
    "thank you",
    "want know",
    "want learn",
];

/// Content words too generic to become concepts on their own.
pub const COMMON_WORDS: &[&str] = &[
    "actually", "answer", "anything", "best", "better", "come", "describe", "difference",
    "different", "does", "example", "explain", "find", "get", "give", "good", "help", "idea",
    "important", "know", "learn", "like", "look", "lot", "make", "many", "mean", "much", "need",
    "please", "question", "really", "say", "something", "tell", "thank", "thanks", "thing",
    "think", "understand", "use", "used", "using", "want", "way", "well", "work", "works",
];

/// Extracts candidate concepts from free text.
#[derive(Debug, Clone)]
pub struct ConceptExtractor {
    /// Upper bound on candidates returned per call.
    pub max_concepts: usize,
    /// Minimum characters for a single-word concept after stemming.
    pub min_word_len: usize,
}

impl Default for ConceptExtractor {
    fn default() -> Self {
        Self {
            max_concepts: 12,
            min_word_len: 4,
        }
    }
}

impl ConceptExtractor {
    /// Candidate concepts in discovery order: phrases first, then single words.
    pub fn extract(&self, input: &str) -> Vec<String> {
        let normalized = text::normalize(input);
        let words: Vec<&str> = text::content_tokens(&normalized)
            .into_iter()
            .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
            .collect();

        let mut out: Vec<String> = Vec::new();
        let mut push = |candidate: String| {
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        };

        for size in [2, 3] {
            for window in words.windows(size) {
                if window.iter().any(|w| is_common(w)) {
                    continue;
                }
                let phrase = window.join(" ");
                if !MEANINGLESS_PHRASES.contains(&phrase.as_str()) {
                    push(phrase);
                }
            }
        }

        for word in &words {
            if is_common(word) {
                continue;
            }
            let stem = text::light_stem(word);
            if stem.chars().count() >= self.min_word_len && !is_common(&stem) {
                push(stem);
            }
        }

        out.truncate(self.max_concepts);
        out
    }
}

fn is_common(word: &str) -> bool {
    COMMON_WORDS.contains(&word)
}
