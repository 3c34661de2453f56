//! Query text normalisation and tokenisation.
//!
//! Everything the engine matches on goes through [`normalize`] first:
//! NFKC normalisation, lower-casing and whitespace collapsing.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['\-][\p{L}\p{N}]+)*").expect("word regex is valid")
});

/// Function words ignored by pattern extraction and concept learning.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "between", "both", "but", "by",
    "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him",
    "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more",
    "most", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
    "our", "out", "over", "own", "same", "she", "should", "so", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours",
];

/// Minimum length of a token kept as a query pattern.
pub const MIN_PATTERN_LEN: usize = 3;

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// NFKC-normalise, lower-case, and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Word tokens of already-normalised text, in order.
pub fn tokens(normalized: &str) -> Vec<&str> {
    WORD_RE.find_iter(normalized).map(|m| m.as_str()).collect()
}

/// Tokens that are neither stopwords nor shorter than [`MIN_PATTERN_LEN`].
pub fn content_tokens(normalized: &str) -> Vec<&str> {
    tokens(normalized)
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_PATTERN_LEN && !is_stopword(t))
        .collect()
}

/// Derive the activation patterns for a query.
///
/// Content tokens first, then adjacent content-token bigrams, then the whole
/// normalised query so multi-word node patterns can still match. Duplicates
/// are dropped, first occurrence wins. A query without a single word token
/// (only punctuation or symbols) yields no patterns.
pub fn query_patterns(query: &str) -> Vec<String> {
    let normalized = normalize(query);
    if tokens(&normalized).is_empty() {
        return Vec::new();
    }
    let words = content_tokens(&normalized);
    let mut patterns: Vec<String> = Vec::with_capacity(words.len() * 2 + 1);
    let mut push = |p: String| {
        if !patterns.contains(&p) {
            patterns.push(p);
        }
    };
    for w in &words {
        push((*w).to_string());
    }
    for pair in words.windows(2) {
        push(format!("{} {}", pair[0], pair[1]));
    }
    push(normalized);
    patterns
}

/// Bidirectional substring test used by activation and pattern analysis.
pub fn mutual_contains(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

/// Strip common plural and possessive endings from a single word.
///
/// Deliberately light: `networks` → `network`, `theories` → `theory`,
/// `classes` → `class`. Words of four characters or fewer are left alone.
pub fn light_stem(word: &str) -> String {
    let word = word.strip_suffix("'s").unwrap_or(word);
    if word.chars().count() <= 4 {
        return word.to_string();
    }
    if let Some(base) = word.strip_suffix("ies") {
        return format!("{base}y");
    }
    if let Some(base) = word.strip_suffix("sses") {
        return format!("{base}ss");
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}
