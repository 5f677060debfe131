//! Query normalization
//!
//! The normalized form (trimmed, lowercased) is the cache key. Store
//! predicates receive the trimmed original-case text and do their own case
//! folding.

/// Minimum characters for a word to take part in per-word matching
pub const MIN_WORD_CHARS: usize = 3;

/// Cache key for a raw query
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Text passed to store predicates
pub fn trimmed(raw: &str) -> &str {
    raw.trim()
}

/// Words of at least `MIN_WORD_CHARS` characters, in query order
pub fn significant_words(trimmed_query: &str) -> Vec<String> {
    trimmed_query
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_WORD_CHARS)
        .map(str::to_string)
        .collect()
}
