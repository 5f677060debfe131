//! Unicode case folding shared by the store predicates and suggestion scoring
//!
//! SQLite's `LIKE` only folds ASCII, so titles and artists are stored folded
//! and matched against folded patterns.

/// Case-fold `text` for matching
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}
