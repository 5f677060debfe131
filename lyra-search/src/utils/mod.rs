//! Utility modules for lyra-search

pub mod folding;
pub mod trigram;

pub use folding::fold_case;
pub use trigram::{similarity, trigram_keys, TrigramQuery};
