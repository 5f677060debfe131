//! Data models for lyra-search
//!
//! Wire shapes returned to callers and stored in the search cache.

pub mod remote;
pub mod search;
pub mod suggestion;

pub use remote::SongHit;
pub use search::{CachedResult, Confidence, SearchResponse, SearchSongDto, SearchSource};
pub use suggestion::{Suggestion, SuggestionKind, SuggestionMetadata};
