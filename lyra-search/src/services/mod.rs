//! Search and suggestion services
//!
//! Leaf to root: normalizer and classifier, result cache, local search,
//! remote provider and fallback, then the orchestrator and suggestion engine.

pub mod confidence_classifier;
pub mod genius_client;
pub mod local_search;
pub mod query_normalizer;
pub mod remote_fallback;
pub mod result_cache;
pub mod search_orchestrator;
pub mod suggestion_engine;

pub use genius_client::{GeniusClient, ProviderError, RemoteSongProvider};
pub use local_search::{LocalSearchEngine, LocalSearchResult};
pub use remote_fallback::{RemoteFallback, RemoteOutcome};
pub use result_cache::{CacheEntry, ResultCache};
pub use search_orchestrator::SearchOrchestrator;
pub use suggestion_engine::SuggestionEngine;
