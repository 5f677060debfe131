//! HTTP API handlers for lyra-search
//!
//! Thin glue over the search orchestrator and suggestion engine.

pub mod health;
pub mod search;
pub mod songs;
pub mod suggestions;

pub use health::health_routes;
pub use search::search_routes;
pub use songs::song_routes;
pub use suggestions::suggestion_routes;
