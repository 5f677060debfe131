//! Configuration resolution for lyra-search
//!
//! Provides ENV → TOML resolution for the Genius access token.

use lyra_common::config::TomlConfig;
use tracing::{info, warn};

/// Environment variable holding the Genius access token
pub const GENIUS_TOKEN_ENV: &str = "LYRA_GENIUS_TOKEN";

/// Resolve the Genius access token
///
/// **Priority:** ENV → TOML
///
/// A missing token is not an error: remote searches then fail fast and
/// the service answers from local data only.
pub fn resolve_genius_token(toml_config: &TomlConfig) -> Option<String> {
    let env_token = std::env::var(GENIUS_TOKEN_ENV)
        .ok()
        .filter(|t| is_valid_token(t));
    let toml_token = toml_config
        .genius_api_token
        .clone()
        .filter(|t| is_valid_token(t));

    if env_token.is_some() && toml_token.is_some() {
        warn!("Genius token found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(token) = env_token {
        info!("Genius token loaded from environment variable");
        return Some(token);
    }

    if let Some(token) = toml_token {
        info!("Genius token loaded from TOML config");
        return Some(token);
    }

    warn!(
        "Genius token not configured (set {} or genius_api_token in TOML); remote search disabled",
        GENIUS_TOKEN_ENV
    );
    None
}

/// Validate token (non-empty, non-whitespace)
pub fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}
