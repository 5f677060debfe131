//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration lives in a small TOML file. Everything in it has a
//! built-in default, so a missing file is not an error.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--root-folder, --port)
//! 2. Environment variables (LYRA_ROOT_FOLDER, LYRA_GENIUS_TOKEN)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LYRA_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "lyra.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Genius API access token (optional, ENV takes precedence)
    #[serde(default)]
    pub genius_api_token: Option<String>,

    /// Genius API base URL (override for testing or proxies)
    #[serde(default)]
    pub genius_base_url: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Search tunables
    #[serde(default)]
    pub search: SearchSettings,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            genius_api_token: None,
            genius_base_url: None,
            logging: LoggingConfig::default(),
            search: SearchSettings::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Search and suggestion tunables
///
/// None of these are correctness invariants; they trade latency against
/// recall and remote-call volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// Age after which a cache entry is ignored
    pub cache_ttl_secs: u64,
    /// Maximum number of songs returned by a search
    pub max_results: usize,
    /// Cache hits with fewer songs than this fall through to local search
    pub min_cache_results: usize,
    /// Similarity at or above which a match counts as high-confidence
    pub high_similarity: f64,
    /// Minimum similarity admitted by the fuzzy tier
    pub low_similarity: f64,
    /// Cache rows sampled per suggestion request
    pub suggestion_cache_sample: usize,
    /// Cache rows sampled for popular suggestions
    pub popular_cache_sample: usize,
    /// Genius requests per second
    pub genius_requests_per_second: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 6 * 60 * 60,
            max_results: 20,
            min_cache_results: 3,
            high_similarity: 0.6,
            low_similarity: 0.3,
            suggestion_cache_sample: 20,
            popular_cache_sample: 50,
            genius_requests_per_second: 5,
        }
    }
}

impl SearchSettings {
    /// Cache TTL as a `Duration`
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Reject settings that would break the search tiers
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(Error::Config("search.max_results must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.low_similarity)
            || !(0.0..=1.0).contains(&self.high_similarity)
        {
            return Err(Error::Config(
                "similarity thresholds must be within 0.0..=1.0".to_string(),
            ));
        }
        if self.low_similarity <= 0.0 {
            return Err(Error::Config(
                "search.low_similarity must be above 0.0".to_string(),
            ));
        }
        if self.high_similarity <= self.low_similarity {
            return Err(Error::Config(format!(
                "search.high_similarity ({}) must exceed search.low_similarity ({})",
                self.high_similarity, self.low_similarity
            )));
        }
        if self.genius_requests_per_second == 0 {
            return Err(Error::Config(
                "search.genius_requests_per_second must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    5760
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load TOML config, falling back to defaults when the file does not exist
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    config.search.validate()?;
    Ok(config)
}

/// Default config file path for the platform
///
/// `~/.config/lyra/<module>.toml` on Linux, the platform config dir elsewhere.
pub fn default_config_path(module_name: &str) -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("lyra").join(format!("{}.toml", module_name)))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Root folder resolution:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/lyra (or /var/lib/lyra for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("lyra"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/lyra"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("lyra"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/lyra"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("lyra"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\lyra"))
    } else {
        PathBuf::from("./lyra_data")
    }
}
