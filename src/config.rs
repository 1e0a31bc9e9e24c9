//! Configuration file parser for ~/.config/haber/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning for each one.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Default language '{0}' is not listed in `languages`")]
    UnknownDefaultLanguage(String),

    #[error("trend_window_days must be between 1 and 3650, got {0}")]
    TrendWindowOutOfRange(i64),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Language used at boot and as the locale fallback.
    pub default_language: String,

    /// Supported language codes.
    pub languages: Vec<String>,

    /// Key prefix for persistent cache entries.
    pub cache_prefix: String,

    /// Public base URL of the site, used for canonical links.
    pub site_url: String,

    /// Maximum posts per list query.
    pub page_size: u32,

    /// Window in days for `weekly_*` trend tokens (1..=3650).
    pub trend_window_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_language: "tr".to_string(),
            languages: vec!["tr".to_string(), "en".to_string()],
            cache_prefix: "haber_cache_".to_string(),
            site_url: "http://localhost".to_string(),
            page_size: 50,
            trend_window_days: 7,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Longest accepted trend window (about ten years).
    pub const MAX_TREND_WINDOW_DAYS: i64 = 3650;

    const KNOWN_KEYS: [&'static str; 6] = [
        "default_language",
        "languages",
        "cache_prefix",
        "site_url",
        "page_size",
        "trend_window_days",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    /// - `default_language` not in `languages` → `Err(ConfigError::UnknownDefaultLanguage)`
    /// - `trend_window_days` outside `1..=3650` → `Err(ConfigError::TrendWindowOutOfRange)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            language = %config.default_language,
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.languages.iter().any(|l| l == &self.default_language) {
            return Err(ConfigError::UnknownDefaultLanguage(
                self.default_language.clone(),
            ));
        }
        if !(1..=Self::MAX_TREND_WINDOW_DAYS).contains(&self.trend_window_days) {
            return Err(ConfigError::TrendWindowOutOfRange(self.trend_window_days));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
