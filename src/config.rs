//! Configuration file parser for `config.toml`.
//!
//! Unlike most optional settings files, the config is mandatory: it carries the
//! output feed metadata and the list of sources. A missing file is reported with
//! a hint to copy `config.example.toml`. Unknown top-level keys are accepted but
//! logged as warnings, since they are usually typos.
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{} not found. Copy config.example.toml to {} and edit it.", .0.display(), .0.display())]
    NotFound(PathBuf),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A source is missing the locator its type requires.
    #[error("{field} is required for {kind} source: {source_id}")]
    MissingField {
        source_id: String,
        kind: SourceKind,
        field: &'static str,
    },

    #[error("Invalid feed URL for source {source_id}: {reason}")]
    InvalidUrl { source_id: String, reason: String },

    #[error("Unknown source type: {kind} (source: {source_id})")]
    UnknownSourceType { source_id: String, kind: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration: the output feed plus its sources.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub feed: FeedConfig,

    /// Sources in the order they are fetched.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Channel-level metadata of the generated RSS document.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,

    /// Upper bound on `<item>` elements in the output.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

/// One configured upstream feed.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: SourceKind,

    pub display_name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Required for `youtube_channel`.
    pub channel_id: Option<String>,

    /// Required for `generic_rss`.
    pub rss_url: Option<String>,
}

/// Source type as written in the `type` key.
///
/// Unrecognized names are kept rather than rejected at load time, so a typo
/// in one source fails that source alone instead of the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SourceKind {
    YouTubeChannel,
    GenericRss,
    Unknown(String),
}

impl SourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::YouTubeChannel => "youtube_channel",
            SourceKind::GenericRss => "generic_rss",
            SourceKind::Unknown(name) => name,
        }
    }
}

impl From<String> for SourceKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "youtube_channel" => SourceKind::YouTubeChannel,
            "generic_rss" => SourceKind::GenericRss,
            _ => SourceKind::Unknown(name),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_max_items() -> usize {
    100
}

fn default_enabled() -> bool {
    true
}

impl AppConfig {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Err(ConfigError::NotFound)`
    /// - Invalid TOML or missing required keys → `Err(ConfigError::Parse)`
    /// - Unknown top-level keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content).inspect(|config| {
            tracing::info!(
                path = %path.display(),
                sources = config.sources.len(),
                "Loaded configuration"
            );
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["feed", "sources"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        Ok(toml::from_str(content)?)
    }

    /// Sources with `enabled = true`, in config order.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

// ============================================================================
// Tests
// ============================================================================
