//! Configuration for the ingestion core

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main ingestion configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Upload limits
    #[serde(default)]
    pub upload: UploadLimits,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// REST endpoint settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl IngestConfig {
    /// Parse from TOML text. Missing sections take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.upload.max_file_size == 0 {
            return Err(Error::Config("upload.max_file_size must be positive".into()));
        }
        if self.chunking.max_tokens == 0 {
            return Err(Error::Config("chunking.max_tokens must be positive".into()));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config("api.base_url must not be empty".into()));
        }
        Ok(())
    }
}

/// Upload constraints checked before extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_file_size() -> u64 { 10 * 1024 * 1024 }

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
        }
    }
}

/// How the overlap seed of a new chunk is picked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapStrategy {
    /// Tail of the closed chunk as a whole, including its own inherited seed
    #[default]
    Compounding,
    /// Tail of the closed chunk's own paragraphs only
    Boundary,
}

/// Text chunking configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Token budget per chunk (estimated, chars / 4)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Trailing words carried into the next chunk
    #[serde(default = "default_overlap_words")]
    pub overlap_words: usize,
    /// Overlap seed selection
    #[serde(default)]
    pub overlap_strategy: OverlapStrategy,
}

fn default_max_tokens() -> usize { 500 }
fn default_overlap_words() -> usize { 50 }

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_words: default_overlap_words(),
            overlap_strategy: OverlapStrategy::default(),
        }
    }
}

/// Text extraction configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Abort decoding after this many seconds (0 waits forever)
    #[serde(default = "default_extract_timeout")]
    pub timeout_secs: u64,
}

fn default_extract_timeout() -> u64 { 60 }

impl ExtractionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_extract_timeout(),
        }
    }
}

/// Material service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
    /// Retries for transport failures and 5xx responses
    #[serde(default)]
    pub max_retries: u32,
    /// Delay between status polls in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Maximum status polls before giving up
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_base_url() -> String { "http://localhost:5000/api".to_string() }
fn default_api_timeout() -> u64 { 30 }
fn default_poll_interval() -> u64 { 2000 }
fn default_max_polls() -> u32 { 30 }

impl ApiConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_api_timeout(),
            max_retries: 0, // material creation is not idempotent
            poll_interval_ms: default_poll_interval(),
            max_polls: default_max_polls(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.chunking.max_tokens, 500);
        assert_eq!(config.chunking.overlap_words, 50);
        assert_eq!(config.chunking.overlap_strategy, OverlapStrategy::Compounding);
        assert_eq!(config.extraction.timeout(), Some(Duration::from_secs(60)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = IngestConfig::from_toml_str(
            r#"
            [chunking]
            max_tokens = 200
            overlap_strategy = "boundary"

            [api]
            base_url = "https://api.studyspark.dev"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.max_tokens, 200);
        assert_eq!(config.chunking.overlap_words, 50);
        assert_eq!(config.chunking.overlap_strategy, OverlapStrategy::Boundary);
        assert_eq!(config.api.base_url, "https://api.studyspark.dev");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.upload, UploadLimits::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = IngestConfig::default();
        config.extraction.timeout_secs = 0;
        config.api.max_retries = 3;

        let text = config.to_toml_string().unwrap();
        let parsed = IngestConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.extraction.timeout(), None);
    }

    #[test]
    fn test_rejects_zero_budget() {
        let err = IngestConfig::from_toml_str("[chunking]\nmax_tokens = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
