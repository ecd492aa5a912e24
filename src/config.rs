//! Configuration
//!
//! Tunables for the follow-up loop, scaffolding, pattern detection and taste
//! aggregation, loaded from TOML. Every field has a default, so a partial
//! file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KttConfig {
    pub followup: FollowUpConfig,
    pub scaffold: ScaffoldConfig,
    pub patterns: PatternConfig,
    pub taste: TasteConfig,
    pub storage: StorageConfig,
}

/// Follow-up loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpConfig {
    /// Follow-ups before a vague response is accepted anyway
    pub max_attempts: u32,

    /// Responses shorter than this (in characters, trimmed) are too short
    pub min_response_length: usize,

    /// A vague response at or above this score is accepted after one follow-up
    pub accept_threshold: f32,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_response_length: 50,
            accept_threshold: 0.4,
        }
    }
}

/// Session-count thresholds for scaffold fading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    /// Up to this many completed sessions: heavy scaffolding
    pub heavy_max_sessions: u32,

    /// Up to this many completed sessions: medium scaffolding
    pub medium_max_sessions: u32,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            heavy_max_sessions: 3,
            medium_max_sessions: 8,
        }
    }
}

/// Pattern detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Distinct movies with readable responses needed before detecting
    pub min_movies: usize,

    /// Candidates below this confidence are pruned
    pub min_confidence: f32,

    /// Distinct supporting movies a candidate needs
    pub min_supporting_movies: usize,

    /// Most frequent elements considered for element patterns
    pub top_elements: usize,

    /// Ceiling for element pattern confidence
    pub max_element_confidence: f32,

    /// Ceiling for concept pattern confidence
    pub max_concept_confidence: f32,

    /// Corpus-wide matches a concept needs
    pub concept_min_matches: usize,

    /// Self-rated confidence a response needs to join the concept corpus
    pub high_confidence_rating: u8,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_movies: 3,
            min_confidence: 0.4,
            min_supporting_movies: 2,
            top_elements: 20,
            max_element_confidence: 0.95,
            max_concept_confidence: 0.9,
            concept_min_matches: 3,
            high_confidence_rating: 4,
        }
    }
}

/// Taste element aggregation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasteConfig {
    /// Most frequent elements folded into taste statistics
    pub top_elements: usize,

    /// Elements shown in a summary
    pub summary_elements: usize,
}

impl Default for TasteConfig {
    fn default() -> Self {
        Self {
            top_elements: 30,
            summary_elements: 10,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_data_dir().join("ktt.db"),
            pool_size: 4,
        }
    }
}

/// Platform data directory, falling back to the working directory
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "knowthytaste", "ktt")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl KttConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: KttConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let followup = &self.followup;
        if followup.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "followup: max_attempts must be at least 1".to_string(),
            ));
        }
        check_unit("followup.accept_threshold", followup.accept_threshold)?;

        if self.scaffold.medium_max_sessions < self.scaffold.heavy_max_sessions {
            return Err(ConfigError::ValidationError(
                "scaffold: medium_max_sessions must not be below heavy_max_sessions".to_string(),
            ));
        }

        let patterns = &self.patterns;
        check_unit("patterns.min_confidence", patterns.min_confidence)?;
        check_unit("patterns.max_element_confidence", patterns.max_element_confidence)?;
        check_unit("patterns.max_concept_confidence", patterns.max_concept_confidence)?;
        if patterns.min_movies == 0 || patterns.min_supporting_movies == 0 {
            return Err(ConfigError::ValidationError(
                "patterns: movie thresholds must be at least 1".to_string(),
            ));
        }
        if patterns.top_elements == 0 || self.taste.top_elements == 0 {
            return Err(ConfigError::ValidationError(
                "top_elements must be at least 1".to_string(),
            ));
        }
        if !(1..=5).contains(&patterns.high_confidence_rating) {
            return Err(ConfigError::ValidationError(
                "patterns: high_confidence_rating must be between 1 and 5".to_string(),
            ));
        }

        if self.storage.pool_size == 0 {
            return Err(ConfigError::ValidationError(
                "storage: pool_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{} must be between 0.0 and 1.0",
            name
        )))
    }
}
