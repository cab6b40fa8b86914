//! Configuration management for hybrid-rag
//!
//! Loads the TOML configuration, applies profile and environment overrides,
//! and validates the result before anything is indexed.

use crate::error::{HybridError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Supported configuration schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub embedding: EmbeddingConfig,
    pub indexing: IndexingConfig,
    pub splitter: SplitterConfig,
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

/// HNSW vector index parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub max_elements: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
    pub hnsw_m: usize,
}

/// Text splitter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
    #[serde(default = "default_true")]
    pub keep_separator: bool,
}

fn default_true() -> bool {
    true
}

/// Hybrid retrieval and fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Documents returned by the dense retriever
    pub dense_k: usize,
    /// Documents returned by the BM25 retriever
    pub sparse_k: usize,
    pub dense_weight: f64,
    pub sparse_weight: f64,
    /// Reciprocal rank smoothing constant
    pub rrf_c: f64,
    /// Metadata field used as document identity instead of content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_key: Option<String>,
    /// Default number of fused results (all when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    /// Run retrievers concurrently
    pub parallel: bool,
    /// Per-retriever timeout such as "30s"; "0" disables it
    pub retriever_timeout: String,
}

impl RetrievalConfig {
    /// Parsed retriever timeout, `None` when disabled
    pub fn timeout(&self) -> Result<Option<Duration>> {
        let duration = parse_duration(&self.retriever_timeout).ok_or_else(|| {
            HybridError::InvalidConfigValue {
                path: "retrieval.retriever_timeout".to_string(),
                message: format!("Invalid duration format: {}", self.retriever_timeout),
            }
        })?;

        Ok((!duration.is_zero()).then_some(duration))
    }
}

/// Parse duration strings like "500ms", "5s", "2m", "1h" or bare seconds
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.trim().parse().ok().map(Duration::from_millis);
    }

    let (number, multiplier) = if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else {
        (s, 1)
    };

    number
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .map(Duration::from_secs)
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dense_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparse_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HybridError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| HybridError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| HybridError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| HybridError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(weight) = overrides.dense_weight {
            self.retrieval.dense_weight = weight;
        }
        if let Some(weight) = overrides.sparse_weight {
            self.retrieval.sparse_weight = weight;
        }
        if let Some(top_k) = overrides.top_k {
            self.retrieval.top_k = Some(top_k);
        }

        tracing::debug!("Applied profile '{}'", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: HYBRID_RAG_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("HYBRID_RAG_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "RETRIEVAL__DENSE_WEIGHT" => {
                self.retrieval.dense_weight = parse_env_value(path, value)?;
            }
            "RETRIEVAL__SPARSE_WEIGHT" => {
                self.retrieval.sparse_weight = parse_env_value(path, value)?;
            }
            "RETRIEVAL__RRF_C" => {
                self.retrieval.rrf_c = parse_env_value(path, value)?;
            }
            "RETRIEVAL__PARALLEL" => {
                self.retrieval.parallel = parse_env_value(path, value)?;
            }
            "RETRIEVAL__ID_KEY" => {
                self.retrieval.id_key = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| HybridError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("hybrid-rag").join("config.toml"))
    }
}

fn parse_env_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| HybridError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
                batch_size: 32,
            },
            indexing: IndexingConfig {
                max_elements: 10_000,
                hnsw_ef_construction: 200,
                hnsw_ef_search: 64,
                hnsw_m: 16,
            },
            splitter: SplitterConfig {
                chunk_size: 200,
                chunk_overlap: 50,
                separators: vec![
                    "\n\n".to_string(),
                    "\n".to_string(),
                    " ".to_string(),
                    String::new(),
                ],
                keep_separator: true,
            },
            retrieval: RetrievalConfig {
                dense_k: 2,
                sparse_k: 4,
                dense_weight: 0.7,
                sparse_weight: 0.3,
                rrf_c: 60.0,
                id_key: None,
                top_k: None,
                parallel: true,
                retriever_timeout: "30s".to_string(),
            },
            profiles: default_profiles(),
        }
    }
}

fn default_profiles() -> HashMap<String, ProfileOverrides> {
    let mut profiles = HashMap::new();
    profiles.insert(
        "keyword".to_string(),
        ProfileOverrides {
            dense_weight: Some(0.3),
            sparse_weight: Some(0.7),
            ..Default::default()
        },
    );
    profiles.insert(
        "balanced".to_string(),
        ProfileOverrides {
            dense_weight: Some(0.5),
            sparse_weight: Some(0.5),
            ..Default::default()
        },
    );
    profiles
}
