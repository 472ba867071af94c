//! Configuration management for docindex
//!
//! Loads a TOML file, applies `DOCINDEX_*` environment overrides and validates
//! the result. Every section has defaults, so a partial file is enough.

use crate::classify::CategoryDefinition;
use crate::error::{DocIndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub documents: DocumentsConfig,
    pub embedding: EmbeddingConfig,
    pub indexing: IndexingConfig,
    pub chunking: ChunkingConfig,
    pub classification: ClassificationConfig,
    pub search: SearchConfig,
    pub ingest: IngestConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    pub schema_version: String,
    pub created_at: String,
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: current_timestamp(),
            last_modified: current_timestamp(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory; the vector index lives in `<data_dir>/index`
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.docindex"),
        }
    }
}

/// Where the bootstrap step reads raw documents from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub dir: PathBuf,
    pub extensions: Vec<String>,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("~/.docindex/documents"),
            extensions: vec!["md".to_string(), "txt".to_string(), "json".to_string()],
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "fastembed" (local ONNX model) or "hash" (deterministic feature hashing)
    pub provider: String,
    /// Model name (e.g., "all-MiniLM-L6-v2"); ignored by the hash provider
    pub model: String,
    /// Vector dimension for the hash provider; fastembed models report their own
    pub dimension: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            batch_size: 32,
        }
    }
}

/// HNSW configuration, applied to every collection graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// HNSW M parameter (number of connections per layer)
    pub hnsw_m: usize,
    /// HNSW construction parameter (higher = better recall, slower build)
    pub hnsw_ef_construction: usize,
    /// HNSW search parameter (higher = better recall, slower search)
    pub hnsw_ef_search: usize,
    /// Expected upper bound of vectors per collection
    pub max_elements: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 64,
            max_elements: 100_000,
        }
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Soft chunk size limit in characters
    pub chunk_size: usize,
    /// A trailing sentence at least this long is carried over alone
    pub overlap_hint: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap_hint: 50,
        }
    }
}

/// Collection classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// A category must score strictly above this to be chosen
    pub threshold: u32,
    /// Number of leading content characters scanned
    pub preview_chars: usize,
    /// Multiplier applied to term weights found in the filename
    pub filename_multiplier: u32,
    /// Collection used when no category is significant
    pub default_collection: String,
    /// Ordered category tables; order breaks ties
    pub categories: Vec<CategoryDefinition>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            preview_chars: 2000,
            filename_multiplier: 2,
            default_collection: "general".to_string(),
            categories: CategoryDefinition::builtin(),
        }
    }
}

/// Search and hybrid ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k_per_collection: usize,
    pub max_chunks_per_document: usize,
    /// Per-collection fetch window used by hybrid search
    pub hybrid_fetch_k: usize,
    /// Distance subtracted per matched keyword
    pub keyword_boost: f32,
    /// Maximum documents returned by hybrid search
    pub hybrid_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k_per_collection: 5,
            max_chunks_per_document: 2,
            hybrid_fetch_k: 10,
            keyword_boost: 0.1,
            hybrid_limit: 5,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Documents ingested at once by the `ingest` command
    pub max_concurrent: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DocIndexError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DocIndexError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse, apply env overrides and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocIndexError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| DocIndexError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: DOCINDEX_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("DOCINDEX_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "EMBEDDING__PROVIDER" => {
                self.embedding.provider = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "CHUNKING__CHUNK_SIZE" => {
                self.chunking.chunk_size = parse_usize(path, value)?;
            }
            "SEARCH__TOP_K_PER_COLLECTION" => {
                self.search.top_k_per_collection = parse_usize(path, value)?;
            }
            "INGEST__MAX_CONCURRENT" => {
                self.ingest.max_concurrent = parse_usize(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Directory holding the persisted vector index
    pub fn index_dir(&self) -> Result<PathBuf> {
        Ok(Self::expand_path(&self.storage.data_dir)?.join("index"))
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            DocIndexError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("docindex").join("config.toml"))
    }

    /// Expand a leading `~/` to the home directory
    pub fn expand_path(path: &Path) -> Result<PathBuf> {
        let path_str = path
            .to_str()
            .ok_or_else(|| DocIndexError::Config("Invalid path encoding".to_string()))?;

        if let Some(stripped) = path_str.strip_prefix("~/") {
            let home = dirs::home_dir().ok_or_else(|| {
                DocIndexError::Config("Cannot determine home directory".to_string())
            })?;
            Ok(home.join(stripped))
        } else {
            Ok(path.to_path_buf())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig::default(),
            storage: StorageConfig::default(),
            documents: DocumentsConfig::default(),
            embedding: EmbeddingConfig::default(),
            indexing: IndexingConfig::default(),
            chunking: ChunkingConfig::default(),
            classification: ClassificationConfig::default(),
            search: SearchConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

fn parse_usize(path: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| DocIndexError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}' as an unsigned integer", value),
        })
}
