use crate::embedding::EmbeddingError;
use crate::index::GraphError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for docindex
#[derive(Error, Debug)]
pub enum DocIndexError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Embedding generation errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// In-memory nearest-neighbor graph errors
    #[error("Vector graph error: {0}")]
    Graph(#[from] GraphError),

    /// `add` was called with parallel arrays of different lengths
    #[error("Mismatched add arguments: {ids} ids, {documents} documents, {metadatas} metadatas")]
    LengthMismatch {
        ids: usize,
        documents: usize,
        metadatas: usize,
    },

    /// The same chunk id appeared twice in one `add` call
    #[error("Duplicate chunk id in a single add call: {id}")]
    DuplicateChunkId { id: String },

    /// Collection names are limited to [a-z0-9_-], 1 to 64 characters
    #[error("Invalid collection name: {name:?}")]
    InvalidCollectionName { name: String },

    /// The index on disk was built with a different embedding model or dimension
    #[error("Index at {path} was built with {stored}, provider is {requested}")]
    EmbeddingSpaceMismatch {
        path: PathBuf,
        stored: String,
        requested: String,
    },

    /// Document source errors
    #[error("Document source error: {0}")]
    Source(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for docindex operations
pub type Result<T> = std::result::Result<T, DocIndexError>;
