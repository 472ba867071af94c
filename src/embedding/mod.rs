//! Text embedding
//!
//! - EmbeddingProvider trait for abstraction
//! - FastEmbedProvider for local model embedding (all-MiniLM-L6-v2, 384-dim)
//! - HashEmbedder for deterministic, model-free embedding

mod hash;
mod provider;

pub use hash::HashEmbedder;
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};

use crate::config::EmbeddingConfig;
use std::sync::Arc;

/// Accepted values for `embedding.provider`
pub const SUPPORTED_PROVIDERS: &[&str] = &["fastembed", "hash"];

/// Build the provider named in the configuration
pub fn create_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider.as_str() {
        "fastembed" => Ok(Arc::new(FastEmbedProvider::new(
            &config.model,
            config.batch_size,
        )?)),
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dimension))),
        other => Err(EmbeddingError::InitializationError(format!(
            "Unknown embedding provider: {}. Supported: {:?}",
            other, SUPPORTED_PROVIDERS
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_hash_provider() {
        let config = EmbeddingConfig {
            provider: "hash".to_string(),
            dimension: 32,
            ..EmbeddingConfig::default()
        };

        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dimension(), 32);
        assert_eq!(provider.model_name(), "hash-32");
    }

    #[test]
    fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "remote".to_string(),
            ..EmbeddingConfig::default()
        };

        assert!(create_provider(&config).is_err());
    }
}
