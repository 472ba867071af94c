use crate::config::{Config, SCHEMA_VERSION};
use crate::embedding::SUPPORTED_PROVIDERS;
use crate::error::{DocIndexError, Result, ValidationError};
use crate::index::is_valid_collection_name;
use std::collections::HashSet;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every violation
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_documents(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_classification(config, &mut errors);
        Self::validate_search(config, &mut errors);

        if config.ingest.max_concurrent == 0 {
            errors.push(ValidationError::new(
                "ingest.max_concurrent",
                "Concurrency must be greater than 0",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DocIndexError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_documents(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.documents.extensions.is_empty() {
            errors.push(ValidationError::new(
                "documents.extensions",
                "At least one document extension is required",
            ));
        }

        if config
            .documents
            .extensions
            .iter()
            .any(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            errors.push(ValidationError::new(
                "documents.extensions",
                "Extensions must be non-empty and given without a leading dot",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.embedding.provider;
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    SUPPORTED_PROVIDERS, provider
                ),
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Dimension must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.indexing.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }

        if config.indexing.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.indexing.max_elements == 0 {
            errors.push(ValidationError::new(
                "indexing.max_elements",
                "max_elements must be greater than 0",
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if config.chunking.overlap_hint >= config.chunking.chunk_size {
            errors.push(ValidationError::new(
                "chunking.overlap_hint",
                format!(
                    "Overlap hint ({}) must be smaller than chunk size ({})",
                    config.chunking.overlap_hint, config.chunking.chunk_size
                ),
            ));
        }
    }

    fn validate_classification(config: &Config, errors: &mut Vec<ValidationError>) {
        let classification = &config.classification;

        if classification.preview_chars == 0 {
            errors.push(ValidationError::new(
                "classification.preview_chars",
                "Preview length must be greater than 0",
            ));
        }

        if !is_valid_collection_name(&classification.default_collection) {
            errors.push(ValidationError::new(
                "classification.default_collection",
                format!(
                    "Invalid collection name: '{}'",
                    classification.default_collection
                ),
            ));
        }

        let mut seen = HashSet::new();
        for (i, category) in classification.categories.iter().enumerate() {
            let path = format!("classification.categories[{}]", i);

            if !is_valid_collection_name(&category.name) {
                errors.push(ValidationError::new(
                    format!("{}.name", path),
                    format!("Invalid collection name: '{}'", category.name),
                ));
            }

            if !seen.insert(category.name.as_str()) {
                errors.push(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate category: '{}'", category.name),
                ));
            }

            if category.name == classification.default_collection {
                errors.push(ValidationError::new(
                    format!("{}.name", path),
                    "Category cannot reuse the default collection name",
                ));
            }

            if category.terms.keys().any(|term| term.trim().is_empty()) {
                errors.push(ValidationError::new(
                    format!("{}.terms", path),
                    "Terms cannot be empty",
                ));
            }

            if let Some(source) = &category.filename_terms_from {
                if !classification.categories.iter().any(|c| &c.name == source) {
                    errors.push(ValidationError::new(
                        format!("{}.filename_terms_from", path),
                        format!("Unknown category: '{}'", source),
                    ));
                }
            }
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        let search = &config.search;

        if search.top_k_per_collection == 0 {
            errors.push(ValidationError::new(
                "search.top_k_per_collection",
                "top_k must be greater than 0",
            ));
        }

        if search.max_chunks_per_document == 0 {
            errors.push(ValidationError::new(
                "search.max_chunks_per_document",
                "At least one chunk per document must be kept",
            ));
        }

        if search.hybrid_fetch_k == 0 || search.hybrid_limit == 0 {
            errors.push(ValidationError::new(
                "search.hybrid_fetch_k",
                "Hybrid fetch window and limit must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&search.keyword_boost) {
            errors.push(ValidationError::new(
                "search.keyword_boost",
                format!(
                    "Keyword boost must be between 0.0 and 1.0, got {}",
                    search.keyword_boost
                ),
            ));
        }
    }
}
