//! Ingestion: classify, chunk and index documents

use crate::chunking::{document_id, DocumentChunker};
use crate::classify::{document_type, CollectionClassifier};
use crate::config::Config;
use crate::error::Result;
use crate::index::VectorIndexManager;
use crate::source::DocumentSource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Outcome of ingesting one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub filename: String,
    pub document_id: String,
    pub collection: String,
    pub chunk_count: usize,
    pub chunks_stored: usize,
}

/// Outcome of ingesting many documents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSummary {
    pub documents: usize,
    pub chunks_stored: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

/// Chunks a document, classifies it and writes it to the chosen collection
pub struct IngestionPipeline {
    chunker: DocumentChunker,
    classifier: CollectionClassifier,
    index: Arc<VectorIndexManager>,
}

impl IngestionPipeline {
    pub fn new(
        chunker: DocumentChunker,
        classifier: CollectionClassifier,
        index: Arc<VectorIndexManager>,
    ) -> Self {
        Self {
            chunker,
            classifier,
            index,
        }
    }

    pub fn from_config(config: &Config, index: Arc<VectorIndexManager>) -> Self {
        Self::new(
            DocumentChunker::from_config(&config.chunking),
            CollectionClassifier::from_config(&config.classification),
            index,
        )
    }

    pub fn index(&self) -> &Arc<VectorIndexManager> {
        &self.index
    }

    pub fn classifier(&self) -> &CollectionClassifier {
        &self.classifier
    }

    /// Ingest one document
    ///
    /// Whitespace-only content is skipped and reports zero chunks.
    pub fn ingest(
        &self,
        filename: &str,
        content: &str,
        extra: &BTreeMap<String, String>,
    ) -> Result<IngestReport> {
        let collection = self.classifier.classify(filename, content);

        if content.trim().is_empty() {
            warn!("Skipping empty document: {}", filename);
            return Ok(IngestReport {
                filename: filename.to_string(),
                document_id: document_id(content),
                collection,
                chunk_count: 0,
                chunks_stored: 0,
            });
        }

        let chunks = self.chunker.chunk(content);
        let doc_id = document_id(content);
        let ingested_at = chrono::Utc::now();
        let doc_type = document_type(filename);

        let mut ids = Vec::with_capacity(chunks.len());
        let mut documents = Vec::with_capacity(chunks.len());
        let mut metadatas = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let mut metadata = chunk.metadata;
            metadata.filename = Some(filename.to_string());
            metadata.document_type = Some(doc_type.to_string());
            metadata.collection = Some(collection.clone());
            metadata.ingested_at = Some(ingested_at);
            metadata.extra = extra.clone();

            ids.push(chunk.chunk_id);
            documents.push(chunk.content);
            metadatas.push(metadata);
        }

        self.index.ensure_collection(
            &collection,
            self.classifier.vocabulary().describe(&collection),
        )?;
        let chunks_stored = self.index.add(&collection, &ids, &documents, &metadatas)?;

        info!(
            "Ingested {} into {} ({}/{} chunks)",
            filename,
            collection,
            chunks_stored,
            ids.len()
        );

        Ok(IngestReport {
            filename: filename.to_string(),
            document_id: doc_id,
            collection,
            chunk_count: ids.len(),
            chunks_stored,
        })
    }

    /// Ingest every document of a source once
    ///
    /// Does nothing when the index already holds chunks, unless `force`.
    /// Documents that cannot be read or stored are logged and counted.
    pub fn bootstrap(&self, source: &dyn DocumentSource, force: bool) -> Result<IngestSummary> {
        let start = Instant::now();

        let existing = self.index.total_chunks()?;
        if existing > 0 && !force {
            info!("Index already holds {} chunks, skipping bootstrap", existing);
            return Ok(IngestSummary::default());
        }

        let names = source.list_documents()?;
        info!("Bootstrapping {} documents", names.len());

        let mut summary = IngestSummary::default();
        for name in names {
            let outcome = source
                .get_document_content(&name)
                .and_then(|content| self.ingest(&name, &content, &BTreeMap::new()));

            match outcome {
                Ok(report) => {
                    summary.documents += 1;
                    summary.chunks_stored += report.chunks_stored;
                }
                Err(e) => {
                    warn!("Failed to ingest {}: {}", name, e);
                    summary.failed += 1;
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Bootstrap complete: {} documents, {} chunks, {} failed, {}ms",
            summary.documents, summary.chunks_stored, summary.failed, summary.duration_ms
        );

        Ok(summary)
    }

    /// Like `bootstrap`, but ingests up to `max_concurrent` documents at once
    ///
    /// Every document is read before ingestion starts; read failures are
    /// counted in the summary.
    pub async fn bootstrap_concurrent(
        self: &Arc<Self>,
        source: &dyn DocumentSource,
        force: bool,
        max_concurrent: usize,
    ) -> Result<IngestSummary> {
        let start = Instant::now();

        let existing = self.index.total_chunks()?;
        if existing > 0 && !force {
            info!("Index already holds {} chunks, skipping bootstrap", existing);
            return Ok(IngestSummary::default());
        }

        let names = source.list_documents()?;
        info!("Bootstrapping {} documents", names.len());

        let mut unreadable = 0;
        let mut documents = Vec::with_capacity(names.len());
        for name in names {
            match source.get_document_content(&name) {
                Ok(content) => documents.push((name, content)),
                Err(e) => {
                    warn!("Failed to read {}: {}", name, e);
                    unreadable += 1;
                }
            }
        }

        let mut summary = self.ingest_all(documents, max_concurrent).await?;
        summary.failed += unreadable;
        summary.duration_ms = start.elapsed().as_millis() as u64;

        Ok(summary)
    }

    /// Ingest (filename, content) pairs concurrently
    ///
    /// At most `max_concurrent` documents are processed at once, each on a
    /// blocking task since chunking, embedding and SQLite writes are sync.
    pub async fn ingest_all(
        self: &Arc<Self>,
        documents: Vec<(String, String)>,
        max_concurrent: usize,
    ) -> Result<IngestSummary> {
        let start = Instant::now();
        let total = documents.len();
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let mut tasks = JoinSet::new();

        info!("Starting ingestion of {} documents", total);

        for (filename, content) in documents {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(anyhow::Error::from)?;
            let pipeline = Arc::clone(self);

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = pipeline.ingest(&filename, &content, &BTreeMap::new());
                (filename, result)
            });
        }

        let mut summary = IngestSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(report))) => {
                    debug!("Ingested {} ({} chunks)", report.filename, report.chunks_stored);
                    summary.documents += 1;
                    summary.chunks_stored += report.chunks_stored;
                }
                Ok((filename, Err(e))) => {
                    warn!("Failed to ingest {}: {}", filename, e);
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!("Ingestion task failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Ingestion complete: {} documents, {} chunks, {} failed, {}ms",
            summary.documents, summary.chunks_stored, summary.failed, summary.duration_ms
        );

        Ok(summary)
    }
}
