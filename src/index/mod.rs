//! Per-collection vector index
//!
//! `VectorIndexManager` owns every collection: chunks and embeddings persist
//! in SQLite, and each collection keeps an in-memory HNSW graph rebuilt on
//! open. Writes to one collection are serialized by a writer mutex; queries
//! only take the graph read lock.

mod graph;
mod store;

pub use graph::{CollectionGraph, GraphError, GraphParams};
pub use store::{ChunkStore, CollectionRow, StoredChunk};

use crate::chunking::{Chunk, ChunkMetadata};
use crate::config::IndexingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{DocIndexError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

const DB_FILE: &str = "index.sqlite";
const META_MODEL: &str = "embedding_model";
const META_DIMENSION: &str = "embedding_dimension";

/// Longest accepted collection name
pub const MAX_COLLECTION_NAME: usize = 64;

/// Collection names are 1 to 64 characters of `[a-z0-9_-]`
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_COLLECTION_NAME
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

/// One chunk returned by a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance, lower is closer
    pub distance: f32,
    pub collection: String,
}

/// A named partition of the index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub name: String,
    pub description: String,
    pub approximate_count: usize,
}

impl From<&IndexingConfig> for GraphParams {
    fn from(config: &IndexingConfig) -> Self {
        Self {
            m: config.hnsw_m,
            ef_construction: config.hnsw_ef_construction,
            ef_search: config.hnsw_ef_search,
            max_elements: config.max_elements,
        }
    }
}

struct CollectionHandle {
    graph: RwLock<CollectionGraph>,
    /// Held for the whole of any write to this collection
    writer: Mutex<()>,
}

impl CollectionHandle {
    fn new(graph: CollectionGraph) -> Arc<Self> {
        Arc::new(Self {
            graph: RwLock::new(graph),
            writer: Mutex::new(()),
        })
    }
}

/// Owner of every collection under one index directory
pub struct VectorIndexManager {
    root: PathBuf,
    store: ChunkStore,
    provider: Arc<dyn EmbeddingProvider>,
    params: GraphParams,
    collections: RwLock<HashMap<String, Arc<CollectionHandle>>>,
}

impl VectorIndexManager {
    /// Open (or create) the index at `path`
    ///
    /// Fails if the index was built with a different embedding model or
    /// dimension than `provider`. Graphs are rebuilt from persisted vectors.
    pub fn open(
        path: &Path,
        provider: Arc<dyn EmbeddingProvider>,
        params: GraphParams,
    ) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| DocIndexError::Io {
            source: e,
            context: format!("Failed to create index directory: {:?}", path),
        })?;

        let store = ChunkStore::open(&path.join(DB_FILE))?;
        check_embedding_space(path, &store, provider.as_ref())?;

        let mut collections = HashMap::new();
        for row in store.collections()? {
            let items = store.load_embeddings(&row.name)?;
            let graph = CollectionGraph::build(provider.dimension(), params, items)?;
            tracing::debug!("Loaded collection {} ({} chunks)", row.name, graph.len());
            collections.insert(row.name, CollectionHandle::new(graph));
        }

        tracing::info!(
            "Opened index at {:?}: {} collections, model {}",
            path,
            collections.len(),
            provider.model_name()
        );

        Ok(Self {
            root: path.to_path_buf(),
            store,
            provider,
            params,
            collections: RwLock::new(collections),
        })
    }

    /// Release the index
    pub fn close(self) {
        let count = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        tracing::info!("Closing index at {:?} ({} collections)", self.root, count);
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    fn handle(&self, collection: &str) -> Option<Arc<CollectionHandle>> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned()
    }

    fn handle_or_create(&self, collection: &str, description: &str) -> Result<Arc<CollectionHandle>> {
        if !is_valid_collection_name(collection) {
            return Err(DocIndexError::InvalidCollectionName {
                name: collection.to_string(),
            });
        }

        if let Some(handle) = self.handle(collection) {
            return Ok(handle);
        }

        self.store.ensure_collection(collection, description)?;

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let handle = collections
            .entry(collection.to_string())
            .or_insert_with(|| {
                tracing::info!("Created collection {}", collection);
                CollectionHandle::new(CollectionGraph::new(self.provider.dimension(), self.params))
            })
            .clone();

        Ok(handle)
    }

    /// Create a collection if it does not exist yet
    pub fn ensure_collection(&self, name: &str, description: &str) -> Result<()> {
        self.handle_or_create(name, description).map(|_| ())
    }

    /// Add chunks to a collection, upserting by source filename and id
    ///
    /// Mismatched lengths, duplicate ids within the call and invalid
    /// collection names are errors. Embedding or storage failures for
    /// individual chunks are logged; the return value is the number of chunks
    /// actually stored.
    pub fn add(
        &self,
        collection: &str,
        ids: &[String],
        documents: &[String],
        metadatas: &[ChunkMetadata],
    ) -> Result<usize> {
        if ids.len() != documents.len() || ids.len() != metadatas.len() {
            return Err(DocIndexError::LengthMismatch {
                ids: ids.len(),
                documents: documents.len(),
                metadatas: metadatas.len(),
            });
        }

        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(DocIndexError::DuplicateChunkId { id: id.clone() });
            }
        }

        let handle = self.handle_or_create(collection, "")?;
        if ids.is_empty() {
            return Ok(0);
        }

        let _writer = handle.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let embeddings = self.embed_documents(documents);

        let mut stored = 0;
        for (((id, document), metadata), embedding) in
            ids.iter().zip(documents).zip(metadatas).zip(embeddings)
        {
            let Some(embedding) = embedding else {
                continue;
            };

            let row_id = match self
                .store
                .upsert_chunk(collection, id, document, metadata, &embedding)
            {
                Ok(row_id) => row_id,
                Err(e) => {
                    tracing::warn!("Failed to store chunk {} in {}: {}", id, collection, e);
                    continue;
                }
            };

            let mut graph = handle.graph.write().unwrap_or_else(PoisonError::into_inner);
            match graph.upsert(row_id, embedding) {
                Ok(_) => stored += 1,
                Err(e) => tracing::warn!("Failed to index chunk {} in {}: {}", id, collection, e),
            }
        }

        if stored < ids.len() {
            tracing::warn!(
                "Stored {}/{} chunks in collection {}",
                stored,
                ids.len(),
                collection
            );
        } else {
            tracing::debug!("Stored {} chunks in collection {}", stored, collection);
        }

        compact_if_needed(collection, &handle);

        Ok(stored)
    }

    /// Embed a batch, falling back to one-by-one so a bad text only loses itself
    fn embed_documents(&self, documents: &[String]) -> Vec<Option<Vec<f32>>> {
        match self.provider.embed_batch(documents) {
            Ok(embeddings) => embeddings.into_iter().map(Some).collect(),
            Err(batch_error) => {
                tracing::warn!("Batch embedding failed, retrying per chunk: {}", batch_error);
                documents
                    .iter()
                    .enumerate()
                    .map(|(i, text)| match self.provider.embed(text) {
                        Ok(embedding) => Some(embedding),
                        Err(e) => {
                            tracing::warn!("Failed to embed chunk {}: {}", i, e);
                            None
                        }
                    })
                    .collect()
            }
        }
    }

    /// Embed query text with the index's provider
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.provider.embed(text)?)
    }

    /// Nearest chunks to `text`, at most `top_k`, ascending by distance
    ///
    /// An unknown or empty collection yields no hits.
    pub fn query(&self, collection: &str, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 || self.handle(collection).is_none() {
            return Ok(Vec::new());
        }
        let vector = self.embed_query(text)?;
        self.query_by_vector(collection, &vector, top_k)
    }

    /// Nearest chunks to an already embedded query
    pub fn query_by_vector(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let Some(handle) = self.handle(collection) else {
            return Ok(Vec::new());
        };

        let neighbours = {
            let graph = handle.graph.read().unwrap_or_else(PoisonError::into_inner);
            graph.search(vector, top_k)?
        };
        if neighbours.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<i64> = neighbours.iter().map(|(row, _)| *row).collect();
        let mut chunks: HashMap<i64, StoredChunk> = self
            .store
            .get_chunks(collection, &rows)?
            .into_iter()
            .map(|chunk| (chunk.row_id, chunk))
            .collect();

        let hits = neighbours
            .into_iter()
            .filter_map(|(row, distance)| {
                let chunk = chunks.remove(&row)?;
                Some(SearchHit {
                    chunk_id: chunk.chunk_id,
                    content: chunk.content,
                    metadata: chunk.metadata,
                    distance,
                    collection: collection.to_string(),
                })
            })
            .collect();

        Ok(hits)
    }

    /// Chunk count per collection; a count that cannot be read reports 0
    pub fn collection_stats(&self) -> BTreeMap<String, usize> {
        self.collection_names()
            .into_iter()
            .map(|name| {
                let count = self.store.count(&name).unwrap_or_else(|e| {
                    tracing::warn!("Failed to count collection {}: {}", name, e);
                    0
                });
                (name, count)
            })
            .collect()
    }

    /// Names of every known collection, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        Ok(self
            .store
            .collections()?
            .into_iter()
            .map(|row| Collection {
                name: row.name,
                description: row.description,
                approximate_count: row.count,
            })
            .collect())
    }

    pub fn collection_count(&self, collection: &str) -> Result<usize> {
        self.store.count(collection)
    }

    /// Total chunks across every collection
    pub fn total_chunks(&self) -> Result<usize> {
        Ok(self.store.collections()?.iter().map(|row| row.count).sum())
    }

    /// Every chunk of one file, ordered by chunk index
    pub fn get_document_chunks(&self, collection: &str, filename: &str) -> Result<Vec<Chunk>> {
        Ok(self
            .store
            .chunks_for_filename(collection, filename)?
            .into_iter()
            .map(|stored| Chunk {
                chunk_id: stored.chunk_id,
                document_id: stored.metadata.document_id.clone(),
                content: stored.content,
                metadata: stored.metadata,
                embedding: None,
            })
            .collect())
    }

    /// Remove one document's chunks, returning how many were removed
    pub fn delete_document(&self, collection: &str, document_id: &str) -> Result<usize> {
        let Some(handle) = self.handle(collection) else {
            return Ok(0);
        };
        let _writer = handle.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let removed = self.store.delete_document(collection, document_id)?;
        {
            let mut graph = handle.graph.write().unwrap_or_else(PoisonError::into_inner);
            for row in &removed {
                graph.remove(*row);
            }
        }
        compact_if_needed(collection, &handle);

        tracing::info!(
            "Deleted document {} from {} ({} chunks)",
            document_id,
            collection,
            removed.len()
        );
        Ok(removed.len())
    }

    /// Remove every chunk of a collection; the collection stays, empty
    pub fn clear_collection(&self, collection: &str) -> Result<usize> {
        let Some(handle) = self.handle(collection) else {
            return Ok(0);
        };
        let _writer = handle.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let removed = self.store.clear_collection(collection)?;
        *handle.graph.write().unwrap_or_else(PoisonError::into_inner) =
            CollectionGraph::new(self.provider.dimension(), self.params);

        tracing::info!("Cleared collection {} ({} chunks)", collection, removed);
        Ok(removed)
    }

    /// Clear every collection, returning the total number of chunks removed
    pub fn clear_all_collections(&self) -> Result<usize> {
        let mut removed = 0;
        for name in self.collection_names() {
            removed += self.clear_collection(&name)?;
        }
        Ok(removed)
    }

    /// Drop a collection entirely; false if it did not exist
    pub fn delete_collection(&self, collection: &str) -> Result<bool> {
        let handle = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(collection);

        // Let an in-flight write finish before the rows go
        let _writer = handle
            .as_ref()
            .map(|h| h.writer.lock().unwrap_or_else(PoisonError::into_inner));

        let existed = self.store.delete_collection(collection)?;
        if existed {
            tracing::info!("Deleted collection {}", collection);
        }
        Ok(existed || handle.is_some())
    }
}

/// Caller must hold the collection's writer lock
fn compact_if_needed(collection: &str, handle: &CollectionHandle) {
    let mut graph = handle.graph.write().unwrap_or_else(PoisonError::into_inner);
    if graph.needs_compaction() {
        let stale = graph.stale_count();
        graph.compact();
        tracing::debug!(
            "Compacted collection {} ({} chunks, {} stale slots dropped)",
            collection,
            graph.len(),
            stale
        );
    }
}

fn check_embedding_space(
    path: &Path,
    store: &ChunkStore,
    provider: &dyn EmbeddingProvider,
) -> Result<()> {
    let requested_model = provider.model_name().to_string();
    let requested_dimension = provider.dimension().to_string();

    match (store.meta(META_MODEL)?, store.meta(META_DIMENSION)?) {
        (Some(model), Some(dimension)) => {
            if model != requested_model || dimension != requested_dimension {
                return Err(DocIndexError::EmbeddingSpaceMismatch {
                    path: path.to_path_buf(),
                    stored: format!("{} ({}D)", model, dimension),
                    requested: format!("{} ({}D)", requested_model, requested_dimension),
                });
            }
        }
        _ => {
            store.set_meta(META_MODEL, &requested_model)?;
            store.set_meta(META_DIMENSION, &requested_dimension)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::DocumentChunker;
    use crate::embedding::HashEmbedder;
    use tempfile::TempDir;

    fn open_index(temp: &TempDir) -> VectorIndexManager {
        VectorIndexManager::open(
            temp.path(),
            Arc::new(HashEmbedder::new(64)),
            GraphParams::default(),
        )
        .unwrap()
    }

    fn chunks_for(filename: &str, text: &str) -> (Vec<String>, Vec<String>, Vec<ChunkMetadata>) {
        let chunks = DocumentChunker::default().chunk(text);
        let ids = chunks.iter().map(|c| c.chunk_id.clone()).collect();
        let documents = chunks.iter().map(|c| c.content.clone()).collect();
        let metadatas = chunks
            .into_iter()
            .map(|c| {
                let mut metadata = c.metadata;
                metadata.filename = Some(filename.to_string());
                metadata
            })
            .collect();
        (ids, documents, metadatas)
    }

    #[test]
    fn test_collection_names() {
        assert!(is_valid_collection_name("financial"));
        assert!(is_valid_collection_name("q3_reports-2024"));
        assert!(!is_valid_collection_name(""));
        assert!(!is_valid_collection_name("Financial"));
        assert!(!is_valid_collection_name("has space"));
        assert!(!is_valid_collection_name(&"a".repeat(65)));
    }

    #[test]
    fn test_add_and_query() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);

        let (ids, docs, metas) = chunks_for("revenue.md", "Revenue growth was strong.");
        assert_eq!(index.add("financial", &ids, &docs, &metas).unwrap(), 1);

        let (ids, docs, metas) = chunks_for("ops.md", "Kubernetes pods restart on failure.");
        assert_eq!(index.add("financial", &ids, &docs, &metas).unwrap(), 1);

        let hits = index.query("financial", "revenue growth", 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.filename.as_deref(), Some("revenue.md"));
        assert_eq!(hits[0].collection, "financial");
        assert!(hits[0].distance <= hits[1].distance);

        assert_eq!(index.query("financial", "revenue growth", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_query_unknown_or_empty_collection() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);

        assert!(index.query("missing", "anything", 5).unwrap().is_empty());

        index.ensure_collection("technical", "Technical docs").unwrap();
        assert!(index.query("technical", "anything", 5).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_same_id() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);

        let (ids, docs, metas) = chunks_for("a.md", "Quarterly revenue grew.");
        index.add("financial", &ids, &docs, &metas).unwrap();
        index.add("financial", &ids, &docs, &metas).unwrap();

        assert_eq!(index.collection_count("financial").unwrap(), 1);
        assert_eq!(index.query("financial", "revenue", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_add_contract_violations() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);
        let (ids, docs, metas) = chunks_for("a.md", "Some text.");

        let err = index.add("financial", &ids, &[], &metas).unwrap_err();
        assert!(matches!(err, DocIndexError::LengthMismatch { .. }));

        let twice = vec![ids[0].clone(), ids[0].clone()];
        let docs2 = vec![docs[0].clone(), docs[0].clone()];
        let metas2 = vec![metas[0].clone(), metas[0].clone()];
        let err = index.add("financial", &twice, &docs2, &metas2).unwrap_err();
        assert!(matches!(err, DocIndexError::DuplicateChunkId { .. }));

        let err = index.add("Bad Name", &ids, &docs, &metas).unwrap_err();
        assert!(matches!(err, DocIndexError::InvalidCollectionName { .. }));
    }

    #[test]
    fn test_add_reports_partial_count() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);
        let (ids, _, metas) = chunks_for("a.md", "Some text.");

        let ids = vec![ids[0].clone(), "chunk_blank".to_string()];
        let docs = vec!["Some text.".to_string(), "   ".to_string()];
        let metas = vec![metas[0].clone(), metas[0].clone()];

        assert_eq!(index.add("general", &ids, &docs, &metas).unwrap(), 1);
        assert_eq!(index.collection_count("general").unwrap(), 1);
    }

    #[test]
    fn test_reopen_recovers_collections() {
        let temp = TempDir::new().unwrap();
        {
            let index = open_index(&temp);
            let (ids, docs, metas) = chunks_for("a.md", "Revenue grew.");
            index.add("financial", &ids, &docs, &metas).unwrap();
            index.ensure_collection("technical", "").unwrap();
            index.close();
        }

        let index = open_index(&temp);
        let stats = index.collection_stats();
        assert_eq!(stats.get("financial"), Some(&1));
        assert_eq!(stats.get("technical"), Some(&0));
        assert_eq!(index.query("financial", "revenue", 5).unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_with_other_embedding_space_fails() {
        let temp = TempDir::new().unwrap();
        open_index(&temp).close();

        let result = VectorIndexManager::open(
            temp.path(),
            Arc::new(HashEmbedder::new(32)),
            GraphParams::default(),
        );
        assert!(matches!(
            result,
            Err(DocIndexError::EmbeddingSpaceMismatch { .. })
        ));
    }

    #[test]
    fn test_clear_collection_keeps_it() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);
        let (ids, docs, metas) = chunks_for("a.md", "Revenue grew.");
        index.add("financial", &ids, &docs, &metas).unwrap();

        assert_eq!(index.clear_collection("financial").unwrap(), 1);
        assert_eq!(index.collection_stats().get("financial"), Some(&0));
        assert!(index.query("financial", "revenue", 5).unwrap().is_empty());

        let listed = index.list_collections().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].approximate_count, 0);
    }

    #[test]
    fn test_delete_document_and_collection() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);

        let (ids, docs, metas) = chunks_for("a.md", "Revenue grew.");
        let document_id = metas[0].document_id.clone();
        index.add("financial", &ids, &docs, &metas).unwrap();
        let (ids, docs, metas) = chunks_for("b.md", "Profit fell.");
        index.add("financial", &ids, &docs, &metas).unwrap();

        assert_eq!(index.delete_document("financial", &document_id).unwrap(), 1);
        let hits = index.query("financial", "revenue", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.filename.as_deref(), Some("b.md"));

        assert!(index.delete_collection("financial").unwrap());
        assert!(!index.delete_collection("financial").unwrap());
        assert!(index.collection_names().is_empty());
        assert_eq!(index.total_chunks().unwrap(), 0);
    }

    #[test]
    fn test_get_document_chunks_ordered() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);

        let text = format!("{}\n\n{}", "First paragraph. ".repeat(20), "Second one. ".repeat(20));
        let (ids, docs, metas) = chunks_for("long.md", &text);
        assert!(ids.len() > 1);
        index.add("general", &ids, &docs, &metas).unwrap();

        let chunks = index.get_document_chunks("general", "long.md").unwrap();
        assert_eq!(chunks.len(), ids.len());
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
        }
    }

    #[test]
    fn test_repeated_upserts_compact() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);
        let (ids, _, metas) = chunks_for("a.md", "Revenue grew.");

        for i in 0..100 {
            let docs = vec![format!("Revenue grew by {} percent.", i)];
            index.add("financial", &ids, &docs, &metas).unwrap();
        }

        assert_eq!(index.collection_count("financial").unwrap(), 1);
        let hits = index.query("financial", "revenue", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "Revenue grew by 99 percent.");
    }

    #[test]
    fn test_identical_readds_stay_visible() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);
        let (ids, docs, metas) = chunks_for("a.md", "Revenue grew strongly this quarter.");

        let mut missing = Vec::new();
        for i in 1..=100 {
            index.add("financial", &ids, &docs, &metas).unwrap();
            if index.query("financial", "revenue", 5).unwrap().len() != 1 {
                missing.push(i);
            }
        }

        assert!(missing.is_empty(), "chunk missing after adds {:?}", missing);
        assert_eq!(index.collection_count("financial").unwrap(), 1);
    }

    #[test]
    fn test_same_content_under_two_filenames() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);
        let text = "Quarterly revenue grew by ten percent.";

        let (ids, docs, metas) = chunks_for("q1_report.md", text);
        index.add("financial", &ids, &docs, &metas).unwrap();
        let (ids, docs, metas) = chunks_for("q2_report.md", text);
        index.add("financial", &ids, &docs, &metas).unwrap();

        assert_eq!(index.collection_count("financial").unwrap(), 2);
        assert_eq!(index.get_document_chunks("financial", "q1_report.md").unwrap().len(), 1);
        assert_eq!(index.get_document_chunks("financial", "q2_report.md").unwrap().len(), 1);

        let mut files: Vec<String> = index
            .query("financial", "revenue", 5)
            .unwrap()
            .into_iter()
            .filter_map(|hit| hit.metadata.filename)
            .collect();
        files.sort();
        assert_eq!(files, vec!["q1_report.md", "q2_report.md"]);
    }
}
