/// Fan-out search across collections with per-document aggregation
use super::{group_by_document, merge_hits, AggregatedDocument};
use crate::classify::CategoryVocabulary;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::index::{SearchHit, VectorIndexManager};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Queries several collections in parallel and groups hits by document
pub struct SearchAggregator {
    index: Arc<VectorIndexManager>,
    vocabulary: Arc<CategoryVocabulary>,
    config: SearchConfig,
}

impl SearchAggregator {
    pub fn new(
        index: Arc<VectorIndexManager>,
        vocabulary: Arc<CategoryVocabulary>,
        config: SearchConfig,
    ) -> Self {
        Self {
            index,
            vocabulary,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<VectorIndexManager> {
        &self.index
    }

    /// Vocabulary collections first, then any other collection in the index
    pub fn default_collections(&self) -> Vec<String> {
        let mut names = self.vocabulary.collection_names();
        for name in self.index.collection_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Search, degrading any failure to an empty result
    ///
    /// `None` searches every known collection; an empty slice searches none.
    pub async fn search(
        &self,
        query: &str,
        collections: Option<&[String]>,
        top_k_per_collection: usize,
    ) -> Vec<AggregatedDocument> {
        match self
            .try_search(query, collections, top_k_per_collection)
            .await
        {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!("Search failed, returning no results: {}", e);
                Vec::new()
            }
        }
    }

    /// Search, surfacing the first failure from any collection
    ///
    /// The query is embedded once and every collection is queried on its own
    /// blocking task. All collections must succeed; results are never partial.
    pub async fn try_search(
        &self,
        query: &str,
        collections: Option<&[String]>,
        top_k_per_collection: usize,
    ) -> Result<Vec<AggregatedDocument>> {
        let mut names: Vec<String> = Vec::new();
        let requested = match collections {
            Some(requested) => requested.to_vec(),
            None => self.default_collections(),
        };
        for name in requested {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        if names.is_empty() || top_k_per_collection == 0 {
            return Ok(Vec::new());
        }

        let vector = {
            let index = Arc::clone(&self.index);
            let query = query.to_string();
            tokio::task::spawn_blocking(move || index.embed_query(&query))
                .await
                .map_err(anyhow::Error::from)??
        };
        let vector = Arc::new(vector);

        let mut tasks = JoinSet::new();
        for (position, name) in names.iter().cloned().enumerate() {
            let index = Arc::clone(&self.index);
            let vector = Arc::clone(&vector);
            tasks.spawn_blocking(move || {
                let result = index.query_by_vector(&name, &vector, top_k_per_collection);
                (position, name, result)
            });
        }

        let mut per_collection: Vec<Vec<SearchHit>> = vec![Vec::new(); names.len()];
        while let Some(joined) = tasks.join_next().await {
            let (position, name, result) = joined.map_err(anyhow::Error::from)?;
            match result {
                Ok(hits) => {
                    tracing::debug!("{} hits from collection {}", hits.len(), name);
                    per_collection[position] = hits;
                }
                Err(e) => {
                    tracing::warn!("Query against collection {} failed: {}", name, e);
                    return Err(e);
                }
            }
        }

        let documents = group_by_document(
            merge_hits(per_collection),
            self.config.max_chunks_per_document,
        );

        tracing::debug!(
            "Search {:?} over {} collections: {} documents",
            query,
            names.len(),
            documents.len()
        );

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::index::GraphParams;
    use tempfile::TempDir;

    fn aggregator(temp: &TempDir) -> SearchAggregator {
        let index = VectorIndexManager::open(
            temp.path(),
            Arc::new(HashEmbedder::default()),
            GraphParams::default(),
        )
        .unwrap();
        SearchAggregator::new(
            Arc::new(index),
            Arc::new(CategoryVocabulary::default()),
            SearchConfig::default(),
        )
    }

    fn add(aggregator: &SearchAggregator, collection: &str, filename: &str, text: &str) {
        let chunks = crate::chunking::DocumentChunker::default().chunk(text);
        let ids: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();
        let docs: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let metas: Vec<_> = chunks
            .into_iter()
            .map(|c| {
                let mut m = c.metadata;
                m.filename = Some(filename.to_string());
                m
            })
            .collect();
        aggregator.index().add(collection, &ids, &docs, &metas).unwrap();
    }

    #[test]
    fn test_default_collections() {
        let temp = TempDir::new().unwrap();
        let aggregator = aggregator(&temp);
        aggregator.index().ensure_collection("archive", "").unwrap();
        aggregator.index().ensure_collection("financial", "").unwrap();

        assert_eq!(
            aggregator.default_collections(),
            vec!["financial", "technical", "market", "competitive", "general", "archive"]
        );
    }

    #[tokio::test]
    async fn test_search_across_collections() {
        let temp = TempDir::new().unwrap();
        let aggregator = aggregator(&temp);
        add(&aggregator, "financial", "revenue.md", "Revenue growth was strong.");
        add(&aggregator, "technical", "deploy.md", "Deployment growth of servers.");

        let documents = aggregator.search("revenue growth", None, 5).await;
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].filename, "revenue.md");
        assert_eq!(documents[0].collection, "financial");
        assert!(documents[0].min_distance <= documents[1].min_distance);
    }

    #[tokio::test]
    async fn test_empty_collection_list() {
        let temp = TempDir::new().unwrap();
        let aggregator = aggregator(&temp);
        add(&aggregator, "financial", "revenue.md", "Revenue growth was strong.");

        let none: Vec<String> = Vec::new();
        assert!(aggregator
            .search("revenue", Some(none.as_slice()), 5)
            .await
            .is_empty());
        assert!(aggregator.search("revenue", None, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_collection_names_searched_once() {
        let temp = TempDir::new().unwrap();
        let aggregator = aggregator(&temp);
        add(&aggregator, "financial", "revenue.md", "Revenue growth was strong.");

        let twice = vec!["financial".to_string(), "financial".to_string()];
        let documents = aggregator.search("revenue", Some(&twice), 5).await;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].best_chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_empty() {
        let temp = TempDir::new().unwrap();
        let aggregator = aggregator(&temp);
        add(&aggregator, "financial", "revenue.md", "Revenue growth was strong.");

        // An empty query cannot be embedded
        assert!(aggregator.try_search("   ", None, 5).await.is_err());
        assert!(aggregator.search("   ", None, 5).await.is_empty());
    }
}
