//! Search over the vector index
//!
//! Hits from every requested collection are merged into one globally sorted
//! list, then grouped per source document keeping only the best chunks.
//! `HybridRanker` re-scores the grouped documents by literal keyword matches.

mod aggregator;
mod hybrid;

pub use aggregator::SearchAggregator;
pub use hybrid::{keywords_from_query, rerank, HybridRanker};

use crate::index::SearchHit;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// One kept chunk of an aggregated document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestChunk {
    pub content: String,
    pub distance: f32,
}

/// Search result for one source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDocument {
    pub filename: String,
    /// Lowest-distance chunks first
    pub best_chunks: Vec<BestChunk>,
    /// Distance of the best chunk; lowered by keyword boosts in hybrid search
    pub min_distance: f32,
    /// Collection of the best chunk
    pub collection: String,
    pub document_type: String,
    /// Keywords found by hybrid search
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,
}

/// Concatenate per-collection hits and sort ascending by distance
///
/// The sort is stable, so equal distances keep collection order.
pub fn merge_hits(per_collection: Vec<Vec<SearchHit>>) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = per_collection.into_iter().flatten().collect();
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Group sorted hits by filename, keeping at most `max_chunks` per document
///
/// `hits` must already be sorted ascending by distance, as produced by
/// [`merge_hits`], so the kept chunks are the globally best ones. Hits with
/// no filename group under their chunk id.
pub fn group_by_document(hits: Vec<SearchHit>, max_chunks: usize) -> Vec<AggregatedDocument> {
    let max_chunks = max_chunks.max(1);
    let mut positions: AHashMap<String, usize> = AHashMap::new();
    let mut documents: Vec<AggregatedDocument> = Vec::new();

    for hit in hits {
        let filename = hit
            .metadata
            .filename
            .clone()
            .unwrap_or_else(|| hit.chunk_id.clone());

        match positions.get(&filename) {
            Some(&position) => {
                let document = &mut documents[position];
                if document.best_chunks.len() < max_chunks {
                    document.best_chunks.push(BestChunk {
                        content: hit.content,
                        distance: hit.distance,
                    });
                }
                if hit.distance < document.min_distance {
                    document.min_distance = hit.distance;
                }
            }
            None => {
                positions.insert(filename.clone(), documents.len());
                documents.push(AggregatedDocument {
                    filename,
                    best_chunks: vec![BestChunk {
                        content: hit.content,
                        distance: hit.distance,
                    }],
                    min_distance: hit.distance,
                    collection: hit.collection,
                    document_type: hit
                        .metadata
                        .document_type
                        .unwrap_or_else(|| "unknown".to_string()),
                    matched_keywords: Vec::new(),
                });
            }
        }
    }

    documents.sort_by(|a, b| a.min_distance.total_cmp(&b.min_distance));
    documents
}
