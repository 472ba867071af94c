//! Keyword-boosted re-ranking of aggregated results

use super::{AggregatedDocument, SearchAggregator};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Words never worth boosting on
const STOP_WORDS: &[&str] = &[
    "about", "after", "all", "and", "any", "are", "been", "but", "can", "did", "does", "for",
    "from", "had", "has", "have", "her", "his", "how", "into", "its", "not", "our", "out", "over",
    "she", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "was", "were", "what", "when", "where", "which", "who", "why", "will", "with", "you", "your",
];

/// Keywords from free text: lowercase words of at least 3 characters,
/// first occurrence order, stop words removed
pub fn keywords_from_query(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut seen = HashSet::new();
    WORD.find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(w))
        .filter(|w| seen.insert(w.to_string()))
        .map(str::to_string)
        .collect()
}

/// Apply keyword boosts and keep the top `limit` documents
///
/// Every keyword found (case-insensitive) in any kept chunk lowers
/// `min_distance` by `boost` once, floored at zero. Keywords differing only
/// in case count as one, spelled as first given. The re-sort is stable, so
/// equal adjusted distances keep their prior order.
pub fn rerank(
    mut documents: Vec<AggregatedDocument>,
    keywords: &[String],
    boost: f32,
    limit: usize,
) -> Vec<AggregatedDocument> {
    let mut seen = HashSet::new();
    let keywords: Vec<(String, String)> = keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| (k.clone(), k.to_lowercase()))
        .filter(|(_, needle)| seen.insert(needle.clone()))
        .collect();

    for document in &mut documents {
        let chunks: Vec<String> = document
            .best_chunks
            .iter()
            .map(|c| c.content.to_lowercase())
            .collect();

        for (keyword, needle) in &keywords {
            if chunks.iter().any(|chunk| chunk.contains(needle.as_str())) {
                document.min_distance = (document.min_distance - boost).max(0.0);
                if !document.matched_keywords.contains(keyword) {
                    document.matched_keywords.push(keyword.clone());
                }
            }
        }
    }

    documents.sort_by(|a, b| a.min_distance.total_cmp(&b.min_distance));
    documents.truncate(limit);
    documents
}

/// Semantic search re-scored by keyword occurrence
pub struct HybridRanker {
    aggregator: Arc<SearchAggregator>,
}

impl HybridRanker {
    pub fn new(aggregator: Arc<SearchAggregator>) -> Self {
        Self { aggregator }
    }

    /// Search with an enlarged fetch window, then boost and truncate
    ///
    /// Empty `keywords` leaves the semantic order untouched. Failures degrade
    /// to an empty result like [`SearchAggregator::search`].
    pub async fn hybrid_search(
        &self,
        query: &str,
        keywords: &[String],
        collections: Option<&[String]>,
    ) -> Vec<AggregatedDocument> {
        let config = self.aggregator.config();
        let documents = self
            .aggregator
            .search(query, collections, config.hybrid_fetch_k)
            .await;

        let ranked = rerank(documents, keywords, config.keyword_boost, config.hybrid_limit);
        tracing::debug!(
            "Hybrid search {:?} with {} keywords: {} documents",
            query,
            keywords.len(),
            ranked.len()
        );
        ranked
    }

    /// Hybrid search using keywords taken from the query itself
    pub async fn hybrid_search_auto(
        &self,
        query: &str,
        collections: Option<&[String]>,
    ) -> Vec<AggregatedDocument> {
        let keywords = keywords_from_query(query);
        self.hybrid_search(query, &keywords, collections).await
    }
}
