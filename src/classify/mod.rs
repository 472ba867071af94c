//! Weighted-term collection classification
//!
//! The [`CategoryVocabulary`] is the single owner of the category term tables.
//! It is shared by the classifier (to pick a collection) and by retrieval (to
//! know which collections exist and how they are described).

use crate::config::ClassificationConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One category: its collection name, description and weighted terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Lowercase term -> weight
    pub terms: BTreeMap<String, u32>,
    /// Score filename hits with another category's terms instead of these
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_terms_from: Option<String>,
    /// Overrides the classifier-wide filename multiplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_multiplier: Option<u32>,
}

impl CategoryDefinition {
    pub fn new(name: &str, description: &str, terms: &[(&str, u32)]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            terms: terms
                .iter()
                .map(|(term, weight)| (term.to_lowercase(), *weight))
                .collect(),
            filename_terms_from: None,
            filename_multiplier: None,
        }
    }

    /// Score filename hits with `source`'s terms at `multiplier`
    pub fn with_filename_terms(mut self, source: &str, multiplier: u32) -> Self {
        self.filename_terms_from = Some(source.to_string());
        self.filename_multiplier = Some(multiplier);
        self
    }

    /// Built-in tables, in tie-break order
    ///
    /// `competitive` is a sibling of `market`: its content terms are market's
    /// competitor terms one weight higher, and a filename hit on any market
    /// term adds that term's weight once.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::new(
                "financial",
                "Financial reports, revenue and investment documents",
                &[
                    ("revenue", 3),
                    ("profit", 3),
                    ("financial", 2),
                    ("growth", 2),
                    ("market cap", 3),
                    ("investment", 2),
                    ("margin", 2),
                    ("earnings", 2),
                    ("billion", 2),
                    ("million", 1),
                    ("dollar", 1),
                    ("cost", 1),
                ],
            ),
            Self::new(
                "technical",
                "Architecture, infrastructure and engineering documents",
                &[
                    ("architecture", 3),
                    ("api", 3),
                    ("technical", 2),
                    ("system", 2),
                    ("infrastructure", 2),
                    ("kubernetes", 3),
                    ("microservices", 3),
                    ("deployment", 2),
                    ("performance", 2),
                    ("security", 2),
                    ("scalability", 2),
                ],
            ),
            Self::new(
                "market",
                "Market research, customer and industry analysis",
                &[
                    ("market", 3),
                    ("customer", 3),
                    ("competition", 3),
                    ("trend", 2),
                    ("analysis", 2),
                    ("industry", 2),
                    ("competitive", 2),
                    ("segmentation", 2),
                    ("landscape", 2),
                    ("opportunity", 2),
                    ("threat", 1),
                    ("market share", 3),
                    ("competitor", 2),
                ],
            ),
            Self::new(
                "competitive",
                "Competitor and market share intelligence",
                &[
                    ("competitive", 3),
                    ("market share", 4),
                    ("competitor", 3),
                    ("competition", 4),
                ],
            )
            .with_filename_terms("market", 1),
        ]
    }
}

/// Ordered category tables plus the fallback collection
#[derive(Debug, Clone)]
pub struct CategoryVocabulary {
    categories: Vec<CategoryDefinition>,
    default_collection: String,
    default_description: String,
}

impl Default for CategoryVocabulary {
    fn default() -> Self {
        Self::new(CategoryDefinition::builtin(), "general")
    }
}

impl CategoryVocabulary {
    pub fn new(categories: Vec<CategoryDefinition>, default_collection: &str) -> Self {
        Self {
            categories,
            default_collection: default_collection.to_string(),
            default_description: "Documents without a dominant topic".to_string(),
        }
    }

    pub fn from_config(config: &ClassificationConfig) -> Self {
        Self::new(config.categories.clone(), &config.default_collection)
    }

    pub fn categories(&self) -> &[CategoryDefinition] {
        &self.categories
    }

    pub fn default_collection(&self) -> &str {
        &self.default_collection
    }

    /// Every collection this vocabulary can route to, default last
    pub fn collection_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| c.name.clone())
            .chain(std::iter::once(self.default_collection.clone()))
            .collect()
    }

    /// Human-readable description for a collection name
    pub fn describe(&self, collection: &str) -> &str {
        if collection == self.default_collection {
            return &self.default_description;
        }
        self.categories
            .iter()
            .find(|c| c.name == collection)
            .map(|c| c.description.as_str())
            .unwrap_or("")
    }
}

/// Per-category score breakdown, in vocabulary order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub collection: String,
    pub scores: Vec<(String, u32)>,
}

/// Picks a target collection from filename and content
#[derive(Debug, Clone)]
pub struct CollectionClassifier {
    vocabulary: CategoryVocabulary,
    threshold: u32,
    preview_chars: usize,
    filename_multiplier: u32,
}

impl CollectionClassifier {
    pub fn new(
        vocabulary: CategoryVocabulary,
        threshold: u32,
        preview_chars: usize,
        filename_multiplier: u32,
    ) -> Self {
        Self {
            vocabulary,
            threshold,
            preview_chars,
            filename_multiplier,
        }
    }

    pub fn from_config(config: &ClassificationConfig) -> Self {
        Self::new(
            CategoryVocabulary::from_config(config),
            config.threshold,
            config.preview_chars,
            config.filename_multiplier,
        )
    }

    pub fn vocabulary(&self) -> &CategoryVocabulary {
        &self.vocabulary
    }

    /// Collection name for a document
    pub fn classify(&self, filename: &str, content: &str) -> String {
        self.classify_detailed(filename, content).collection
    }

    /// Classify and return the per-category scores
    ///
    /// Content terms score `weight * occurrences` over the first
    /// `preview_chars` characters; each filename term present in the filename
    /// adds `weight * filename_multiplier`. Filename terms are the category's
    /// own unless it borrows another category's. The highest score wins,
    /// earlier categories win ties, and nothing above the threshold means the
    /// default.
    pub fn classify_detailed(&self, filename: &str, content: &str) -> Classification {
        let filename = filename.to_lowercase();
        let preview: String = content.chars().take(self.preview_chars).collect();
        let preview = preview.to_lowercase();

        let scores: Vec<(String, u32)> = self
            .vocabulary
            .categories
            .iter()
            .map(|category| {
                let content_score: u32 = category
                    .terms
                    .iter()
                    .map(|(term, weight)| weight * preview.matches(term.as_str()).count() as u32)
                    .sum();

                let multiplier = category.filename_multiplier.unwrap_or(self.filename_multiplier);
                let filename_score: u32 = self
                    .filename_terms(category)
                    .iter()
                    .filter(|(term, _)| filename.contains(term.as_str()))
                    .map(|(_, weight)| weight * multiplier)
                    .sum();

                (category.name.clone(), content_score + filename_score)
            })
            .collect();

        let mut best: Option<&(String, u32)> = None;
        for entry in &scores {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }

        let collection = match best {
            Some((name, score)) if *score > self.threshold => name.clone(),
            _ => self.vocabulary.default_collection.clone(),
        };

        tracing::debug!(collection = %collection, ?scores, "classified document");

        Classification { collection, scores }
    }

    fn filename_terms<'a>(&'a self, category: &'a CategoryDefinition) -> &'a BTreeMap<String, u32> {
        category
            .filename_terms_from
            .as_deref()
            .and_then(|source| self.vocabulary.categories.iter().find(|c| c.name == source))
            .map_or(&category.terms, |source| &source.terms)
    }
}

impl Default for CollectionClassifier {
    fn default() -> Self {
        Self::new(CategoryVocabulary::default(), 5, 2000, 2)
    }
}

/// Coarse document type from the file extension
pub fn document_type(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    if lower.ends_with(".pdf") {
        "pdf"
    } else if lower.ends_with(".md") {
        "markdown"
    } else if lower.ends_with(".json") {
        "json"
    } else if lower.ends_with(".txt") {
        "text"
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_financial_report() {
        let classifier = CollectionClassifier::default();
        let collection = classifier.classify(
            "financial_report_2024.md",
            "Revenue grew 15%. Profit margin improved.",
        );
        assert_eq!(collection, "financial");
    }

    #[test]
    fn test_below_threshold_is_general() {
        let classifier = CollectionClassifier::default();
        let collection = classifier.classify("notes.txt", "The weather was nice today.");
        assert_eq!(collection, "general");
    }

    #[test]
    fn test_score_exactly_at_threshold_is_general() {
        // "revenue" (3) + "margin" (2) = 5, which is not > 5
        let classifier = CollectionClassifier::default();
        let result = classifier.classify_detailed("a.txt", "revenue and margin");
        assert_eq!(result.scores[0], ("financial".to_string(), 5));
        assert_eq!(result.collection, "general");
    }

    #[test]
    fn test_filename_counts_double() {
        let classifier = CollectionClassifier::default();
        let result = classifier.classify_detailed("kubernetes_notes.txt", "nothing relevant");
        let technical = result.scores.iter().find(|(n, _)| n == "technical").unwrap();
        assert_eq!(technical.1, 6);
        assert_eq!(result.collection, "technical");
    }

    #[test]
    fn test_overlapping_terms_score_both() {
        let classifier = CollectionClassifier::default();
        let result = classifier.classify_detailed(
            "brief.txt",
            "Each competitor and every rival competitor gained market share while competition increased.",
        );

        let market = result.scores.iter().find(|(n, _)| n == "market").unwrap().1;
        let competitive = result
            .scores
            .iter()
            .find(|(n, _)| n == "competitive")
            .unwrap()
            .1;

        assert!(market > 5);
        assert!(competitive > market);
        assert_eq!(result.collection, "competitive");
    }

    #[test]
    fn test_market_filename_terms_boost_competitive_once() {
        let classifier = CollectionClassifier::default();
        let result = classifier.classify_detailed("competitor.txt", "");
        assert_eq!(
            result.scores,
            vec![
                ("financial".to_string(), 0),
                ("technical".to_string(), 0),
                ("market".to_string(), 4),
                ("competitive".to_string(), 2),
            ]
        );
        assert_eq!(result.collection, "general");

        // "customer" is a market term only, yet still lifts competitive
        let result = classifier.classify_detailed("customer_survey.txt", "");
        assert_eq!(result.scores[2].1, 6);
        assert_eq!(result.scores[3].1, 3);
        assert_eq!(result.collection, "market");
    }

    #[test]
    fn test_tie_goes_to_first_category() {
        let vocabulary = CategoryVocabulary::new(
            vec![
                CategoryDefinition::new("alpha", "", &[("shared", 3)]),
                CategoryDefinition::new("beta", "", &[("shared", 3)]),
            ],
            "general",
        );
        let classifier = CollectionClassifier::new(vocabulary, 5, 2000, 2);

        let result = classifier.classify_detailed("x.txt", "shared shared shared");
        assert_eq!(result.scores[0].1, result.scores[1].1);
        assert_eq!(result.collection, "alpha");
    }

    #[test]
    fn test_preview_is_bounded() {
        let classifier = CollectionClassifier::new(CategoryVocabulary::default(), 5, 20, 2);
        let content = format!("{}{}", " ".repeat(20), "revenue profit revenue profit");
        assert_eq!(classifier.classify("doc.txt", &content), "general");
    }

    #[test]
    fn test_deterministic() {
        let classifier = CollectionClassifier::default();
        let content = "Our API architecture relies on microservices and kubernetes deployment.";
        let first = classifier.classify("design.md", content);
        let second = classifier.classify("design.md", content);
        assert_eq!(first, second);
        assert_eq!(first, "technical");
    }

    #[test]
    fn test_case_insensitive() {
        let classifier = CollectionClassifier::default();
        assert_eq!(
            classifier.classify("Q3.TXT", "REVENUE and PROFIT and EARNINGS"),
            "financial"
        );
    }

    #[test]
    fn test_vocabulary_names_and_descriptions() {
        let vocabulary = CategoryVocabulary::default();
        assert_eq!(
            vocabulary.collection_names(),
            vec!["financial", "technical", "market", "competitive", "general"]
        );
        assert!(!vocabulary.describe("financial").is_empty());
        assert!(!vocabulary.describe("general").is_empty());
        assert_eq!(vocabulary.describe("unknown"), "");
    }

    #[test]
    fn test_document_type() {
        assert_eq!(document_type("a.PDF"), "pdf");
        assert_eq!(document_type("b.md"), "markdown");
        assert_eq!(document_type("c.json"), "json");
        assert_eq!(document_type("d.txt"), "text");
        assert_eq!(document_type("e.docx"), "unknown");
    }
}
