//! Paragraph-based document chunking with sentence overlap
//!
//! Documents are split on blank lines, paragraphs are packed into chunks of
//! roughly `chunk_size` characters, and each new chunk is seeded with the
//! trailing sentence(s) of the previous one. Chunk and document ids are
//! content-derived (BLAKE3), so re-ingesting identical text yields identical ids.

use crate::config::ChunkingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hex characters kept from each BLAKE3 digest
const ID_HEX_LEN: usize = 16;

/// Fixed-shape chunk metadata, with `extra` for caller-supplied fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// 0-based position within the document
    pub chunk_index: usize,
    /// Number of chunks the document produced
    pub total_chunks: usize,
    pub word_count: usize,
    pub char_count: usize,
    /// Content hash of the full source document
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ChunkMetadata {
    fn for_chunk(content: &str, document_id: &str, chunk_index: usize, total_chunks: usize) -> Self {
        Self {
            chunk_index,
            total_chunks,
            word_count: content.split_whitespace().count(),
            char_count: content.chars().count(),
            document_id: document_id.to_string(),
            filename: None,
            document_type: None,
            collection: None,
            ingested_at: None,
            extra: BTreeMap::new(),
        }
    }
}

/// A bounded slice of a document, the unit stored and retrieved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Stable document id: truncated BLAKE3 of the full content
pub fn document_id(content: &str) -> String {
    let hash = blake3::hash(content.as_bytes()).to_hex();
    hash[..ID_HEX_LEN].to_string()
}

/// Chunk id: document id plus a hash of the chunk text and its position
pub fn chunk_id(document_id: &str, chunk_content: &str, chunk_index: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(chunk_content.as_bytes());
    hasher.update(chunk_index.to_string().as_bytes());
    let hash = hasher.finalize().to_hex();
    format!("chunk_{}_{}", document_id, &hash[..ID_HEX_LEN])
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits raw text into overlapping chunks
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    chunk_size: usize,
    overlap_hint: usize,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

impl DocumentChunker {
    /// Create a chunker
    ///
    /// # Arguments
    /// * `chunk_size` - Soft limit in characters; a chunk only exceeds it by a carried overlap
    /// * `overlap_hint` - A trailing sentence at least this long is carried alone,
    ///   shorter ones are carried together with the sentence before them
    pub fn new(chunk_size: usize, overlap_hint: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap_hint,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.overlap_hint)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk a document and attach ids and metadata
    ///
    /// Never fails and never drops content: non-empty input always yields at
    /// least one chunk. Empty input yields none.
    pub fn chunk(&self, content: &str) -> Vec<Chunk> {
        let texts = self.split(content);
        let document_id = document_id(content);
        let total_chunks = texts.len();

        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                chunk_id: chunk_id(&document_id, &text, index),
                document_id: document_id.clone(),
                metadata: ChunkMetadata::for_chunk(&text, &document_id, index, total_chunks),
                content: text,
                embedding: None,
            })
            .collect()
    }

    /// Split text into chunk strings without metadata
    pub fn split(&self, content: &str) -> Vec<String> {
        if content.is_empty() {
            return Vec::new();
        }

        let mut pieces: Vec<&str> = Vec::new();
        for paragraph in content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            if char_len(paragraph) > self.chunk_size {
                pieces.extend(split_oversized(paragraph, self.chunk_size));
            } else {
                pieces.push(paragraph);
            }
        }

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0;
        // false while the buffer holds nothing but a carried overlap
        let mut fresh = false;

        for piece in pieces {
            let piece_len = char_len(piece);

            if fresh && buffer_len + piece_len > self.chunk_size {
                let seed = self.overlap_seed(&buffer);
                chunks.push(buffer.trim().to_string());
                buffer_len = char_len(&seed);
                buffer = seed;
                fresh = false;
            }

            buffer.push_str(piece);
            buffer.push_str("\n\n");
            buffer_len += piece_len + 2;
            fresh = true;
        }

        if fresh && !buffer.trim().is_empty() {
            chunks.push(buffer.trim().to_string());
        }

        if chunks.is_empty() {
            chunks.push(content.to_string());
        }

        chunks
    }

    /// Trailing sentence(s) of a closed chunk, or empty when it has fewer than 3
    fn overlap_seed(&self, closed: &str) -> String {
        let sentences: Vec<&str> = closed.trim_end().split(". ").collect();
        let n = sentences.len();
        if n < 3 {
            return String::new();
        }

        let last = sentences[n - 1].trim();
        let mut seed = if char_len(last) >= self.overlap_hint {
            last.to_string()
        } else {
            format!("{}. {}", sentences[n - 2].trim(), last)
        };

        if !seed.ends_with(['.', '!', '?']) {
            seed.push('.');
        }

        if char_len(&seed) > self.chunk_size / 2 {
            return String::new();
        }

        seed.push_str("\n\n");
        seed
    }
}

/// Break a paragraph longer than `size` characters into pieces of at most `size`,
/// cutting at the last whitespace in the second half of the window when there is one
fn split_oversized(text: &str, size: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while char_len(rest) > size {
        let hard = rest
            .char_indices()
            .nth(size)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard];
        let half = window
            .char_indices()
            .nth(size / 2)
            .map(|(i, _)| i)
            .unwrap_or(0);

        let cut = window[half..]
            .rfind(char::is_whitespace)
            .map(|i| half + i)
            .filter(|&cut| cut > 0)
            .unwrap_or(hard);

        let piece = rest[..cut].trim_end();
        if !piece.is_empty() {
            pieces.push(piece);
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }

    pieces
}
