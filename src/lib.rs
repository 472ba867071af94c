//! docindex - Topic-partitioned document retrieval
//!
//! Splits documents into overlapping chunks, routes each document to a topical
//! collection, stores chunk embeddings in a per-collection nearest-neighbor
//! index, and serves semantic and keyword-boosted searches that return one
//! result per source document.

pub mod chunking;
pub mod classify;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod retrieval;
pub mod source;

pub use error::{DocIndexError, Result};
