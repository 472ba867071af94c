//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docindex",
    version,
    author = "neur0map",
    about = "Topic-partitioned document index with semantic and hybrid search",
    long_about = "docindex splits documents into overlapping chunks, routes each document to a topical \
                  collection, stores chunk embeddings in a per-collection nearest-neighbor index, and \
                  answers semantic and keyword-boosted searches grouped by source document."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/docindex/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest every document under a directory
    Ingest {
        /// Document directory (defaults to documents.dir from the config)
        dir: Option<PathBuf>,

        /// Re-ingest even if the index already holds chunks
        #[arg(short, long)]
        force: bool,
    },

    /// Semantic search grouped by document
    Search {
        /// Search query text
        query: String,

        /// Restrict to these collections (repeatable; defaults to all)
        #[arg(short = 'C', long = "collection", value_name = "NAME")]
        collections: Vec<String>,

        /// Hits fetched per collection
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Semantic search re-ranked by keyword matches
    Hybrid {
        /// Search query text
        query: String,

        /// Keywords to boost (repeatable; defaults to words from the query)
        #[arg(short, long = "keyword", value_name = "WORD")]
        keywords: Vec<String>,

        /// Restrict to these collections (repeatable; defaults to all)
        #[arg(short = 'C', long = "collection", value_name = "NAME")]
        collections: Vec<String>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show which collection a file would be routed to
    Classify {
        /// File to classify
        file: PathBuf,
    },

    /// Show how a file would be chunked
    Chunk {
        /// File to chunk
        file: PathBuf,

        /// Show chunks in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show collections and chunk counts
    Stats {
        /// Show stats in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Remove chunks from one collection, or from all of them
    Clear {
        /// Collection to clear (defaults to every collection)
        collection: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
