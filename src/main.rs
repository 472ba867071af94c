use docindex::chunking::DocumentChunker;
use docindex::classify::{CategoryVocabulary, CollectionClassifier};
use docindex::cli::{Cli, Commands, ConfigAction};
use docindex::config::Config;
use docindex::embedding::create_provider;
use docindex::error::{DocIndexError, Result};
use docindex::index::{GraphParams, VectorIndexManager};
use docindex::ingest::IngestionPipeline;
use docindex::retrieval::{AggregatedDocument, HybridRanker, SearchAggregator};
use docindex::source::DirectorySource;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Ingest { dir, force } => {
            cmd_ingest(cli.config, dir, force)?;
        }
        Commands::Search {
            query,
            collections,
            top_k,
            json,
        } => {
            cmd_search(cli.config, &query, collections, top_k, json)?;
        }
        Commands::Hybrid {
            query,
            keywords,
            collections,
            json,
        } => {
            cmd_hybrid(cli.config, &query, keywords, collections, json)?;
        }
        Commands::Classify { file } => {
            cmd_classify(cli.config, &file)?;
        }
        Commands::Chunk { file, json } => {
            cmd_chunk(cli.config, &file, json)?;
        }
        Commands::Stats { json } => {
            cmd_stats(cli.config, json)?;
        }
        Commands::Clear { collection } => {
            cmd_clear(cli.config, collection)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "docindex=debug" } else { "docindex=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_ingest(config_path: Option<PathBuf>, dir: Option<PathBuf>, force: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let index = open_index(&config)?;
    let pipeline = Arc::new(IngestionPipeline::from_config(&config, Arc::clone(&index)));

    let dir = match dir {
        Some(dir) => dir,
        None => Config::expand_path(&config.documents.dir)?,
    };
    let source = DirectorySource::new(&dir, &config.documents.extensions);

    tracing::info!("Ingesting documents from {:?}", dir);
    let summary = runtime()?.block_on(pipeline.bootstrap_concurrent(
        &source,
        force,
        config.ingest.max_concurrent,
    ))?;

    if summary.documents == 0 && summary.failed == 0 && !force {
        println!("Index already populated; use --force to re-ingest");
    } else {
        println!("✓ Ingested {} documents", summary.documents);
        println!("  Chunks stored: {}", summary.chunks_stored);
        println!("  Failed: {}", summary.failed);
        println!("  Duration: {}ms", summary.duration_ms);
    }

    drop(pipeline);
    close_index(index);
    Ok(())
}

fn cmd_search(
    config_path: Option<PathBuf>,
    query: &str,
    collections: Vec<String>,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let aggregator = build_aggregator(&config)?;
    let top_k = top_k.unwrap_or(config.search.top_k_per_collection);
    let filter = (!collections.is_empty()).then_some(collections.as_slice());

    let documents = runtime()?.block_on(aggregator.search(query, filter, top_k));
    print_documents(&documents, json)
}

fn cmd_hybrid(
    config_path: Option<PathBuf>,
    query: &str,
    keywords: Vec<String>,
    collections: Vec<String>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let ranker = HybridRanker::new(Arc::new(build_aggregator(&config)?));
    let filter = (!collections.is_empty()).then_some(collections.as_slice());

    let rt = runtime()?;
    let documents = if keywords.is_empty() {
        rt.block_on(ranker.hybrid_search_auto(query, filter))
    } else {
        rt.block_on(ranker.hybrid_search(query, &keywords, filter))
    };
    print_documents(&documents, json)
}

fn cmd_classify(config_path: Option<PathBuf>, file: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let classifier = CollectionClassifier::from_config(&config.classification);
    let content = read_file(file)?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let classification = classifier.classify_detailed(&filename, &content);

    println!("Collection: {}", classification.collection);
    println!("\nScores (threshold {}):", config.classification.threshold);
    for (category, score) in &classification.scores {
        println!("  {:<16} {}", category, score);
    }

    Ok(())
}

fn cmd_chunk(config_path: Option<PathBuf>, file: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let chunker = DocumentChunker::from_config(&config.chunking);
    let chunks = chunker.chunk(&read_file(file)?);

    if json {
        println!("{}", to_json(&chunks)?);
        return Ok(());
    }

    println!("{} chunks", chunks.len());
    for chunk in &chunks {
        println!(
            "\n[{}/{}] {} ({} words, {} chars)",
            chunk.metadata.chunk_index + 1,
            chunk.metadata.total_chunks,
            chunk.chunk_id,
            chunk.metadata.word_count,
            chunk.metadata.char_count
        );
        println!("{}", chunk.content);
    }

    Ok(())
}

fn cmd_stats(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let index = open_index(&config)?;
    let collections = index.list_collections()?;

    if json {
        println!("{}", to_json(&collections)?);
    } else {
        println!("Index: {}", index.path().display());
        println!("Model: {}", index.provider().model_name());
        println!("\nCollections: {}", collections.len());
        for collection in &collections {
            println!(
                "  {:<16} {:>8} chunks  {}",
                collection.name, collection.approximate_count, collection.description
            );
        }
        println!("\nTotal chunks: {}", index.total_chunks()?);
    }

    close_index(index);
    Ok(())
}

fn cmd_clear(config_path: Option<PathBuf>, collection: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let index = open_index(&config)?;

    let removed = match &collection {
        Some(name) => index.clear_collection(name)?,
        None => index.clear_all_collections()?,
    };

    match collection {
        Some(name) => println!("✓ Cleared {} chunks from {}", removed, name),
        None => println!("✓ Cleared {} chunks from all collections", removed),
    }

    close_index(index);
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };
            println!("{}", path.display());
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'docindex config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        return Ok(config);
    }

    Config::load(&path)
}

fn open_index(config: &Config) -> Result<Arc<VectorIndexManager>> {
    let provider = create_provider(&config.embedding)?;
    let index = VectorIndexManager::open(
        &config.index_dir()?,
        provider,
        GraphParams::from(&config.indexing),
    )?;
    Ok(Arc::new(index))
}

fn close_index(index: Arc<VectorIndexManager>) {
    if let Ok(index) = Arc::try_unwrap(index) {
        index.close();
    }
}

fn build_aggregator(config: &Config) -> Result<SearchAggregator> {
    Ok(SearchAggregator::new(
        open_index(config)?,
        Arc::new(CategoryVocabulary::from_config(&config.classification)),
        config.search.clone(),
    ))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| DocIndexError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| DocIndexError::Io {
        source: e,
        context: format!("Failed to read file: {:?}", path),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| DocIndexError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })
}

fn print_documents(documents: &[AggregatedDocument], json: bool) -> Result<()> {
    if json {
        println!("{}", to_json(&documents)?);
        return Ok(());
    }

    if documents.is_empty() {
        println!("No relevant documents found");
        return Ok(());
    }

    for (rank, document) in documents.iter().enumerate() {
        println!(
            "{}. {} [{}, {}] distance {:.4}",
            rank + 1,
            document.filename,
            document.collection,
            document.document_type,
            document.min_distance
        );
        if !document.matched_keywords.is_empty() {
            println!("   keywords: {}", document.matched_keywords.join(", "));
        }
        for chunk in &document.best_chunks {
            let preview: String = chunk.content.chars().take(160).collect();
            println!("   ({:.4}) {}", chunk.distance, preview.replace('\n', " "));
        }
    }

    Ok(())
}
