use docindex::chunking::DocumentChunker;
use docindex::classify::CollectionClassifier;
use docindex::config::Config;
use docindex::embedding::HashEmbedder;
use docindex::index::{GraphParams, VectorIndexManager};
use docindex::ingest::IngestionPipeline;
use docindex::source::{DirectorySource, DocumentSource, MemorySource};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn open_index(path: &Path) -> Arc<VectorIndexManager> {
    let index = VectorIndexManager::open(
        path,
        Arc::new(HashEmbedder::default()),
        GraphParams::default(),
    )
    .unwrap();
    Arc::new(index)
}

fn pipeline(index: Arc<VectorIndexManager>) -> Arc<IngestionPipeline> {
    Arc::new(IngestionPipeline::new(
        DocumentChunker::default(),
        CollectionClassifier::default(),
        index,
    ))
}

fn sample_source() -> MemorySource {
    MemorySource::new()
        .with_document(
            "financial_report_2024.md",
            "Revenue grew 15%. Profit margin improved.",
        )
        .with_document(
            "deployment_guide.md",
            "Deploy the API server with docker. The database runs in kubernetes. \
             Configure the software architecture before deployment.",
        )
        .with_document("notes.txt", "The weather was nice today.")
}

#[test]
fn test_documents_routed_to_collections() {
    let temp = TempDir::new().unwrap();
    let pipeline = pipeline(open_index(temp.path()));

    let summary = pipeline.bootstrap(&sample_source(), false).unwrap();
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.failed, 0);

    let stats = pipeline.index().collection_stats();
    assert_eq!(stats.get("financial"), Some(&1));
    assert_eq!(stats.get("technical"), Some(&1));
    assert_eq!(stats.get("general"), Some(&1));

    let collections = pipeline.index().list_collections().unwrap();
    let general = collections.iter().find(|c| c.name == "general").unwrap();
    assert!(!general.description.is_empty());
}

#[test]
fn test_reopen_recovers_without_reingest() {
    let temp = TempDir::new().unwrap();

    let before = {
        let index = open_index(temp.path());
        pipeline(Arc::clone(&index))
            .bootstrap(&sample_source(), false)
            .unwrap();
        index.collection_stats()
    };

    let index = open_index(temp.path());
    assert_eq!(index.collection_stats(), before);

    // Bootstrap sees a populated index and does nothing
    let summary = pipeline(Arc::clone(&index))
        .bootstrap(&sample_source(), false)
        .unwrap();
    assert_eq!(summary.documents, 0);
    assert_eq!(index.collection_stats(), before);
}

#[test]
fn test_upsert_same_chunk_id_twice() {
    let temp = TempDir::new().unwrap();
    let index = open_index(temp.path());

    let chunk = DocumentChunker::default()
        .chunk("Quarterly revenue grew.")
        .remove(0);
    let ids = vec![chunk.chunk_id.clone()];
    let docs = vec![chunk.content.clone()];
    let metas = vec![chunk.metadata.clone()];

    index.add("financial", &ids, &docs, &metas).unwrap();
    index.add("financial", &ids, &docs, &metas).unwrap();

    assert_eq!(index.collection_count("financial").unwrap(), 1);
}

#[test]
fn test_clear_leaves_collection_queryable() {
    let temp = TempDir::new().unwrap();
    let pipeline = pipeline(open_index(temp.path()));
    pipeline.bootstrap(&sample_source(), false).unwrap();

    pipeline.index().clear_collection("financial").unwrap();

    let stats = pipeline.index().collection_stats();
    assert_eq!(stats.get("financial"), Some(&0));
    assert!(pipeline
        .index()
        .query("financial", "revenue", 5)
        .unwrap()
        .is_empty());

    pipeline.index().clear_all_collections().unwrap();
    assert_eq!(pipeline.index().total_chunks().unwrap(), 0);
    assert_eq!(pipeline.index().collection_names().len(), 3);
}

#[test]
fn test_long_document_round_trip() {
    let temp = TempDir::new().unwrap();
    let pipeline = pipeline(open_index(temp.path()));

    let paragraphs: Vec<String> = (0..12)
        .map(|i| {
            format!(
                "Section {} covers the server deployment. It lists every container. \
                 It ends with a checklist for the cluster.",
                i
            )
        })
        .collect();
    let content = paragraphs.join("\n\n");

    let report = pipeline
        .ingest("cluster_runbook.md", &content, &BTreeMap::new())
        .unwrap();
    assert!(report.chunk_count > 1);
    assert_eq!(report.chunks_stored, report.chunk_count);

    let chunks = pipeline
        .index()
        .get_document_chunks(&report.collection, "cluster_runbook.md")
        .unwrap();
    assert_eq!(chunks.len(), report.chunk_count);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.metadata.chunk_index, i);
        assert_eq!(chunk.metadata.total_chunks, report.chunk_count);
        assert_eq!(chunk.document_id, report.document_id);
    }

    let removed = pipeline
        .index()
        .delete_document(&report.collection, &report.document_id)
        .unwrap();
    assert_eq!(removed, report.chunk_count);
}

#[test]
fn test_directory_bootstrap_with_config() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("docs");
    std::fs::create_dir_all(docs.join("finance")).unwrap();
    std::fs::write(
        docs.join("finance/budget_forecast.md"),
        "Budget forecast shows revenue growth and higher profit.",
    )
    .unwrap();
    std::fs::write(docs.join("readme.txt"), "General notes.").unwrap();
    std::fs::write(docs.join("logo.png"), [0u8; 8]).unwrap();

    let config = Config::default();
    let source = DirectorySource::new(&docs, &config.documents.extensions);
    assert_eq!(source.list_documents().unwrap().len(), 2);

    let index = open_index(&temp.path().join("index"));
    let pipeline = Arc::new(IngestionPipeline::from_config(&config, Arc::clone(&index)));

    let summary = pipeline.bootstrap(&source, false).unwrap();
    assert_eq!(summary.documents, 2);
    assert_eq!(index.collection_stats().get("financial"), Some(&1));

    let chunks = index
        .get_document_chunks("financial", "finance/budget_forecast.md")
        .unwrap();
    assert_eq!(chunks.len(), 1);
}

#[tokio::test]
async fn test_concurrent_ingest_same_collection() {
    let temp = TempDir::new().unwrap();
    let pipeline = pipeline(open_index(temp.path()));

    let documents: Vec<(String, String)> = (0..16)
        .map(|i| {
            (
                format!("server_notes_{}.md", i),
                format!(
                    "Server {} runs the API in a container.\n\nDeployment {} uses kubernetes.",
                    i, i
                ),
            )
        })
        .collect();

    let summary = pipeline.ingest_all(documents, 4).await.unwrap();
    assert_eq!(summary.documents, 16);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        pipeline.index().total_chunks().unwrap(),
        summary.chunks_stored
    );
}

#[test]
fn test_identical_content_under_two_filenames() {
    let temp = TempDir::new().unwrap();
    let pipeline = pipeline(open_index(temp.path()));
    let content = "Quarterly revenue grew and profit improved.";

    let q1 = pipeline
        .ingest("q1_report.md", content, &BTreeMap::new())
        .unwrap();
    let q2 = pipeline
        .ingest("q2_report.md", content, &BTreeMap::new())
        .unwrap();
    assert_eq!(q1.collection, "financial");
    assert_eq!(q1.document_id, q2.document_id);

    let index = pipeline.index();
    assert_eq!(index.collection_count("financial").unwrap(), 2);
    for filename in ["q1_report.md", "q2_report.md"] {
        let chunks = index.get_document_chunks("financial", filename).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.filename.as_deref(), Some(filename));
    }
}

#[test]
fn test_forced_bootstrap_repeated_keeps_documents_searchable() {
    let temp = TempDir::new().unwrap();
    let pipeline = pipeline(open_index(temp.path()));
    let source = sample_source();

    for _ in 0..50 {
        pipeline.bootstrap(&source, true).unwrap();
        let hits = pipeline.index().query("financial", "revenue", 5).unwrap();
        assert_eq!(hits.len(), 1);
    }

    assert_eq!(pipeline.index().total_chunks().unwrap(), 3);
}
