//! SQLite persistence for collections and chunks
//!
//! One row per `(collection, filename, chunk_id)`; writes are upserts, so
//! identical content under two filenames is kept twice. Each row also has an
//! integer id that the in-memory graphs key on. Embeddings are stored as
//! little-endian f32 blobs so graphs can be rebuilt on open.

use crate::chunking::ChunkMetadata;
use crate::error::{DocIndexError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// A chunk row as persisted
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub row_id: i64,
    pub chunk_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Collection row with its chunk count
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRow {
    pub name: String,
    pub description: String,
    pub count: usize,
}

/// Chunk store backed by a pooled SQLite database
pub struct ChunkStore {
    pool: DbPool,
}

impl ChunkStore {
    /// Open (or create) the store and run migrations
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocIndexError::Io {
                source: e,
                context: format!("Failed to create index directory: {:?}", parent),
            })?;
        }

        // Per-connection pragmas must run on every pooled connection
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        {
            let conn = pool.get()?;
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                ",
            )?;
        }

        let store = Self { pool };
        store.migrate()?;

        Ok(store)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying index migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Read a value from the index metadata table
    pub fn meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Create the collection row if missing
    pub fn ensure_collection(&self, name: &str, description: &str) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO collections (name, description, created_at)
             VALUES (?1, ?2, ?3)",
            params![name, description, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// All collections with their chunk counts, by name
    pub fn collections(&self) -> Result<Vec<CollectionRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.name, c.description, COUNT(k.chunk_id)
             FROM collections c
             LEFT JOIN chunks k ON k.collection = c.name
             GROUP BY c.name, c.description
             ORDER BY c.name",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(CollectionRow {
                    name: row.get(0)?,
                    description: row.get(1)?,
                    count: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Number of chunks in a collection
    pub fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Insert or replace one chunk, returning its row id
    pub fn upsert_chunk(
        &self,
        collection: &str,
        chunk_id: &str,
        content: &str,
        metadata: &ChunkMetadata,
        embedding: &[f32],
    ) -> Result<i64> {
        let metadata_json = serde_json::to_string(metadata).map_err(|e| DocIndexError::Json {
            source: e,
            context: format!("Failed to serialize metadata for chunk {}", chunk_id),
        })?;

        let conn = self.get_conn()?;
        let row_id = conn.query_row(
            "INSERT INTO chunks
                (collection, filename, chunk_id, document_id, content, metadata, embedding, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(collection, filename, chunk_id) DO UPDATE SET
                document_id = excluded.document_id,
                content = excluded.content,
                metadata = excluded.metadata,
                embedding = excluded.embedding,
                updated_at = excluded.updated_at
             RETURNING id",
            params![
                collection,
                metadata.filename.as_deref().unwrap_or_default(),
                chunk_id,
                metadata.document_id,
                content,
                metadata_json,
                encode_vector(embedding),
                chrono::Utc::now().timestamp(),
            ],
            |row| row.get(0),
        )?;

        Ok(row_id)
    }

    /// Every (row id, embedding) of a collection, for graph rebuilds
    pub fn load_embeddings(&self, collection: &str) -> Result<Vec<(i64, Vec<f32>)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, embedding FROM chunks WHERE collection = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![collection], |row| {
                let row_id: i64 = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((row_id, decode_vector(&blob)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Fetch chunks by row id; missing rows are skipped, order follows `row_ids`
    pub fn get_chunks(&self, collection: &str, row_ids: &[i64]) -> Result<Vec<StoredChunk>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, chunk_id, content, metadata FROM chunks
             WHERE collection = ?1 AND id = ?2",
        )?;

        let mut chunks = Vec::with_capacity(row_ids.len());
        for row_id in row_ids {
            let row = stmt
                .query_row(params![collection, row_id], chunk_columns)
                .optional()?;

            if let Some(columns) = row {
                chunks.push(stored_chunk(columns)?);
            }
        }

        Ok(chunks)
    }

    /// All chunks of one file in a collection
    pub fn chunks_for_filename(&self, collection: &str, filename: &str) -> Result<Vec<StoredChunk>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, chunk_id, content, metadata FROM chunks
             WHERE collection = ?1 AND filename = ?2",
        )?;

        let rows = stmt
            .query_map(params![collection, filename], chunk_columns)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut chunks = rows
            .into_iter()
            .map(stored_chunk)
            .collect::<Result<Vec<_>>>()?;

        chunks.sort_by_key(|c| c.metadata.chunk_index);
        Ok(chunks)
    }

    /// Delete every chunk of a document, returning the removed row ids
    pub fn delete_document(&self, collection: &str, document_id: &str) -> Result<Vec<i64>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let ids = {
            let mut stmt = tx.prepare(
                "SELECT id FROM chunks WHERE collection = ?1 AND document_id = ?2",
            )?;
            let ids = stmt
                .query_map(params![collection, document_id], |row| row.get::<_, i64>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids
        };

        tx.execute(
            "DELETE FROM chunks WHERE collection = ?1 AND document_id = ?2",
            params![collection, document_id],
        )?;
        tx.commit()?;

        Ok(ids)
    }

    /// Remove all chunks of a collection, keeping the collection
    pub fn clear_collection(&self, collection: &str) -> Result<usize> {
        let conn = self.get_conn()?;
        let removed = conn.execute(
            "DELETE FROM chunks WHERE collection = ?1",
            params![collection],
        )?;
        Ok(removed)
    }

    /// Remove a collection and its chunks; false if it did not exist
    pub fn delete_collection(&self, collection: &str) -> Result<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM chunks WHERE collection = ?1",
            params![collection],
        )?;
        let removed = tx.execute(
            "DELETE FROM collections WHERE name = ?1",
            params![collection],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

type ChunkColumns = (i64, String, String, String);

fn chunk_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkColumns> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn stored_chunk((row_id, chunk_id, content, metadata): ChunkColumns) -> Result<StoredChunk> {
    let metadata: ChunkMetadata = serde_json::from_str(&metadata).map_err(|e| DocIndexError::Json {
        source: e,
        context: format!("Corrupted metadata for chunk {}", chunk_id),
    })?;

    Ok(StoredChunk {
        row_id,
        chunk_id,
        content,
        metadata,
    })
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Embedding space the index was built with (model, dimension)
    CREATE TABLE index_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE collections (
        name TEXT PRIMARY KEY,
        description TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL
    );

    CREATE TABLE chunks (
        id INTEGER PRIMARY KEY,
        collection TEXT NOT NULL,
        filename TEXT NOT NULL DEFAULT '', -- '' when the chunk has no source file
        chunk_id TEXT NOT NULL,
        document_id TEXT NOT NULL,
        content TEXT NOT NULL,
        metadata TEXT NOT NULL,  -- JSON ChunkMetadata
        embedding BLOB NOT NULL, -- little-endian f32
        updated_at INTEGER NOT NULL,
        UNIQUE (collection, filename, chunk_id),
        FOREIGN KEY (collection) REFERENCES collections(name) ON DELETE CASCADE
    );

    CREATE INDEX idx_chunks_document ON chunks(collection, document_id);
    CREATE INDEX idx_chunks_filename ON chunks(collection, filename);
    "#,
];
