//! SQLite-backed metadata store: per-file records, the chunk FTS index, and
//! a small key-value pane for index-wide facts like the vector dimension.

use crate::error::{IndexerError, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::spawn_blocking;

const DB_FILE_NAME: &str = "index.db";
const DIMENSION_KEY: &str = "embedding_dimension";

/// Per-file index record.
///
/// `vector_index_hash` is the content hash last successfully written to the
/// vector and FTS stores; `None` (or a stale value) marks the file dirty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub relative_path: String,
    pub content_hash: String,
    pub mtime: i64,
    pub size: i64,
    pub language: String,
    pub vector_index_hash: Option<String>,
}

impl FileRecord {
    pub fn is_dirty(&self) -> bool {
        self.vector_index_hash.as_deref() != Some(self.content_hash.as_str())
    }
}

/// One row of the chunk full-text index.
#[derive(Debug, Clone)]
pub struct FtsRow {
    pub chunk_id: String,
    pub relative_path: String,
    pub chunk_index: usize,
    pub breadcrumb: String,
    /// `breadcrumb + "\n" + display_code`, the indexed text.
    pub body: String,
}

/// A full-text hit, higher score = more relevant.
#[derive(Debug, Clone)]
pub struct FtsHit {
    pub chunk_id: String,
    pub relative_path: String,
    pub chunk_index: usize,
    pub breadcrumb: String,
    pub score: f32,
}

/// Thread-safe handle to the per-project `index.db`.
#[derive(Clone)]
pub struct MetadataStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl MetadataStore {
    /// Open or create `index.db` under the project state directory.
    pub fn open(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir)?;
        let path = state_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS files (
                relative_path TEXT PRIMARY KEY,
                content_hash TEXT NOT NULL,
                mtime INTEGER NOT NULL,
                size INTEGER NOT NULL,
                language TEXT NOT NULL,
                vector_index_hash TEXT
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS chunk_fts USING fts5(
                body,
                chunk_id UNINDEXED,
                relative_path UNINDEXED,
                chunk_index UNINDEXED,
                breadcrumb UNINDEXED
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a closure against the connection on the blocking pool.
    async fn query<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard)
        })
        .await
        .map_err(|e| IndexerError::StoreError(format!("blocking task failed: {e}")))?
    }

    /// Insert or replace file records in bulk.
    pub async fn upsert_files(&self, records: Vec<FileRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.query(move |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR REPLACE INTO files
                     (relative_path, content_hash, mtime, size, language, vector_index_hash)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for record in &records {
                    stmt.execute(params![
                        record.relative_path,
                        record.content_hash,
                        record.mtime,
                        record.size,
                        record.language,
                        record.vector_index_hash,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Delete file records in bulk.
    pub async fn delete_files(&self, paths: Vec<String>) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.query(move |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare_cached("DELETE FROM files WHERE relative_path = ?1")?;
                for path in &paths {
                    stmt.execute(params![path])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// All file records, ordered by path.
    pub async fn all_files(&self) -> Result<Vec<FileRecord>> {
        self.query(|conn| {
            let mut stmt = conn.prepare(
                "SELECT relative_path, content_hash, mtime, size, language, vector_index_hash
                 FROM files ORDER BY relative_path",
            )?;
            let rows = stmt.query_map([], row_to_file_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
    }

    /// Files whose indexed state does not match their current contents.
    pub async fn files_needing_reindex(&self) -> Result<Vec<FileRecord>> {
        self.query(|conn| {
            let mut stmt = conn.prepare(
                "SELECT relative_path, content_hash, mtime, size, language, vector_index_hash
                 FROM files
                 WHERE vector_index_hash IS NULL OR vector_index_hash != content_hash
                 ORDER BY relative_path",
            )?;
            let rows = stmt.query_map([], row_to_file_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
    }

    /// Record which content hash made it into the vector and FTS stores
    /// (`None` marks the file dirty).
    pub async fn set_vector_index_hash(
        &self,
        updates: Vec<(String, Option<String>)>,
    ) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        self.query(move |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "UPDATE files SET vector_index_hash = ?2 WHERE relative_path = ?1",
                )?;
                for (path, hash) in &updates {
                    stmt.execute(params![path, hash])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Replace the FTS rows of the given paths: delete old rows, insert new
    /// ones, in one transaction.
    pub async fn fts_replace_files(&self, paths: Vec<String>, rows: Vec<FtsRow>) -> Result<()> {
        self.query(move |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut delete =
                    tx.prepare_cached("DELETE FROM chunk_fts WHERE relative_path = ?1")?;
                for path in &paths {
                    delete.execute(params![path])?;
                }
                let mut insert = tx.prepare_cached(
                    "INSERT INTO chunk_fts (body, chunk_id, relative_path, chunk_index, breadcrumb)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for row in &rows {
                    insert.execute(params![
                        row.body,
                        row.chunk_id,
                        row.relative_path,
                        row.chunk_index as i64,
                        row.breadcrumb,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Remove FTS rows for the listed paths.
    pub async fn fts_delete_files(&self, paths: Vec<String>) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.fts_replace_files(paths, Vec::new()).await
    }

    /// Full-text search over chunk bodies. `match_query` is an FTS5 MATCH
    /// expression; hits come back best-first.
    pub async fn fts_search(&self, match_query: String, limit: usize) -> Result<Vec<FtsHit>> {
        self.query(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT chunk_id, relative_path, chunk_index, breadcrumb, rank
                 FROM chunk_fts
                 WHERE chunk_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![match_query, limit as i64], |row| {
                let chunk_index: i64 = row.get(2)?;
                let rank: f64 = row.get(4)?;
                Ok(FtsHit {
                    chunk_id: row.get(0)?,
                    relative_path: row.get(1)?,
                    chunk_index: chunk_index.max(0) as usize,
                    breadcrumb: row.get(3)?,
                    // FTS5 rank is negative-better; flip so higher = better.
                    score: -(rank as f32),
                })
            })?;
            let mut hits = Vec::new();
            for row in rows {
                hits.push(row?);
            }
            Ok(hits)
        })
        .await
    }

    pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.query(move |conn| {
            let mut stmt = conn.prepare("SELECT value FROM meta WHERE key = ?1")?;
            let mut rows = stmt.query(params![key])?;
            match rows.next()? {
                Some(row) => Ok(Some(row.get(0)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.query(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }

    /// Vector dimension of the current index, if one was recorded.
    pub async fn recorded_dimension(&self) -> Result<Option<usize>> {
        Ok(self
            .get_meta(DIMENSION_KEY)
            .await?
            .and_then(|v| v.parse().ok()))
    }

    pub async fn record_dimension(&self, dimension: usize) -> Result<()> {
        self.set_meta(DIMENSION_KEY, &dimension.to_string()).await
    }

    /// Wipe files and FTS rows, keeping the meta pane.
    pub async fn clear_all(&self) -> Result<()> {
        self.query(|conn| {
            conn.execute_batch(
                "DELETE FROM files;
                 DELETE FROM chunk_fts;",
            )?;
            Ok(())
        })
        .await
    }

    pub async fn file_count(&self) -> Result<usize> {
        self.query(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))?;
            Ok(count.max(0) as usize)
        })
        .await
    }
}

fn row_to_file_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        relative_path: row.get(0)?,
        content_hash: row.get(1)?,
        mtime: row.get(2)?,
        size: row.get(3)?,
        language: row.get(4)?,
        vector_index_hash: row.get(5)?,
    })
}
