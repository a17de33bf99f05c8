//! End-to-end scan flows against a scratch repository: incremental
//! classification, renames, deletions, empty files, and dimension changes.

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use weaver_embeddings::testing::FakeEmbedder;
use weaver_indexer::{Indexer, ScanOptions};
use weaver_protocol::IndexConfig;

const DIMENSION: usize = 16;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

async fn open_indexer(repo: &Path, state: &Path, dimension: usize) -> Indexer {
    Indexer::open_at(
        repo,
        state,
        IndexConfig::default(),
        Arc::new(FakeEmbedder::new(dimension)),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn scan_of_trivial_repo() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.py", "def f(): return 1\n");
    write(repo.path(), "b.py", "");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    let stats = indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    assert_eq!(stats.added, 2);
    assert_eq!(stats.modified, 0);
    assert_eq!(stats.unchanged, 0);
    assert_eq!(stats.deleted, 0);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.errors, 0);

    // Vector store holds exactly the chunks of a.py; b.py has none.
    let vectors = indexer.vector_store();
    assert!(vectors.count().await >= 1);
    assert!(vectors.chunks_for_file("a.py").await.is_some());
    assert!(vectors.chunks_for_file("b.py").await.is_none());

    // The empty file is still consistent: vector_index_hash = content_hash.
    let meta = indexer.metadata_store();
    let files = meta.all_files().await.unwrap();
    let b = files.iter().find(|f| f.relative_path == "b.py").unwrap();
    assert_eq!(b.vector_index_hash.as_ref(), Some(&b.content_hash));
    assert!(meta.files_needing_reindex().await.unwrap().is_empty());
}

#[tokio::test]
async fn rescan_of_unchanged_repo_is_a_noop() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.py", "def f(): return 1\n");
    write(repo.path(), "b.rs", "fn main() {}\n");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    indexer.scan(ScanOptions::vector_indexed()).await.unwrap();
    let second = indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    assert_eq!(second.added, 0);
    assert_eq!(second.modified, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(second.vector_index.indexed, 0);
}

#[tokio::test]
async fn rename_moves_chunks_to_the_new_path() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.py", "def f(): return 1\n");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    std::fs::rename(repo.path().join("a.py"), repo.path().join("c.py")).unwrap();
    let stats = indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    assert_eq!(stats.added, 1);
    assert_eq!(stats.deleted, 1);

    let vectors = indexer.vector_store();
    assert!(vectors.chunks_for_file("a.py").await.is_none());
    let moved = vectors.chunks_for_file("c.py").await.unwrap();
    assert!(!moved.is_empty());
    assert!(moved.iter().all(|r| r.chunk.relative_path == "c.py"));
}

#[tokio::test]
async fn modified_file_replaces_its_chunk_set() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.rs", "fn one() {}\n");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    indexer.scan(ScanOptions::vector_indexed()).await.unwrap();
    let old_hash = indexer
        .vector_store()
        .chunks_for_file("a.rs")
        .await
        .unwrap()[0]
        .chunk
        .file_hash
        .clone();

    write(repo.path(), "a.rs", "fn one() {}\n\nfn two() {}\n");
    let stats = indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    assert_eq!(stats.modified, 1);
    let chunks = indexer.vector_store().chunks_for_file("a.rs").await.unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|r| r.chunk.file_hash != old_hash));
}

#[tokio::test]
async fn file_emptied_in_place_loses_its_rows() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.rs", "fn one() {}\n");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    indexer.scan(ScanOptions::vector_indexed()).await.unwrap();
    assert!(indexer.vector_store().chunks_for_file("a.rs").await.is_some());

    write(repo.path(), "a.rs", "");
    let stats = indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    assert_eq!(stats.modified, 1);
    assert!(indexer.vector_store().chunks_for_file("a.rs").await.is_none());
    assert!(indexer
        .metadata_store()
        .files_needing_reindex()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn deleting_a_file_removes_both_stores_in_one_scan() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.py", "def f(): return 1\n");
    write(repo.path(), "keep.py", "def g(): return 2\n");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    std::fs::remove_file(repo.path().join("a.py")).unwrap();
    let stats = indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.vector_index.deleted, 1);
    assert!(indexer.vector_store().chunks_for_file("a.py").await.is_none());

    let meta = indexer.metadata_store();
    assert!(meta
        .all_files()
        .await
        .unwrap()
        .iter()
        .all(|f| f.relative_path != "a.py"));
    assert!(meta
        .fts_search("\"return\"".to_string(), 10)
        .await
        .unwrap()
        .iter()
        .all(|h| h.relative_path != "a.py"));
}

#[tokio::test]
async fn dimension_change_triggers_single_full_reindex() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.py", "def f(): return 1\n");
    write(repo.path(), "b.rs", "fn main() {}\n");

    {
        let indexer = open_indexer(repo.path(), state.path(), 16).await;
        indexer.scan(ScanOptions::vector_indexed()).await.unwrap();
    }

    // Reopen with a different vector width: everything reindexes once.
    let indexer = open_indexer(repo.path(), state.path(), 8).await;
    let stats = indexer.scan(ScanOptions::vector_indexed()).await.unwrap();
    assert_eq!(stats.added, 2);
    assert_eq!(indexer.vector_store().dimension(), 8);
    assert_eq!(
        indexer.metadata_store().recorded_dimension().await.unwrap(),
        Some(8)
    );

    // And the run after that is incremental again.
    let third = indexer.scan(ScanOptions::vector_indexed()).await.unwrap();
    assert_eq!(third.added, 0);
    assert_eq!(third.unchanged, 2);
}

#[tokio::test]
async fn stale_vector_index_hash_self_heals() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.rs", "fn one() {}\n");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    // Simulate a crash between the vector write and the metadata update.
    let meta = indexer.metadata_store();
    meta.set_vector_index_hash(vec![("a.rs".to_string(), None)])
        .await
        .unwrap();
    assert_eq!(meta.files_needing_reindex().await.unwrap().len(), 1);

    let stats = indexer.scan(ScanOptions::vector_indexed()).await.unwrap();
    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.vector_index.indexed, 1);
    assert!(meta.files_needing_reindex().await.unwrap().is_empty());
}

#[tokio::test]
async fn metadata_only_scan_skips_embedding() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.rs", "fn one() {}\n");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    let stats = indexer
        .scan(ScanOptions {
            force: false,
            vector_index: false,
            progress: None,
        })
        .await
        .unwrap();

    assert_eq!(stats.added, 1);
    assert_eq!(stats.vector_index.indexed, 0);
    assert_eq!(indexer.vector_store().count().await, 0);
    // The file stays dirty for a later vector-indexed scan.
    assert_eq!(
        indexer
            .metadata_store()
            .files_needing_reindex()
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn force_scan_reprocesses_unchanged_files() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.rs", "fn one() {}\n");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    let stats = indexer
        .scan(ScanOptions {
            force: true,
            vector_index: true,
            progress: None,
        })
        .await
        .unwrap();
    assert_eq!(stats.modified, 1);
    assert_eq!(stats.vector_index.indexed, 1);
}

#[tokio::test]
async fn invariant_every_stored_row_matches_its_file_record() {
    let repo = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    write(repo.path(), "a.py", "def f(): return 1\n");
    write(repo.path(), "b.rs", "fn main() {}\n\nfn other() {}\n");

    let indexer = open_indexer(repo.path(), state.path(), DIMENSION).await;
    indexer.scan(ScanOptions::vector_indexed()).await.unwrap();

    let vectors = indexer.vector_store();
    let meta = indexer.metadata_store();
    let files = meta.all_files().await.unwrap();

    for path in vectors.file_paths().await {
        let record = files.iter().find(|f| f.relative_path == path).unwrap();
        let chunks = vectors.chunks_for_file(&path).await.unwrap();
        // Chunk indexes form 0..N-1 and every row carries the current hash.
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk.chunk_index, i);
            assert_eq!(chunk.chunk.file_hash, record.content_hash);
        }
    }
}
