use serde::{Deserialize, Serialize};

/// Vector/FTS write outcome of one scan.
///
/// `errors` counts files not successfully written to both stores, whatever
/// stage failed for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorIndexStats {
    pub indexed: usize,
    pub deleted: usize,
    pub errors: usize,
}

/// Per-file classification counts of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub added: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub errors: usize,
    pub vector_index: VectorIndexStats,
    pub time_ms: u64,
}

impl std::fmt::Display for ScanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "added: {} | modified: {} | unchanged: {} | deleted: {} | skipped: {} | errors: {} | indexed: {} in {}ms",
            self.added,
            self.modified,
            self.unchanged,
            self.deleted,
            self.skipped,
            self.errors,
            self.vector_index.indexed,
            self.time_ms
        )
    }
}
