use serde::{Deserialize, Serialize};

/// Half-open byte range into the original file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteSpan {
    pub start: usize,
    pub end: usize,
}

impl ByteSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A semantically coherent slice of a source file with dual representation:
/// `display_code` for presentation, `vector_text` for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Repo-relative path of the source file
    pub relative_path: String,

    /// Content hash of the file version this chunk came from
    pub file_hash: String,

    /// 0-based position in the file's chunk sequence
    pub chunk_index: usize,

    /// The source slice, unchanged
    pub display_code: String,

    /// Embedding input: breadcrumb prefix plus the display code
    pub vector_text: String,

    /// `>`-separated path of enclosing scopes, e.g. `ClassA > methodB`
    pub breadcrumb: String,

    /// Language tag
    pub language: String,

    /// Byte range of the display code in the original file
    pub raw_span: ByteSpan,

    /// Byte range covering the vectorized portion (raw span widened by the
    /// breadcrumb prefix length)
    pub vector_span: ByteSpan,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,
}

impl Chunk {
    /// Stable chunk identifier: `{path}#{file_hash}#{index}`.
    ///
    /// Different file versions produce disjoint id sets.
    pub fn chunk_id(&self) -> String {
        format!(
            "{}#{}#{}",
            self.relative_path, self.file_hash, self.chunk_index
        )
    }

    /// Number of lines covered by this chunk
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}
