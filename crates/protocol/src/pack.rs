use serde::{Deserialize, Serialize};

/// Which recall stream produced a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallSource {
    Vector,
    Lexical,
    Fused,
}

/// Expansion phase that attached a context chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpansionPhase {
    /// Same-file neighbors by chunk index.
    E1,
    /// Same-file breadcrumb siblings.
    E2,
    /// Cross-file import targets.
    E3,
}

/// A chunk selected by the retrieval pipeline as directly relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub relative_path: String,
    pub chunk_index: usize,
    pub score: f32,
    pub sources: Vec<RecallSource>,
}

/// A context chunk attached around a seed during graph expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedChunk {
    pub relative_path: String,
    pub chunk_index: usize,
    pub phase: ExpansionPhase,
    /// Score inherited from the nearest seed, decayed by distance.
    pub score: f32,
}

/// A merged run of adjacent chunks within one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub relative_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub breadcrumb: String,
    pub text: String,
    /// Set when the segment was cut at a line boundary to fit the budget.
    #[serde(default)]
    pub truncated: bool,
}

/// Segments grouped per file, ordered by the file's best seed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSegments {
    pub relative_path: String,
    pub language: String,
    pub segments: Vec<Segment>,
}

/// Per-stage timing breakdown, filled when the caller asks for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackDebug {
    pub embed_ms: u64,
    pub vector_ms: u64,
    pub lexical_ms: u64,
    pub rerank_ms: u64,
    pub expand_ms: u64,
    pub pack_ms: u64,
}

/// Final output of a query: seeds, expanded context, and merged segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextPack {
    pub seeds: Vec<Seed>,
    pub expanded: Vec<ExpandedChunk>,
    pub files: Vec<FileSegments>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<PackDebug>,
}

impl ContextPack {
    /// True when recall produced nothing at all.
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty() && self.files.is_empty()
    }

    /// Total number of segments across all files.
    pub fn segment_count(&self) -> usize {
        self.files.iter().map(|f| f.segments.len()).sum()
    }

    /// Total characters of segment text.
    pub fn total_chars(&self) -> usize {
        self.files
            .iter()
            .flat_map(|f| f.segments.iter())
            .map(|s| s.text.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(path: &str, text: &str) -> Segment {
        Segment {
            relative_path: path.to_string(),
            start_line: 1,
            end_line: 1,
            breadcrumb: String::new(),
            text: text.to_string(),
            truncated: false,
        }
    }

    #[test]
    fn test_empty_pack() {
        let pack = ContextPack::default();
        assert!(pack.is_empty());
        assert_eq!(pack.segment_count(), 0);
        assert_eq!(pack.total_chars(), 0);
    }

    #[test]
    fn test_counts() {
        let pack = ContextPack {
            files: vec![FileSegments {
                relative_path: "a.rs".to_string(),
                language: "rust".to_string(),
                segments: vec![segment("a.rs", "fn a() {}"), segment("a.rs", "fn b() {}")],
            }],
            ..Default::default()
        };
        assert_eq!(pack.segment_count(), 2);
        assert_eq!(pack.total_chars(), 18);
    }
}
