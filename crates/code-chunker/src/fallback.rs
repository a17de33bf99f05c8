//! Line-based fallback splitter for languages without syntax-tree support
//! and for files the parser rejects.

use crate::splitter::{assemble, RawPiece};
use crate::types::{ByteSpan, Chunk};

pub(crate) fn split_fallback(
    relative_path: &str,
    content: &str,
    file_hash: &str,
    language_tag: &str,
    lines_per_chunk: usize,
) -> Vec<Chunk> {
    let lines_per_chunk = lines_per_chunk.max(1);
    let mut pieces = Vec::new();

    let mut group_start = 0;
    let mut group_end = 0;
    let mut group_lines = 0;
    let mut has_content = false;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        if group_lines == 0 {
            group_start = offset;
        }
        group_lines += 1;
        if !line.trim().is_empty() {
            has_content = true;
            group_end = offset + line.trim_end().len();
        }
        offset += line.len();

        if group_lines == lines_per_chunk {
            if has_content {
                pieces.push(RawPiece {
                    span: ByteSpan::new(group_start, group_end),
                    breadcrumb: String::new(),
                });
            }
            group_lines = 0;
            has_content = false;
        }
    }
    if group_lines > 0 && has_content {
        pieces.push(RawPiece {
            span: ByteSpan::new(group_start, group_end),
            breadcrumb: String::new(),
        });
    }

    assemble(relative_path, content, file_hash, language_tag, pieces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_lines_into_fixed_chunks() {
        let content: String = (0..10).map(|i| format!("line {i}\n")).collect();
        let chunks = split_fallback("notes.txt", &content, "hash", "unknown", 4);

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].display_code.starts_with("line 0"));
        assert!(chunks[0].display_code.ends_with("line 3"));
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 4);
        assert_eq!(chunks[2].start_line, 9);
    }

    #[test]
    fn test_indexes_contiguous() {
        let content: String = (0..7).map(|i| format!("l{i}\n")).collect();
        let chunks = split_fallback("a.rb", &content, "hash", "ruby", 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.language, "ruby");
            assert_eq!(chunk.breadcrumb, "");
        }
    }

    #[test]
    fn test_blank_groups_are_skipped() {
        let content = "first\n\n\n\n\n\n\nlast\n";
        let chunks = split_fallback("a.txt", content, "hash", "unknown", 3);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].display_code, "first");
        assert_eq!(chunks[1].display_code, "last");
    }

    #[test]
    fn test_vector_text_equals_display_without_breadcrumb() {
        let chunks = split_fallback("a.txt", "hello world\n", "hash", "unknown", 60);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].vector_text, chunks[0].display_code);
        assert_eq!(chunks[0].raw_span, chunks[0].vector_span);
    }
}
