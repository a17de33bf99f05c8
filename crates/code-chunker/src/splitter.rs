//! Syntax-tree driven splitter.
//!
//! One chunk per chunkable node, breadcrumbs from enclosing context nodes,
//! gap-aware coverage of bytes no chunkable node claims, and oversize
//! splitting along syntactic then line boundaries.

use crate::error::{ChunkerError, Result};
use crate::language::{Language, LanguageSpec};
use crate::parser_pool;
use crate::types::{ByteSpan, Chunk};
use tree_sitter::Node;

/// A chunk before dual-text assembly.
pub(crate) struct RawPiece {
    pub span: ByteSpan,
    pub breadcrumb: String,
}

pub(crate) fn split_syntax(
    relative_path: &str,
    content: &str,
    file_hash: &str,
    language: Language,
    max_chunk_chars: usize,
    gap_max_blank_lines: usize,
) -> Result<Vec<Chunk>> {
    let spec = language.spec()?;

    let mut pieces = parser_pool::with_parser(language, |parser| -> Result<Vec<RawPiece>> {
        let tree = parser.parse(content, None).ok_or_else(|| {
            ChunkerError::parse(format!("parser produced no tree for {relative_path}"))
        })?;

        let mut pieces = Vec::new();
        let mut crumbs = Vec::new();
        collect(
            tree.root_node(),
            content,
            spec,
            &mut crumbs,
            &mut pieces,
            max_chunk_chars,
        );
        Ok(pieces)
    })??;

    pieces.sort_by_key(|p| p.span.start);
    let claimed: Vec<ByteSpan> = pieces.iter().map(|p| p.span).collect();
    pieces.extend(cover_gaps(content, &claimed, gap_max_blank_lines));
    pieces.sort_by_key(|p| p.span.start);

    Ok(assemble(
        relative_path,
        content,
        file_hash,
        language.as_str(),
        pieces,
    ))
}

/// Walk the tree, emitting chunkable nodes and descending through context
/// and transparent wrappers. Unvisited regions are covered by the gap pass.
fn collect(
    node: Node,
    src: &str,
    spec: &LanguageSpec,
    crumbs: &mut Vec<String>,
    out: &mut Vec<RawPiece>,
    max_chunk_chars: usize,
) {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();

    for child in children {
        let kind = child.kind();
        if spec.context.contains(&kind) {
            match node_name(child, src) {
                Some(name) => {
                    crumbs.push(name);
                    collect(child, src, spec, crumbs, out, max_chunk_chars);
                    crumbs.pop();
                }
                None => collect(child, src, spec, crumbs, out, max_chunk_chars),
            }
        } else if spec.chunkable.contains(&kind) {
            emit(child, src, crumbs, out, max_chunk_chars);
        } else if spec.transparent.contains(&kind) {
            collect(child, src, spec, crumbs, out, max_chunk_chars);
        }
    }
}

fn emit(node: Node, src: &str, crumbs: &[String], out: &mut Vec<RawPiece>, max_chunk_chars: usize) {
    let breadcrumb = crumbs.join(" > ");
    let span = ByteSpan::new(node.start_byte(), node.end_byte());

    if span.len() <= max_chunk_chars {
        out.push(RawPiece { span, breadcrumb });
        return;
    }

    // Syntactic boundaries: starts of children and grandchildren, which
    // catches both signature elements and the statements of a body block.
    let mut boundaries = Vec::new();
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    for child in &children {
        boundaries.push(child.start_byte());
        let mut inner = child.walk();
        for grandchild in child.children(&mut inner) {
            boundaries.push(grandchild.start_byte());
        }
    }
    boundaries.retain(|b| *b > span.start && *b < span.end);
    boundaries.sort_unstable();
    boundaries.dedup();

    for piece in split_at_boundaries(src, span, &boundaries, max_chunk_chars) {
        out.push(RawPiece {
            span: piece,
            breadcrumb: breadcrumb.clone(),
        });
    }
}

/// Greedily group cut candidates into pieces no larger than `max_chars`;
/// pieces that still exceed the limit are cut at line boundaries.
fn split_at_boundaries(
    src: &str,
    span: ByteSpan,
    boundaries: &[usize],
    max_chars: usize,
) -> Vec<ByteSpan> {
    let mut pieces = Vec::new();
    let mut start = span.start;
    let mut prev = span.start;

    for &cut in boundaries.iter().chain(std::iter::once(&span.end)) {
        if cut - start > max_chars && prev > start {
            pieces.push(ByteSpan::new(start, prev));
            start = prev;
        }
        prev = cut;
    }
    if start < span.end {
        pieces.push(ByteSpan::new(start, span.end));
    }

    pieces
        .into_iter()
        .flat_map(|piece| {
            if piece.len() > max_chars {
                split_line_spans(src, piece, max_chars)
            } else {
                vec![piece]
            }
        })
        .collect()
}

/// Cut a span at newline boundaries into pieces no larger than `max_chars`.
/// A single line longer than the limit stays whole.
fn split_line_spans(src: &str, span: ByteSpan, max_chars: usize) -> Vec<ByteSpan> {
    let slice = &src[span.start..span.end];
    let mut pieces = Vec::new();
    let mut piece_start = span.start;
    let mut offset = span.start;

    for line in slice.split_inclusive('\n') {
        let line_end = offset + line.len();
        if line_end - piece_start > max_chars && offset > piece_start {
            pieces.push(ByteSpan::new(piece_start, offset));
            piece_start = offset;
        }
        offset = line_end;
    }
    if piece_start < span.end {
        pieces.push(ByteSpan::new(piece_start, span.end));
    }

    pieces
}

/// Emit synthetic chunks for bytes not claimed by any chunkable node
/// (imports, comments, globals, class bodies around methods).
///
/// Adjacent gap fragments coalesce into one chunk unless separated by more
/// than `max_blank_lines` blank lines.
fn cover_gaps(content: &str, claimed: &[ByteSpan], max_blank_lines: usize) -> Vec<RawPiece> {
    let mut gaps = Vec::new();
    let mut pos = 0;
    for span in claimed {
        if span.start > pos {
            gaps.push(ByteSpan::new(pos, span.start));
        }
        pos = pos.max(span.end);
    }
    if pos < content.len() {
        gaps.push(ByteSpan::new(pos, content.len()));
    }

    let mut out = Vec::new();
    for gap in gaps {
        split_gap_blocks(content, gap, max_blank_lines, &mut out);
    }
    out
}

fn split_gap_blocks(
    content: &str,
    gap: ByteSpan,
    max_blank_lines: usize,
    out: &mut Vec<RawPiece>,
) {
    let slice = &content[gap.start..gap.end];
    let mut block_start: Option<usize> = None;
    let mut block_end = gap.start;
    let mut blank_run = 0;
    let mut offset = gap.start;

    for line in slice.split_inclusive('\n') {
        let line_end = offset + line.len();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > max_blank_lines {
                if let Some(start) = block_start.take() {
                    if has_retrievable_content(&content[start..block_end]) {
                        out.push(RawPiece {
                            span: ByteSpan::new(start, block_end),
                            breadcrumb: String::new(),
                        });
                    }
                }
            }
        } else {
            if block_start.is_none() {
                block_start = Some(offset);
            }
            block_end = offset + line.trim_end().len();
            blank_run = 0;
        }
        offset = line_end;
    }
    if let Some(start) = block_start {
        if has_retrievable_content(&content[start..block_end]) {
            out.push(RawPiece {
                span: ByteSpan::new(start, block_end),
                breadcrumb: String::new(),
            });
        }
    }
}

/// Pure-punctuation gap blocks (closing braces and the like) carry no
/// retrievable content and are dropped.
fn has_retrievable_content(text: &str) -> bool {
    text.chars().any(|c| c.is_alphanumeric())
}

/// Extract a display name for a context node: the `name` field, the `type`
/// field (impl blocks, generics stripped), or the first identifier child.
fn node_name(node: Node, src: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(src[name.byte_range()].to_string());
    }
    if let Some(ty) = node.child_by_field_name("type") {
        let raw = &src[ty.byte_range()];
        let base = raw.split('<').next().unwrap_or(raw).trim();
        if !base.is_empty() {
            return Some(base.to_string());
        }
    }
    find_identifier(node, src, 3)
}

fn find_identifier(node: Node, src: &str, depth: usize) -> Option<String> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();

    for child in &children {
        if matches!(
            child.kind(),
            "identifier" | "type_identifier" | "field_identifier" | "property_identifier"
        ) {
            return Some(src[child.byte_range()].to_string());
        }
    }
    if depth == 0 {
        return None;
    }
    for child in &children {
        if let Some(name) = find_identifier(*child, src, depth - 1) {
            return Some(name);
        }
    }
    None
}

/// Turn ordered raw pieces into full chunks with dual text and line numbers.
pub(crate) fn assemble(
    relative_path: &str,
    content: &str,
    file_hash: &str,
    language_tag: &str,
    pieces: Vec<RawPiece>,
) -> Vec<Chunk> {
    let line_starts = line_start_offsets(content);

    pieces
        .into_iter()
        .filter(|p| !p.span.is_empty())
        .enumerate()
        .map(|(chunk_index, piece)| {
            let display_code = content[piece.span.start..piece.span.end].to_string();
            let (vector_text, prefix_len) = if piece.breadcrumb.is_empty() {
                (display_code.clone(), 0)
            } else {
                (
                    format!("{}\n{}", piece.breadcrumb, display_code),
                    piece.breadcrumb.len() + 1,
                )
            };
            let start_line = line_at(&line_starts, piece.span.start);
            let end_line = line_at(&line_starts, piece.span.end.saturating_sub(1));

            Chunk {
                relative_path: relative_path.to_string(),
                file_hash: file_hash.to_string(),
                chunk_index,
                display_code,
                vector_text,
                breadcrumb: piece.breadcrumb,
                language: language_tag.to_string(),
                raw_span: piece.span,
                vector_span: ByteSpan::new(
                    piece.span.start.saturating_sub(prefix_len),
                    piece.span.end,
                ),
                start_line,
                end_line: end_line.max(start_line),
            }
        })
        .collect()
}

fn line_start_offsets(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

/// 1-based line number of a byte offset.
fn line_at(line_starts: &[usize], offset: usize) -> usize {
    line_starts.partition_point(|&start| start <= offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(content: &str, language: Language) -> Vec<Chunk> {
        split_syntax("test_file", content, "hash", language, 6144, 2).unwrap()
    }

    #[test]
    fn test_rust_functions_and_gap_imports() {
        let code = "use std::fmt;\n\nfn alpha() -> u32 {\n    1\n}\n\nfn beta() -> u32 {\n    2\n}\n";
        let chunks = split(code, Language::Rust);

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].display_code.starts_with("use std::fmt"));
        assert_eq!(chunks[0].breadcrumb, "");
        assert!(chunks[1].display_code.starts_with("fn alpha"));
        assert!(chunks[2].display_code.starts_with("fn beta"));
    }

    #[test]
    fn test_chunk_indexes_are_contiguous_and_ordered() {
        let code = "use a::b;\n\nfn one() {}\n\nstruct Two;\n\nfn three() {}\n";
        let chunks = split(code, Language::Rust);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
        }
        for pair in chunks.windows(2) {
            assert!(pair[0].raw_span.start < pair[1].raw_span.start);
        }
    }

    #[test]
    fn test_impl_methods_get_breadcrumb() {
        let code = "struct Point { x: i32 }\n\nimpl Point {\n    fn new(x: i32) -> Self {\n        Self { x }\n    }\n}\n";
        let chunks = split(code, Language::Rust);

        let method = chunks
            .iter()
            .find(|c| c.display_code.starts_with("fn new"))
            .unwrap();
        assert_eq!(method.breadcrumb, "Point");
        assert!(method.vector_text.starts_with("Point\nfn new"));
    }

    #[test]
    fn test_nested_module_breadcrumb() {
        let code = "mod outer {\n    mod inner {\n        fn deep() {}\n    }\n}\n";
        let chunks = split(code, Language::Rust);

        let deep = chunks
            .iter()
            .find(|c| c.display_code.contains("fn deep"))
            .unwrap();
        assert_eq!(deep.breadcrumb, "outer > inner");
    }

    #[test]
    fn test_python_class_methods() {
        let code = "import os\n\nclass Session:\n    def login(self):\n        pass\n\n    def logout(self):\n        pass\n";
        let chunks = split(code, Language::Python);

        let login = chunks
            .iter()
            .find(|c| c.display_code.contains("def login"))
            .unwrap();
        assert_eq!(login.breadcrumb, "Session");

        let imports = chunks
            .iter()
            .find(|c| c.display_code.starts_with("import os"))
            .unwrap();
        assert_eq!(imports.breadcrumb, "");
    }

    #[test]
    fn test_js_exported_class() {
        let code = "export class Store {\n  get(key) {\n    return this.map[key];\n  }\n}\n";
        let chunks = split(code, Language::JavaScript);

        let method = chunks
            .iter()
            .find(|c| c.display_code.starts_with("get(key)"))
            .unwrap();
        assert_eq!(method.breadcrumb, "Store");
    }

    #[test]
    fn test_go_declarations() {
        let code = "package main\n\nimport \"fmt\"\n\nfunc Hello() {\n\tfmt.Println(\"hi\")\n}\n";
        let chunks = split(code, Language::Go);

        assert!(chunks
            .iter()
            .any(|c| c.display_code.starts_with("func Hello")));
    }

    #[test]
    fn test_oversize_chunk_splits_on_lines() {
        let mut body = String::from("fn big() {\n");
        for i in 0..200 {
            body.push_str(&format!("    let v{i} = {i};\n"));
        }
        body.push_str("}\n");

        let chunks = split_syntax("test_file", &body, "hash", Language::Rust, 512, 2).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // One long line may exceed the limit; these are all short.
            assert!(chunk.display_code.len() <= 512);
        }
        // Pieces of the split function cover the whole node.
        let first = chunks.first().unwrap();
        let last = chunks.last().unwrap();
        assert_eq!(first.raw_span.start, 0);
        assert!(last.raw_span.end >= body.trim_end().len());
    }

    #[test]
    fn test_gap_blocks_split_on_blank_runs() {
        let code = "// header comment\n\n\n\n\n// far away comment\n";
        let chunks = split(code, Language::Rust);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].display_code, "// header comment");
        assert_eq!(chunks[1].display_code, "// far away comment");
    }

    #[test]
    fn test_adjacent_gap_lines_coalesce() {
        let code = "use a::b;\nuse c::d;\n\nuse e::f;\n";
        let chunks = split(code, Language::Rust);

        // All imports sit within the blank-line threshold: one gap chunk.
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].display_code.contains("use a::b"));
        assert!(chunks[0].display_code.contains("use e::f"));
    }

    #[test]
    fn test_line_numbers_are_one_based_inclusive() {
        let code = "fn a() {}\n\nfn b() {\n    let x = 1;\n}\n";
        let chunks = split(code, Language::Rust);

        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 1);
        assert_eq!(chunks[1].start_line, 3);
        assert_eq!(chunks[1].end_line, 5);
    }

    #[test]
    fn test_whitespace_only_file_yields_no_chunks() {
        let chunks = split("\n\n   \n", Language::Rust);
        assert!(chunks.is_empty());
    }
}
