//! Segment merging and greedy token-budget packing.

use std::collections::HashMap;
use std::path::Path;
use weaver_protocol::{FileSegments, PackConfig, Segment};
use weaver_vector_store::ChunkRecord;

/// One chunk entering the packer, with its pipeline provenance.
#[derive(Debug, Clone)]
pub struct PackInput {
    pub record: ChunkRecord,
    pub score: f32,
    pub is_seed: bool,
    /// Position in the seed list; non-seeds sort after every seed.
    pub seed_order: usize,
}

/// Rough token estimate used for budget accounting.
pub fn estimate_tokens(char_count: usize, config: &PackConfig) -> usize {
    (char_count as f32 * config.tokens_per_char).ceil() as usize
}

struct MergedSegment {
    segment: Segment,
    language: String,
    has_seed: bool,
    best_seed_order: usize,
}

/// Group chunks by file, merge adjacent runs, and admit segments greedily
/// under the character budget.
///
/// Files are visited best-seed-score first; a single seed segment larger
/// than the whole budget is truncated at a line boundary and flagged, and
/// then forms the entire pack.
pub fn pack(inputs: Vec<PackInput>, repo_root: &Path, config: &PackConfig) -> Vec<FileSegments> {
    if inputs.is_empty() {
        return Vec::new();
    }

    let mut by_file: HashMap<String, Vec<PackInput>> = HashMap::new();
    for input in inputs {
        by_file
            .entry(input.record.chunk.relative_path.clone())
            .or_default()
            .push(input);
    }

    // Order files by their best score, ties on path for determinism.
    let mut file_order: Vec<(String, f32)> = by_file
        .iter()
        .map(|(path, inputs)| {
            let best = inputs
                .iter()
                .map(|i| i.score)
                .fold(f32::NEG_INFINITY, f32::max);
            (path.clone(), best)
        })
        .collect();
    file_order.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut text_cache: HashMap<String, Option<String>> = HashMap::new();
    let mut packed = Vec::new();
    let mut total_chars = 0usize;

    for (path, _) in file_order {
        let mut file_inputs = match by_file.remove(&path) {
            Some(inputs) => inputs,
            None => continue,
        };
        file_inputs.sort_by_key(|i| i.record.chunk.chunk_index);
        file_inputs.dedup_by_key(|i| i.record.chunk.chunk_index);

        let file_text = text_cache
            .entry(path.clone())
            .or_insert_with(|| std::fs::read_to_string(repo_root.join(&path)).ok())
            .clone();

        let mut segments = merge_file_segments(&path, &file_inputs, file_text.as_deref());
        segments.sort_by(|a, b| {
            a.best_seed_order
                .cmp(&b.best_seed_order)
                .then_with(|| a.segment.start_line.cmp(&b.segment.start_line))
        });

        let mut admitted = Vec::new();
        let language = segments
            .first()
            .map(|s| s.language.clone())
            .unwrap_or_default();

        for merged in segments {
            if admitted.len() >= config.max_segments_per_file {
                break;
            }
            let len = merged.segment.text.len();

            if total_chars + len <= config.max_total_chars {
                total_chars += len;
                admitted.push(merged.segment);
                continue;
            }

            // A lone oversize seed segment still gets delivered, cut at a
            // line boundary.
            if merged.has_seed && total_chars == 0 && len > config.max_total_chars {
                let mut segment = merged.segment;
                segment.text = truncate_at_line_boundary(&segment.text, config.max_total_chars);
                segment.end_line =
                    segment.start_line + segment.text.lines().count().saturating_sub(1);
                segment.truncated = true;
                return vec![FileSegments {
                    relative_path: path,
                    language,
                    segments: vec![segment],
                }];
            }
            // Otherwise dropped, never cut mid-token.
        }

        if !admitted.is_empty() {
            packed.push(FileSegments {
                relative_path: path,
                language,
                segments: admitted,
            });
        }
    }

    packed
}

/// Merge chunks whose indexes differ by at most one into segments.
fn merge_file_segments(
    path: &str,
    inputs: &[PackInput],
    file_text: Option<&str>,
) -> Vec<MergedSegment> {
    let mut segments = Vec::new();
    let mut run: Vec<&PackInput> = Vec::new();

    for input in inputs {
        let adjacent = run
            .last()
            .map(|prev| input.record.chunk.chunk_index - prev.record.chunk.chunk_index <= 1)
            .unwrap_or(true);
        if !adjacent && !run.is_empty() {
            segments.push(build_segment(path, &run, file_text));
            run.clear();
        }
        run.push(input);
    }
    if !run.is_empty() {
        segments.push(build_segment(path, &run, file_text));
    }
    segments
}

fn build_segment(path: &str, run: &[&PackInput], file_text: Option<&str>) -> MergedSegment {
    let first = &run[0].record.chunk;
    let last = &run[run.len() - 1].record.chunk;

    let span_start = first.raw_span.start;
    let span_end = run
        .iter()
        .map(|i| i.record.chunk.raw_span.end)
        .max()
        .unwrap_or(last.raw_span.end);

    let text = file_text
        .filter(|text| span_end <= text.len())
        .map(|text| text[span_start..span_end].to_string())
        .unwrap_or_else(|| {
            run.iter()
                .map(|i| i.record.chunk.display_code.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        });

    let breadcrumb = run
        .iter()
        .map(|i| i.record.chunk.breadcrumb.as_str())
        .reduce(common_breadcrumb_prefix)
        .unwrap_or("")
        .to_string();

    MergedSegment {
        segment: Segment {
            relative_path: path.to_string(),
            start_line: first.start_line,
            end_line: run
                .iter()
                .map(|i| i.record.chunk.end_line)
                .max()
                .unwrap_or(last.end_line),
            breadcrumb,
            text,
            truncated: false,
        },
        language: first.language.clone(),
        has_seed: run.iter().any(|i| i.is_seed),
        best_seed_order: run
            .iter()
            .filter(|i| i.is_seed)
            .map(|i| i.seed_order)
            .min()
            .unwrap_or(usize::MAX),
    }
}

/// Longest common `>`-separated prefix of two breadcrumbs.
fn common_breadcrumb_prefix<'a>(a: &'a str, b: &'a str) -> &'a str {
    if a == b {
        return a;
    }
    let mut end = 0;
    for (left, right) in a.split(" > ").zip(b.split(" > ")) {
        if left != right {
            break;
        }
        end += if end == 0 { left.len() } else { left.len() + 3 };
    }
    &a[..end]
}

fn truncate_at_line_boundary(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }
    let mut kept = 0;
    for line in text.split_inclusive('\n') {
        if kept + line.len() > max_chars {
            break;
        }
        kept += line.len();
    }
    if kept == 0 {
        // A single line longer than the budget: cut at a char boundary.
        let mut end = max_chars;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        return text[..end].to_string();
    }
    text[..kept].trim_end_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use weaver_code_chunker::{ByteSpan, Chunk};

    fn input(
        path: &str,
        index: usize,
        text: &str,
        breadcrumb: &str,
        score: f32,
        seed_order: Option<usize>,
    ) -> PackInput {
        PackInput {
            record: ChunkRecord {
                chunk: Chunk {
                    relative_path: path.to_string(),
                    file_hash: "h".to_string(),
                    chunk_index: index,
                    display_code: text.to_string(),
                    vector_text: text.to_string(),
                    breadcrumb: breadcrumb.to_string(),
                    language: "rust".to_string(),
                    raw_span: ByteSpan::new(index * 1000, index * 1000 + text.len()),
                    vector_span: ByteSpan::new(index * 1000, index * 1000 + text.len()),
                    start_line: index * 10 + 1,
                    end_line: index * 10 + 3,
                },
                vector: vec![0.0],
            },
            score,
            is_seed: seed_order.is_some(),
            seed_order: seed_order.unwrap_or(usize::MAX),
        }
    }

    fn cfg(max_total_chars: usize) -> PackConfig {
        PackConfig {
            max_total_chars,
            ..Default::default()
        }
    }

    #[test]
    fn test_adjacent_chunks_merge_into_one_segment() {
        let root = Path::new("/nonexistent");
        let packed = pack(
            vec![
                input("a.rs", 0, "fn zero() {}", "", 0.9, Some(0)),
                input("a.rs", 1, "fn one() {}", "", 0.5, None),
                input("a.rs", 5, "fn five() {}", "", 0.4, None),
            ],
            root,
            &cfg(48_000),
        );

        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].segments.len(), 2);
        // Without the file on disk, merged text joins display code.
        assert_eq!(packed[0].segments[0].text, "fn zero() {}\nfn one() {}");
        assert_eq!(packed[0].segments[1].text, "fn five() {}");
    }

    #[test]
    fn test_budget_greedy_admission() {
        // Sizes 800 / 300 / 200 with budget 1000: segment 2 does not fit
        // after segment 1, but segment 3 does.
        let root = Path::new("/nonexistent");
        let packed = pack(
            vec![
                input("a.rs", 0, &"a".repeat(800), "", 0.9, Some(0)),
                input("b.rs", 0, &"b".repeat(300), "", 0.8, Some(1)),
                input("c.rs", 0, &"c".repeat(200), "", 0.7, Some(2)),
            ],
            root,
            &cfg(1000),
        );

        let paths: Vec<&str> = packed.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "c.rs"]);
        let total: usize = packed
            .iter()
            .flat_map(|f| f.segments.iter())
            .map(|s| s.text.len())
            .sum();
        assert_eq!(total, 1000);
    }

    #[test]
    fn test_oversize_seed_segment_truncates_at_line_boundary() {
        let root = Path::new("/nonexistent");
        let long_text: String = (0..100).map(|i| format!("line number {i:03}\n")).collect();
        let packed = pack(
            vec![input("a.rs", 0, &long_text, "", 0.9, Some(0))],
            root,
            &cfg(100),
        );

        assert_eq!(packed.len(), 1);
        let segment = &packed[0].segments[0];
        assert!(segment.truncated);
        assert!(segment.text.len() <= 100);
        assert!(segment.text.ends_with("line number 005"));
    }

    #[test]
    fn test_breadcrumb_longest_common_prefix() {
        let root = Path::new("/nonexistent");
        let packed = pack(
            vec![
                input("a.rs", 0, "fn a() {}", "Service > alpha", 0.9, Some(0)),
                input("a.rs", 1, "fn b() {}", "Service > beta", 0.5, None),
            ],
            root,
            &cfg(48_000),
        );

        assert_eq!(packed[0].segments[0].breadcrumb, "Service");
    }

    #[test]
    fn test_max_segments_per_file() {
        let root = Path::new("/nonexistent");
        let inputs: Vec<PackInput> = (0..10)
            .map(|i| input("a.rs", i * 3, "fn x() {}", "", 0.9, Some(i)))
            .collect();
        let packed = pack(inputs, root, &cfg(48_000));
        assert_eq!(packed[0].segments.len(), 3);
    }

    #[test]
    fn test_files_ordered_by_best_score() {
        let root = Path::new("/nonexistent");
        let packed = pack(
            vec![
                input("low.rs", 0, "fn l() {}", "", 0.2, Some(1)),
                input("high.rs", 0, "fn h() {}", "", 0.9, Some(0)),
            ],
            root,
            &cfg(48_000),
        );
        let paths: Vec<&str> = packed.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["high.rs", "low.rs"]);
    }

    #[test]
    fn test_estimate_tokens() {
        let config = PackConfig::default();
        assert_eq!(estimate_tokens(100, &config), 28);
        assert_eq!(estimate_tokens(0, &config), 0);
        // Rounds up.
        assert_eq!(estimate_tokens(1, &config), 1);
    }
}
