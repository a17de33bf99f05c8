//! Formatted text output for the `retrieve` surface.

use weaver_protocol::ContextPack;

/// Render a context pack as a text block: a one-line summary, then one
/// language-tagged code fence per segment with its path, line range and
/// breadcrumb.
pub fn render_context_pack(pack: &ContextPack) -> String {
    let file_count = pack.files.len();
    let segment_count = pack.segment_count();
    let mut out = format!(
        "Found {} relevant code blocks | Files: {} | Total segments: {}\n",
        pack.seeds.len(),
        file_count,
        segment_count
    );

    for file in &pack.files {
        for segment in &file.segments {
            out.push('\n');
            out.push_str(&format!(
                "### {}:{}-{}",
                segment.relative_path, segment.start_line, segment.end_line
            ));
            if !segment.breadcrumb.is_empty() {
                out.push_str(&format!(" [{}]", segment.breadcrumb));
            }
            if segment.truncated {
                out.push_str(" (truncated)");
            }
            out.push('\n');
            out.push_str(&format!("```{}\n{}\n```\n", file.language, segment.text));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use weaver_protocol::{FileSegments, RecallSource, Seed, Segment};

    #[test]
    fn test_empty_pack_renders_summary_only() {
        let rendered = render_context_pack(&ContextPack::default());
        assert_eq!(
            rendered,
            "Found 0 relevant code blocks | Files: 0 | Total segments: 0\n"
        );
    }

    #[test]
    fn test_segments_render_with_fences() {
        let pack = ContextPack {
            seeds: vec![Seed {
                relative_path: "src/auth.rs".to_string(),
                chunk_index: 1,
                score: 0.9,
                sources: vec![RecallSource::Vector],
            }],
            expanded: Vec::new(),
            files: vec![FileSegments {
                relative_path: "src/auth.rs".to_string(),
                language: "rust".to_string(),
                segments: vec![Segment {
                    relative_path: "src/auth.rs".to_string(),
                    start_line: 10,
                    end_line: 14,
                    breadcrumb: "Auth > login".to_string(),
                    text: "fn login() {}".to_string(),
                    truncated: false,
                }],
            }],
            debug: None,
        };

        let rendered = render_context_pack(&pack);
        assert!(rendered
            .starts_with("Found 1 relevant code blocks | Files: 1 | Total segments: 1"));
        assert!(rendered.contains("### src/auth.rs:10-14 [Auth > login]"));
        assert!(rendered.contains("```rust\nfn login() {}\n```"));
    }
}
