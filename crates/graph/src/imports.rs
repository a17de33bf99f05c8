//! Textual import extraction from syntax trees.
//!
//! Emits cleaned specifier strings (module paths, quoted file names) that
//! the per-language resolvers map to repo files.

use crate::error::Result;
use weaver_code_chunker::{parser_pool, Language};

/// Extract import specifiers from a source file.
///
/// Unsupported languages yield an empty list.
pub fn extract_imports(language: Language, content: &str) -> Result<Vec<String>> {
    let Ok(spec) = language.spec() else {
        return Ok(Vec::new());
    };

    let raw_imports = parser_pool::with_parser(language, |parser| {
        let Some(tree) = parser.parse(content, None) else {
            return Vec::new();
        };
        let root = tree.root_node();
        let mut cursor = root.walk();
        let mut texts = Vec::new();
        for child in root.children(&mut cursor) {
            if spec.imports.contains(&child.kind()) {
                texts.push(content[child.byte_range()].to_string());
            }
        }
        texts
    })?;

    let mut specifiers = Vec::new();
    for raw in raw_imports {
        specifiers.extend(clean_import(language, &raw));
    }
    specifiers.retain(|s| !s.is_empty());
    specifiers.dedup();
    Ok(specifiers)
}

/// Normalize one import statement into specifier strings.
fn clean_import(language: Language, raw: &str) -> Vec<String> {
    match language {
        Language::Rust => {
            let body = raw
                .trim()
                .trim_start_matches("pub ")
                .trim_start_matches("use ")
                .trim_end_matches(';')
                .trim();
            // `use a::{b, c}` resolves through the common prefix.
            let base = body.split('{').next().unwrap_or(body);
            vec![base.trim_end_matches("::").trim().to_string()]
        }
        Language::Python => {
            let trimmed = raw.trim();
            if let Some(rest) = trimmed.strip_prefix("from ") {
                let module = rest.split_whitespace().next().unwrap_or("");
                vec![module.to_string()]
            } else if let Some(rest) = trimmed.strip_prefix("import ") {
                rest.split(',')
                    .map(|part| {
                        part.trim()
                            .split_whitespace()
                            .next()
                            .unwrap_or("")
                            .to_string()
                    })
                    .collect()
            } else {
                Vec::new()
            }
        }
        Language::JavaScript | Language::TypeScript | Language::Go | Language::C
        | Language::Cpp => quoted_strings(raw),
        Language::Java => vec![raw
            .trim()
            .trim_start_matches("import ")
            .trim_start_matches("static ")
            .trim_end_matches(';')
            .trim()
            .to_string()],
        Language::CSharp => vec![raw
            .trim()
            .trim_start_matches("global ")
            .trim_start_matches("using ")
            .trim_end_matches(';')
            .trim()
            .to_string()],
        _ => Vec::new(),
    }
}

/// All `"..."`-quoted substrings; single quotes are accepted for JS.
fn quoted_strings(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    for quote in ['"', '\''] {
        let mut rest = raw;
        while let Some(start) = rest.find(quote) {
            let after = &rest[start + 1..];
            let Some(end) = after.find(quote) else { break };
            if end > 0 {
                out.push(after[..end].to_string());
            }
            rest = &after[end + 1..];
        }
        if !out.is_empty() {
            break;
        }
    }
    out
}
