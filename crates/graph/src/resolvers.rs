//! Language-specific resolution of import specifiers to repo file paths.
//!
//! Resolvers are pure: they generate candidate paths and return the first
//! one present in the known path set. External modules resolve to nothing.

use std::collections::HashSet;
use weaver_code_chunker::Language;

/// Resolve one import specifier to a repo-relative file path.
pub fn resolve_import(
    language: Language,
    importer: &str,
    specifier: &str,
    known_paths: &HashSet<String>,
) -> Option<String> {
    let candidates = match language {
        Language::JavaScript | Language::TypeScript => js_candidates(importer, specifier),
        Language::Python => python_candidates(importer, specifier),
        Language::Go => return go_lookup(specifier, known_paths),
        Language::Java => return suffix_lookup(specifier, ".java", known_paths),
        Language::CSharp => return suffix_lookup(specifier, ".cs", known_paths),
        Language::Rust => rust_candidates(importer, specifier),
        Language::C | Language::Cpp => c_candidates(importer, specifier),
        _ => Vec::new(),
    };

    candidates
        .into_iter()
        .find(|candidate| known_paths.contains(candidate))
}

/// Directory of a repo-relative path, or "" at the root.
fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Join and collapse `.` / `..` segments without touching the filesystem.
fn normalize_join(base: &str, rel: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Relative specifiers with extension probing and `index.*` fallback; bare
/// specifiers are external modules and produce no candidates.
fn js_candidates(importer: &str, specifier: &str) -> Vec<String> {
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return Vec::new();
    }
    let base = normalize_join(parent_dir(importer), specifier);
    let extensions = ["ts", "tsx", "js", "jsx", "mjs", "cjs"];

    let mut candidates = vec![base.clone()];
    for ext in extensions {
        candidates.push(format!("{base}.{ext}"));
    }
    for ext in extensions {
        candidates.push(format!("{base}/index.{ext}"));
    }
    candidates
}

/// Dotted module names mapped to repo paths with `__init__.py` fallback,
/// honoring relative imports and a `src` layout.
fn python_candidates(importer: &str, specifier: &str) -> Vec<String> {
    let dots = specifier.chars().take_while(|c| *c == '.').count();
    let module = &specifier[dots..];
    let module_path = module.replace('.', "/");

    let mut bases = Vec::new();
    if dots > 0 {
        // `from .x` is importer-relative; each extra dot climbs a package.
        let mut dir = parent_dir(importer).to_string();
        for _ in 1..dots {
            dir = parent_dir(&dir).to_string();
        }
        bases.push(dir);
    } else {
        bases.push(String::new());
        bases.push("src".to_string());
    }

    let mut candidates = Vec::new();
    for base in bases {
        let joined = if base.is_empty() {
            module_path.clone()
        } else if module_path.is_empty() {
            base.clone()
        } else {
            format!("{base}/{module_path}")
        };
        candidates.push(format!("{joined}.py"));
        candidates.push(format!("{joined}/__init__.py"));
    }
    candidates
}

/// Last segment of the import path matched against directory names.
fn go_lookup(specifier: &str, known_paths: &HashSet<String>) -> Option<String> {
    let package = specifier.rsplit('/').next()?;
    if package.is_empty() {
        return None;
    }
    let needle = format!("{package}/");

    let mut matches: Vec<&String> = known_paths
        .iter()
        .filter(|path| {
            path.ends_with(".go")
                && (path.starts_with(&needle) || path.contains(&format!("/{needle}")))
        })
        .collect();
    matches.sort();
    matches.first().map(|s| (*s).to_string())
}

/// Package-qualified type names mapped to file paths under source roots.
fn suffix_lookup(specifier: &str, extension: &str, known_paths: &HashSet<String>) -> Option<String> {
    let qualified = format!("{}{extension}", specifier.replace('.', "/"));
    let type_file = specifier
        .rsplit('.')
        .next()
        .map(|t| format!("{t}{extension}"))?;

    let mut exact: Vec<&String> = known_paths
        .iter()
        .filter(|path| path.as_str() == qualified || path.ends_with(&format!("/{qualified}")))
        .collect();
    exact.sort();
    if let Some(path) = exact.first() {
        return Some((*path).to_string());
    }

    let mut by_type: Vec<&String> = known_paths
        .iter()
        .filter(|path| path.ends_with(&format!("/{type_file}")) || path.as_str() == type_file)
        .collect();
    by_type.sort();
    by_type.first().map(|s| (*s).to_string())
}

/// `use` paths resolved to sibling `.rs` files or `mod.rs`, longest module
/// prefix first. Supports `crate::` and `super::`.
fn rust_candidates(importer: &str, specifier: &str) -> Vec<String> {
    let mut segments: Vec<&str> = specifier.split("::").map(str::trim).collect();

    let mut bases = Vec::new();
    match segments.first().copied() {
        Some("crate") => {
            segments.remove(0);
            bases.push("src".to_string());
            bases.push(String::new());
        }
        Some("self") => {
            segments.remove(0);
            bases.push(parent_dir(importer).to_string());
        }
        Some("super") => {
            let mut dir = parent_dir(importer).to_string();
            while segments.first() == Some(&"super") {
                segments.remove(0);
                dir = parent_dir(&dir).to_string();
            }
            bases.push(dir);
        }
        _ => {
            bases.push(parent_dir(importer).to_string());
        }
    }

    let mut candidates = Vec::new();
    for base in &bases {
        // The trailing segment may be an item rather than a module; probe
        // progressively shorter prefixes.
        for depth in (1..=segments.len()).rev() {
            let module = segments[..depth].join("/");
            let joined = if base.is_empty() {
                module
            } else {
                format!("{base}/{module}")
            };
            candidates.push(format!("{joined}.rs"));
            candidates.push(format!("{joined}/mod.rs"));
        }
    }
    candidates
}

/// Quoted includes probed relative to the including file, the repo root,
/// and a conventional `include/` root.
fn c_candidates(importer: &str, specifier: &str) -> Vec<String> {
    vec![
        normalize_join(parent_dir(importer), specifier),
        specifier.to_string(),
        format!("include/{specifier}"),
    ]
}
