//! Process-wide pool of reusable tree-sitter parsers.
//!
//! Parser creation loads the grammar, which is cheap but not free; the pool
//! amortizes it across files. At most a small number of parsers are retained
//! per language, so concurrent chunking beyond the cap creates short-lived
//! extras instead of blocking.

use crate::error::{ChunkerError, Result};
use crate::language::Language;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use tree_sitter::Parser;

const MAX_POOLED_PER_LANGUAGE: usize = 2;

static POOL: Lazy<Mutex<HashMap<Language, Vec<Parser>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Run `f` with a parser configured for `language`, returning the parser to
/// the pool afterwards.
pub fn with_parser<T>(language: Language, f: impl FnOnce(&mut Parser) -> T) -> Result<T> {
    let pooled = POOL
        .lock()
        .ok()
        .and_then(|mut pool| pool.get_mut(&language).and_then(Vec::pop));

    let mut parser = match pooled {
        Some(parser) => parser,
        None => {
            let ts_language = language.tree_sitter_language()?;
            let mut parser = Parser::new();
            parser.set_language(&ts_language).map_err(|e| {
                ChunkerError::tree_sitter(format!(
                    "failed to set {} grammar: {e}",
                    language.as_str()
                ))
            })?;
            parser
        }
    };

    let result = f(&mut parser);

    if let Ok(mut pool) = POOL.lock() {
        let slot = pool.entry(language).or_default();
        if slot.len() < MAX_POOLED_PER_LANGUAGE {
            parser.reset();
            slot.push(parser);
        }
    }

    Ok(result)
}

/// Drop all pooled parsers. Invoked after a scan to release grammar memory.
pub fn shutdown() {
    if let Ok(mut pool) = POOL.lock() {
        pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_parser_parses() {
        let kind = with_parser(Language::Rust, |parser| {
            let tree = parser.parse("fn main() {}", None).unwrap();
            tree.root_node().kind().to_string()
        })
        .unwrap();
        assert_eq!(kind, "source_file");
    }

    #[test]
    fn test_parser_is_reused() {
        shutdown();
        with_parser(Language::Python, |parser| {
            parser.parse("def f():\n    pass\n", None).unwrap();
        })
        .unwrap();
        let pooled = POOL
            .lock()
            .unwrap()
            .get(&Language::Python)
            .map(Vec::len)
            .unwrap_or(0);
        assert!(pooled >= 1);
    }

    #[test]
    fn test_unsupported_language_errors() {
        assert!(with_parser(Language::Unknown, |_| ()).is_err());
    }
}
