//! Query tokenization for lexical recall.
//!
//! Quoted phrases are preserved verbatim; remaining words split on
//! whitespace and on camelCase / snake_case boundaries, keeping
//! alphanumeric tokens of at least three characters.

const MIN_TOKEN_LEN: usize = 3;

/// Tokenized query ready for FTS query building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTokens {
    pub tokens: Vec<String>,
    pub phrases: Vec<String>,
}

impl QueryTokens {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.phrases.is_empty()
    }
}

/// Tokenize a natural-language query plus caller-supplied identifiers.
pub fn tokenize_query(query: &str, technical_terms: &[String]) -> QueryTokens {
    let (phrases, remainder) = extract_phrases(query);

    let mut tokens = Vec::new();
    for word in remainder
        .split_whitespace()
        .chain(technical_terms.iter().map(String::as_str))
    {
        for token in split_identifier(word) {
            if token.len() >= MIN_TOKEN_LEN && !tokens.contains(&token) {
                tokens.push(token);
            }
        }
    }

    QueryTokens { tokens, phrases }
}

/// Pull `"..."`-quoted phrases out of the query, returning the rest.
fn extract_phrases(query: &str) -> (Vec<String>, String) {
    let mut phrases = Vec::new();
    let mut remainder = String::with_capacity(query.len());
    let mut rest = query;

    while let Some(start) = rest.find('"') {
        remainder.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('"') {
            Some(end) => {
                let phrase = after[..end].trim();
                if !phrase.is_empty() {
                    phrases.push(phrase.to_string());
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unbalanced quote: treat the tail as plain words.
                rest = after;
                break;
            }
        }
    }
    remainder.push_str(rest);
    (phrases, remainder)
}

/// Split one word into lowercase sub-tokens at camelCase and snake_case
/// boundaries. The whole word (lowercased) is included as well when it is
/// alphanumeric.
pub fn split_identifier(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in word.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        parts.push(current);
    }

    let whole: String = word
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    if parts.len() > 1 && !whole.is_empty() && !parts.contains(&whole) {
        parts.push(whole);
    }
    parts
}

/// Build an FTS5 MATCH expression: phrases and prefix tokens joined by OR.
/// Returns `None` for an empty token set.
pub fn build_fts_match(tokens: &QueryTokens) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    for phrase in &tokens.phrases {
        terms.push(format!("\"{}\"", phrase.replace('"', " ")));
    }
    for token in &tokens.tokens {
        terms.push(format!("\"{token}\"*"));
    }
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_and_short_token_filter() {
        let tokens = tokenize_query("fix a login bug", &[]);
        assert_eq!(tokens.tokens, vec!["fix", "login", "bug"]);
        assert!(tokens.phrases.is_empty());
    }

    #[test]
    fn test_camel_case_splitting() {
        let tokens = tokenize_query("getUserSession", &[]);
        assert_eq!(tokens.tokens, vec!["get", "user", "session", "getusersession"]);
    }

    #[test]
    fn test_snake_case_splitting() {
        let tokens = tokenize_query("build_context_pack", &[]);
        assert_eq!(
            tokens.tokens,
            vec!["build", "context", "pack", "buildcontextpack"]
        );
    }

    #[test]
    fn test_quoted_phrases_preserved() {
        let tokens = tokenize_query("find \"smart topk\" cutoff", &[]);
        assert_eq!(tokens.phrases, vec!["smart topk"]);
        assert_eq!(tokens.tokens, vec!["find", "cutoff"]);
    }

    #[test]
    fn test_technical_terms_are_appended() {
        let tokens = tokenize_query("login", &["RateController".to_string()]);
        assert!(tokens.tokens.contains(&"login".to_string()));
        assert!(tokens.tokens.contains(&"rate".to_string()));
        assert!(tokens.tokens.contains(&"controller".to_string()));
    }

    #[test]
    fn test_duplicates_removed() {
        let tokens = tokenize_query("login login LOGIN", &[]);
        assert_eq!(tokens.tokens, vec!["login"]);
    }

    #[test]
    fn test_fts_match_expression() {
        let tokens = tokenize_query("find \"smart topk\" loginFlow", &[]);
        let expr = build_fts_match(&tokens).unwrap();
        assert!(expr.contains("\"smart topk\""));
        assert!(expr.contains("\"login\"*"));
        assert!(expr.contains(" OR "));
    }

    #[test]
    fn test_empty_query_builds_no_match() {
        let tokens = tokenize_query("a an", &[]);
        assert!(tokens.is_empty());
        assert!(build_fts_match(&tokens).is_none());
    }
}
