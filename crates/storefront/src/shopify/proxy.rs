//! Read-only passthrough for browser GraphQL requests.
//!
//! The browser never sees the private token: it posts a GraphQL document to
//! the storefront, which checks it and forwards it with the token attached.
//! Only queries are forwarded. Carts change through the JSON API so that
//! pricing and promotion rules always run.

use serde::{Deserialize, Serialize};

/// Largest document accepted.
pub const MAX_QUERY_BYTES: usize = 16 * 1024;

/// Body of a proxied GraphQL request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

/// Why a proxied document was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyRejection {
    #[error("query is empty")]
    Empty,
    #[error("query exceeds 16 KiB")]
    TooLarge,
    #[error("only queries may be proxied")]
    NotAQuery,
    #[error("query is malformed")]
    Malformed,
}

/// Check a document before forwarding it.
///
/// # Errors
///
/// Returns a [`ProxyRejection`] for empty, oversized, or non-query documents.
pub fn validate(request: &ProxyRequest) -> Result<(), ProxyRejection> {
    if request.query.trim().is_empty() {
        return Err(ProxyRejection::Empty);
    }
    if request.query.len() > MAX_QUERY_BYTES {
        return Err(ProxyRejection::TooLarge);
    }

    let operations = top_level_keywords(&request.query)?;
    if operations.is_empty() {
        return Err(ProxyRejection::Malformed);
    }
    if operations
        .iter()
        .any(|op| !matches!(op.as_str(), "query" | "fragment" | "{"))
    {
        return Err(ProxyRejection::NotAQuery);
    }
    Ok(())
}

/// The keyword opening each top-level definition (`{` for shorthand queries).
///
/// Skips comments and string literals so braces inside them don't count.
fn top_level_keywords(document: &str) -> Result<Vec<String>, ProxyRejection> {
    let mut keywords = Vec::new();
    let mut depth: usize = 0;
    let mut expecting_definition = true;
    let mut chars = document.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '#' => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '"' => skip_string(&mut chars)?,
            '{' => {
                if depth == 0 && expecting_definition {
                    keywords.push("{".to_owned());
                }
                expecting_definition = false;
                depth += 1;
            }
            '}' => {
                depth = depth.checked_sub(1).ok_or(ProxyRejection::Malformed)?;
                if depth == 0 {
                    expecting_definition = true;
                }
            }
            c if depth == 0 && expecting_definition && c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                keywords.push(word);
                expecting_definition = false;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ProxyRejection::Malformed);
    }
    Ok(keywords)
}

/// Consume a string literal whose opening quote was already read.
fn skip_string(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<(), ProxyRejection> {
    // Block string: """ ... """
    if chars.peek() == Some(&'"') {
        chars.next();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut quotes = 0;
            for c in chars.by_ref() {
                if c == '"' {
                    quotes += 1;
                    if quotes == 3 {
                        return Ok(());
                    }
                } else {
                    quotes = 0;
                }
            }
            return Err(ProxyRejection::Malformed);
        }
        // Empty string ""
        return Ok(());
    }

    let mut escaped = false;
    for c in chars.by_ref() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Ok(()),
            '\n' => return Err(ProxyRejection::Malformed),
            _ => escaped = false,
        }
    }
    Err(ProxyRejection::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str) -> ProxyRequest {
        ProxyRequest {
            query: query.to_owned(),
            variables: None,
            operation_name: None,
        }
    }

    #[test]
    fn test_accepts_queries_and_fragments() {
        assert!(validate(&request("{ shop { name } }")).is_ok());
        assert!(validate(&request(
            "query P($h: String!) { product(handle: $h) { ...F } } fragment F on Product { id }"
        ))
        .is_ok());
    }

    #[test]
    fn test_rejects_mutations_anywhere() {
        assert_eq!(
            validate(&request("mutation { cartCreate { cart { id } } }")),
            Err(ProxyRejection::NotAQuery)
        );
        assert_eq!(
            validate(&request("query A { shop { name } } mutation B { cartCreate { cart { id } } }")),
            Err(ProxyRejection::NotAQuery)
        );
        assert_eq!(
            validate(&request("subscription { x }")),
            Err(ProxyRejection::NotAQuery)
        );
    }

    #[test]
    fn test_braces_in_strings_and_comments_are_ignored() {
        let query = r#"
            # } mutation {
            query { products(first: 1, query: "title:\"}\" mutation") { nodes { id } } }
        "#;
        assert!(validate(&request(query)).is_ok());

        let block = "query { search(query: \"\"\"a } b\"\"\") { totalCount } }";
        assert!(validate(&request(block)).is_ok());
    }

    #[test]
    fn test_rejects_malformed_and_oversized() {
        assert_eq!(validate(&request("   ")), Err(ProxyRejection::Empty));
        assert_eq!(validate(&request("query { shop ")), Err(ProxyRejection::Malformed));
        assert_eq!(validate(&request("}{")), Err(ProxyRejection::Malformed));
        assert_eq!(
            validate(&request(&format!("{{ {} }}", "a ".repeat(MAX_QUERY_BYTES)))),
            Err(ProxyRejection::TooLarge)
        );
    }
}
