//! Lenient JSON for configuration files.
//!
//! `tsconfig.json` and bundler option files are routinely written with
//! comments and trailing commas. Both are stripped here before the text is
//! handed to `serde_json`.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Parse JSON-with-comments into `T`.
pub fn from_str<T: DeserializeOwned>(source: &str) -> Result<T> {
    let stripped = strip_jsonc(source);
    let normalized = remove_trailing_commas(&stripped);
    serde_json::from_str(&normalized).context("failed to parse JSON")
}

/// Remove `//` and `/* */` comments outside string literals. Newlines inside
/// comments are kept so serde_json error positions stay meaningful.
pub fn strip_jsonc(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(ch) = chars.next() {
        if in_line_comment {
            if ch == '\n' {
                in_line_comment = false;
                out.push(ch);
            }
            continue;
        }

        if in_block_comment {
            if ch == '*' {
                if let Some('/') = chars.peek().copied() {
                    chars.next();
                    in_block_comment = false;
                }
            } else if ch == '\n' {
                out.push(ch);
            }
            continue;
        }

        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
            out.push(ch);
            continue;
        }

        if ch == '/'
            && let Some(&next) = chars.peek()
        {
            if next == '/' {
                chars.next();
                in_line_comment = true;
                continue;
            }
            if next == '*' {
                chars.next();
                in_block_comment = true;
                continue;
            }
        }

        out.push(ch);
    }

    out
}

/// Drop commas that are directly followed (modulo whitespace) by `}` or `]`.
pub fn remove_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
            out.push(ch);
            continue;
        }

        if ch == ',' {
            let mut lookahead = chars.clone();
            while lookahead.peek().is_some_and(|c| c.is_whitespace()) {
                lookahead.next();
            }
            if matches!(lookahead.peek(), Some('}') | Some(']')) {
                continue;
            }
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_comments_keeps_strings() {
        let src = r#"{ "a": "http://x", // trailing
            /* block */ "b": 1 }"#;
        let value: Value = from_str(src).unwrap();
        assert_eq!(value["a"], "http://x");
        assert_eq!(value["b"], 1);
    }

    #[test]
    fn test_trailing_commas() {
        let value: Value = from_str(r#"{ "list": [1, 2, ], }"#).unwrap();
        assert_eq!(value["list"].as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(from_str::<Value>("{ nope }").is_err());
    }
}
