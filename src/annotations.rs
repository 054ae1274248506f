//! Purity annotations.
//!
//! A call or `new` expression immediately preceded by `/* @__PURE__ */` (or
//! the `#__PURE__` spelling) may be dropped when its result is unused. The
//! marker is accepted in block and line comments, with or without interior
//! whitespace: `/*@__PURE__*/`, `/* #__PURE__ */`, `// @__PURE__`.

const MARKER: &[u8] = b"__PURE__";

/// Whether `comment` (the raw comment text, delimiters included or not)
/// carries a purity marker.
pub fn is_pure_annotation(comment: &str) -> bool {
    let body = comment_body(comment);
    let bytes = body.as_bytes();
    memchr::memmem::find_iter(bytes, MARKER).any(|pos| {
        if pos == 0 {
            return false;
        }
        let sigil = bytes[pos - 1];
        if sigil != b'@' && sigil != b'#' {
            return false;
        }
        // The marker must stand alone: `@__PURE__x` does not count.
        let after = pos + MARKER.len();
        let boundary_before = pos < 2 || !is_word_byte(bytes[pos - 2]);
        let boundary_after = after >= bytes.len() || !is_word_byte(bytes[after]);
        boundary_before && boundary_after
    })
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Strip `/* */` or `//` delimiters if present.
fn comment_body(comment: &str) -> &str {
    let trimmed = comment.trim();
    if let Some(inner) = trimmed.strip_prefix("/*") {
        inner.strip_suffix("*/").unwrap_or(inner)
    } else if let Some(inner) = trimmed.strip_prefix("//") {
        inner
    } else {
        trimmed
    }
}
