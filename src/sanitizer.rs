//! Turn decoded payload bytes into clean text and decide whether it is usable.

use serde_json::{Map, Value};

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Decode `bytes` as UTF-8 and strip surrounding whitespace and a leading
/// byte-order mark.
///
/// Malformed UTF-8 sequences are replaced with U+FFFD rather than rejected.
///
/// ```
/// assert_eq!(receiptpdf::sanitize(" \u{FEFF} {\"a\":1} ".as_bytes()), "{\"a\":1}");
/// ```
pub fn sanitize(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    match trimmed.strip_prefix(BYTE_ORDER_MARK) {
        Some(rest) => rest.trim_start().to_owned(),
        None => trimmed.to_owned(),
    }
}

/// Returns `true` when `text` is non-empty and either the declared MIME type
/// mentions JSON or the text itself is a JSON object or array.
///
/// Only text starting with `{` or `[` is parsed; anything else is rejected
/// without attempting a parse.
///
/// ```
/// use receiptpdf::is_acceptable;
///
/// assert!(is_acceptable("{\"a\":1}", ""));
/// assert!(!is_acceptable("not json", ""));
/// assert!(is_acceptable("not json", "application/json"));
/// ```
pub fn is_acceptable(text: &str, declared_mime_type: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    declared_mime_type.to_ascii_lowercase().contains("json") || is_json_document(text)
}

fn is_json_document(text: &str) -> bool {
    match text.trim_start().chars().next() {
        Some('{') => serde_json::from_str::<Map<String, Value>>(text).is_ok(),
        Some('[') => serde_json::from_str::<Vec<Value>>(text).is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_whitespace_and_bom() {
        assert_eq!(sanitize(" \u{FEFF} {\"a\":1} ".as_bytes()), "{\"a\":1}");
        assert_eq!(sanitize(b"\xEF\xBB\xBF[1]\n"), "[1]");
        assert_eq!(sanitize(b"\n\t plain \r\n"), "plain");
    }

    #[test]
    fn bom_only_sanitizes_to_empty() {
        assert_eq!(sanitize("\u{FEFF}   ".as_bytes()), "");
        assert_eq!(sanitize(b""), "");
    }

    #[test]
    fn bom_inside_text_is_kept() {
        assert_eq!(sanitize("a\u{FEFF}b".as_bytes()), "a\u{FEFF}b");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(sanitize(b"{\"a\":\"\xFF\"}"), "{\"a\":\"\u{FFFD}\"}");
    }

    #[test]
    fn json_documents_are_acceptable() {
        assert!(is_acceptable("{\"a\":1}", ""));
        assert!(is_acceptable("[{\"a\":1}, 2]", "image/png"));
        assert!(is_acceptable("{}", ""));
    }

    #[test]
    fn other_text_is_rejected_without_hint() {
        assert!(!is_acceptable("not json", ""));
        assert!(!is_acceptable("42", ""));
        assert!(!is_acceptable("\"string\"", ""));
        assert!(!is_acceptable("{broken", ""));
        assert!(!is_acceptable("[1, 2", "text/plain"));
    }

    #[test]
    fn json_hint_overrides_content_check() {
        assert!(is_acceptable("not json", "application/json"));
        assert!(is_acceptable("not json", "Application/JSON; charset=utf-8"));
        assert!(is_acceptable("not json", "application/ld+json"));
    }

    #[test]
    fn empty_text_is_never_acceptable() {
        assert!(!is_acceptable("", "application/json"));
        assert!(!is_acceptable("", ""));
    }
}
