//! Shared PDF object helpers used across multiple modules.

use lopdf::{Dictionary, Document, Object};

/// Follow one indirect reference, if `value` is one.
pub fn resolve<'a>(document: &'a Document, value: &'a Object) -> Option<&'a Object> {
    match value {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resolve a value that might be inline or a reference to a dictionary.
pub fn resolve_dict<'a>(document: &'a Document, value: &'a Object) -> Option<&'a Dictionary> {
    resolve(document, value).and_then(|o| o.as_dict().ok())
}

/// Resolve a value that might be inline or a reference to an array.
pub fn resolve_array<'a>(document: &'a Document, value: &'a Object) -> Option<&'a Vec<Object>> {
    resolve(document, value).and_then(|o| o.as_array().ok())
}

/// Look up `key` in `dict` and resolve it to a dictionary.
pub fn get_dict<'a>(document: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    dict.get(key).ok().and_then(|v| resolve_dict(document, v))
}

/// Extract a string value from a PDF dictionary for a given key.
///
/// Returns `Some(String)` if the key exists and contains a valid non-empty string,
/// `None` otherwise.
pub fn extract_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_str().ok())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .filter(|s| !s.is_empty())
}

/// Read a `/Subtype`-style MIME type stored as a PDF name
/// (e.g. `/application#2Fjson`), normalized to lowercase `type/subtype`.
pub fn mime_type_from_dict(dict: &Dictionary) -> Option<String> {
    let raw = dict.get(b"Subtype").ok()?.as_name().ok()?;
    let mime = String::from_utf8_lossy(raw)
        .replace("#2F", "/")
        .replace("#2f", "/")
        .to_ascii_lowercase();
    Some(mime).filter(|m| !m.is_empty())
}

/// Human-readable name of a PDF object's kind, for diagnostics.
pub fn object_kind(object: &Object) -> &'static str {
    match object {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Integer(_) => "integer",
        Object::Real(_) => "real",
        Object::Name(_) => "name",
        Object::String(..) => "string",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream(_) => "stream",
        Object::Reference(_) => "reference",
    }
}
