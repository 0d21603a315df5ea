// crates/core/src/headers.rs
//! Outbound header handling for backend requests.
//!
//! Static headers come from the command line (`--header "Name: Value"`); the
//! only per-call header is the caller's `Authorization`, which wins over a
//! statically configured one.

use serde_json::{Map, Value};

pub const AUTHORIZATION: &str = "Authorization";

/// Ordered header list with case-insensitive names.
///
/// Used both as HTTP headers on the start request and as `connection_init`
/// params on the subscription channel, so it stays a plain string map rather
/// than a `http::HeaderMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `Name: Value` lines, skipping malformed ones.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headers = Self::new();
        for line in lines {
            match parse_header_line(line.as_ref()) {
                Some((name, value)) => headers.insert(name, value),
                None => tracing::warn!(header = line.as_ref(), "ignoring malformed header"),
            }
        }
        headers
    }

    /// Insert or replace. A name matching an existing entry (ignoring case)
    /// replaces that entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object form, sent as `connection_init` payload.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(n, v)| (n.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

/// Parse one `Name: Value` line. Splits on the first colon; both sides are
/// trimmed. Returns `None` without a colon or with an empty name.
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Combine static headers with the caller's authorization header.
///
/// The caller's value replaces a static `Authorization` (any casing); every
/// other static header passes through unchanged. An empty caller value is
/// treated as absent.
pub fn merge_headers(static_headers: &HeaderSet, caller_authorization: Option<&str>) -> HeaderSet {
    let mut merged = static_headers.clone();
    if let Some(auth) = caller_authorization.filter(|a| !a.is_empty()) {
        merged.insert(AUTHORIZATION, auth);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_header_line() {
        assert_eq!(
            parse_header_line("Authorization: Bearer abc"),
            Some(("Authorization".into(), "Bearer abc".into()))
        );
        assert_eq!(
            parse_header_line("  X-Trace :  a:b:c "),
            Some(("X-Trace".into(), "a:b:c".into()))
        );
        assert_eq!(parse_header_line("X-Empty:"), Some(("X-Empty".into(), "".into())));
        assert_eq!(parse_header_line("no colon here"), None);
        assert_eq!(parse_header_line(" : value"), None);
    }

    #[test]
    fn test_from_lines_skips_malformed() {
        let headers = HeaderSet::from_lines(["X-One: 1", "garbage", "X-Two: 2"]);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("x-one"), Some("1"));
        assert_eq!(headers.get("X-TWO"), Some("2"));
    }

    #[test]
    fn test_merge_caller_wins() {
        let static_headers =
            HeaderSet::from_lines(["authorization: Bearer static", "X-Tenant: acme"]);
        let merged = merge_headers(&static_headers, Some("Bearer caller"));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("Authorization"), Some("Bearer caller"));
        assert_eq!(merged.get("X-Tenant"), Some("acme"));
        // static set untouched
        assert_eq!(static_headers.get("authorization"), Some("Bearer static"));
    }

    #[test]
    fn test_merge_without_caller_passes_through() {
        let static_headers = HeaderSet::from_lines(["Authorization: Bearer static"]);
        assert_eq!(merge_headers(&static_headers, None), static_headers);
        assert_eq!(merge_headers(&static_headers, Some("")), static_headers);
    }

    #[test]
    fn test_merge_adds_authorization_when_missing() {
        let merged = merge_headers(&HeaderSet::new(), Some("Bearer t"));
        assert_eq!(merged.to_json(), serde_json::json!({ "Authorization": "Bearer t" }));
    }
}
