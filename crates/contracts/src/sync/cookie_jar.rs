use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Session cookies accumulated during a login handshake.
///
/// Owned exclusively by one client instance per login sequence; the flat
/// `Cookie:` header string exists only at the HTTP boundary. Merging a
/// later `Set-Cookie` for an existing name overwrites the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieJar(BTreeMap<String, String>);

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge one `Set-Cookie` header line. Attributes after the first `;`
    /// (Path, Expires, HttpOnly, ...) are dropped; the pair itself is split
    /// on the first `=`.
    pub fn merge_set_cookie(&mut self, line: &str) {
        let pair = line.split(';').next().unwrap_or("").trim();
        if pair.is_empty() {
            return;
        }
        match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                self.0.insert(name.trim().to_string(), value.to_string());
            }
            _ => {}
        }
    }

    pub fn merge_set_cookie_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) {
        for line in lines {
            self.merge_set_cookie(line);
        }
    }

    /// Wire form for a `Cookie:` request header
    pub fn to_header_value(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Parse a serialized `Cookie:` header back into a jar
    pub fn from_header_value(header: &str) -> Self {
        let mut jar = Self::new();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if !name.trim().is_empty() {
                    jar.insert(name.trim(), value);
                }
            }
        }
        jar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cookie_attributes_are_stripped() {
        let mut jar = CookieJar::new();
        jar.merge_set_cookie("sid=abc123; Path=/; HttpOnly; Expires=Wed, 01 Jan 2025 00:00:00 GMT");
        assert_eq!(jar.get("sid"), Some("abc123"));
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn later_values_overwrite_earlier_ones() {
        let mut jar = CookieJar::new();
        jar.merge_set_cookie_lines(["sid=first", "lang=en", "sid=second; Path=/"]);
        assert_eq!(jar.get("sid"), Some("second"));
        assert_eq!(jar.len(), 2);
    }

    #[test]
    fn value_with_embedded_equals_survives() {
        let mut jar = CookieJar::new();
        jar.merge_set_cookie("token=a=b=c; Secure");
        assert_eq!(jar.get("token"), Some("a=b=c"));
    }

    #[test]
    fn header_round_trip() {
        let mut jar = CookieJar::new();
        jar.insert("a", "1");
        jar.insert("b", "2");
        let header = jar.to_header_value();
        assert_eq!(header, "a=1; b=2");
        assert_eq!(CookieJar::from_header_value(&header), jar);
    }

    #[test]
    fn malformed_lines_are_ignored() {
        let mut jar = CookieJar::new();
        jar.merge_set_cookie_lines(["", "   ", "noequals", "=value"]);
        assert!(jar.is_empty());
    }
}
