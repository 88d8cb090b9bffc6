//! Header flattening and sanitization
//!
//! Transports may deliver several values for one header name. Records carry
//! a single value per name: the first one. The sanitizer then masks
//! configured names and truncates overlong values, counting characters
//! rather than bytes so multi-byte text is never cut mid-codepoint.

use crate::{MASKED, SanitizationConfig};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Raw headers as received from the transport, possibly multi-valued.
///
/// Names are grouped case-insensitively; the casing of the first occurrence
/// is kept. Insertion order is preserved.
///
/// # Examples
///
/// ```
/// use reqtrail_core::HeaderSnapshot;
///
/// let mut headers = HeaderSnapshot::new();
/// headers.append("Accept", "text/html");
/// headers.append("accept", "application/json");
///
/// assert_eq!(headers.len(), 1);
/// assert_eq!(headers.get_all("ACCEPT").unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSnapshot {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `name`
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Builder-style [`append`](Self::append)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// All values for `name`, in arrival order
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any header name carries more than one value
    pub fn has_duplicates(&self) -> bool {
        self.entries.iter().any(|(_, values)| values.len() > 1)
    }

    /// Full snapshot as JSON, for diagnostics
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<N, V> FromIterator<(N, V)> for HeaderSnapshot
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (name, value) in iter {
            snapshot.append(name, value);
        }
        snapshot
    }
}

impl From<&http::HeaderMap> for HeaderSnapshot {
    fn from(map: &http::HeaderMap) -> Self {
        let mut snapshot = Self::new();
        for name in map.keys() {
            for value in map.get_all(name) {
                snapshot.append(
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                );
            }
        }
        snapshot
    }
}

impl Serialize for HeaderSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, values) in &self.entries {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

/// Headers reduced to one value per name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatHeaders {
    entries: Vec<(String, String)>,
}

impl FlatHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `name`
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&str> {
        lookup(&self.entries, name)
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
}

impl<N, V> FromIterator<(N, V)> for FlatHeaders
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl From<SanitizedHeaders> for FlatHeaders {
    fn from(headers: SanitizedHeaders) -> Self {
        Self {
            entries: headers.entries,
        }
    }
}

impl Serialize for FlatHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pairs(&self.entries, serializer)
    }
}

/// Headers ready to be written to a log record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedHeaders {
    entries: Vec<(String, String)>,
}

impl SanitizedHeaders {
    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&str> {
        lookup(&self.entries, name)
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
}

impl Serialize for SanitizedHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pairs(&self.entries, serializer)
    }
}

fn lookup<'a>(entries: &'a [(String, String)], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn serialize_pairs<S: Serializer>(
    entries: &[(String, String)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (name, value) in entries {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

/// Masks and truncates header values according to a [`SanitizationConfig`]
#[derive(Debug, Clone, Copy)]
pub struct HeaderSanitizer<'a> {
    config: &'a SanitizationConfig,
}

impl<'a> HeaderSanitizer<'a> {
    pub fn new(config: &'a SanitizationConfig) -> Self {
        Self { config }
    }

    /// Keep the first value of every header name.
    ///
    /// The returned flag is `true` when at least one name carried several
    /// values; the output is the same either way, the caller decides how to
    /// report the anomaly.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtrail_core::{HeaderSanitizer, HeaderSnapshot};
    ///
    /// let snapshot = HeaderSnapshot::new()
    ///     .with("Accept", "text/html")
    ///     .with("Accept", "application/json");
    ///
    /// let (flat, duplicated) = HeaderSanitizer::flatten(&snapshot);
    /// assert!(duplicated);
    /// assert_eq!(flat.get("accept"), Some("text/html"));
    /// ```
    pub fn flatten(snapshot: &HeaderSnapshot) -> (FlatHeaders, bool) {
        let mut duplicated = false;
        let mut flat = FlatHeaders::new();

        for (name, values) in snapshot.iter() {
            if values.len() > 1 {
                duplicated = true;
            }
            if let Some(first) = values.first() {
                flat.entries.push((name.to_string(), first.clone()));
            }
        }

        (flat, duplicated)
    }

    /// Mask configured names and truncate overlong values, keeping order
    pub fn sanitize(&self, headers: FlatHeaders) -> SanitizedHeaders {
        let entries = headers
            .entries
            .into_iter()
            .map(|(name, value)| {
                let value = self.sanitize_value(&name, value);
                (name, value)
            })
            .collect();

        SanitizedHeaders { entries }
    }

    /// Sanitize a single header value
    pub fn sanitize_value(&self, name: &str, value: String) -> String {
        if self.config.is_header_masked(name) {
            return MASKED.to_string();
        }

        let limit = self.config.max_header_value_length();
        if value.chars().count() <= limit {
            return value;
        }

        let marker = self.config.truncation_marker();
        match limit.checked_sub(marker.chars().count()) {
            Some(keep) if keep > 0 => {
                let mut truncated: String = value.chars().take(keep).collect();
                truncated.push_str(marker);
                truncated
            }
            _ => marker.to_string(),
        }
    }
}
