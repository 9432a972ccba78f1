//! Minimal JSON document builder for report payloads.
//!
//! Reports only carry ASCII-safe metadata, so the only characters escaped
//! are backslash and double quote. Fields are written in insertion order
//! straight into a single buffer; nothing is streamed.

use std::fmt;

/// A flat JSON object whose values are strings, string arrays, or
/// string-to-string maps.
#[derive(Debug, Clone, Default)]
pub struct JsonDocument {
    /// Comma-separated `"key":value` pairs, without the outer braces
    body: String,
}

impl JsonDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the buffer for documents whose size is roughly known.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            body: String::with_capacity(capacity),
        }
    }

    /// Add a scalar string field.
    pub fn put(mut self, key: &str, value: &str) -> Self {
        self.begin_field(key);
        push_quoted(&mut self.body, value);
        self
    }

    /// Add a field holding an array of strings.
    pub fn put_array<I, S>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.begin_field(key);
        self.body.push('[');
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.body.push(',');
            }
            push_quoted(&mut self.body, value.as_ref());
        }
        self.body.push(']');
        self
    }

    /// Add a field holding a nested string-to-string map.
    ///
    /// Entries are written in the order the iterator yields them.
    pub fn put_map<I, K, V>(mut self, key: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.begin_field(key);
        self.body.push('{');
        for (i, (k, v)) in entries.into_iter().enumerate() {
            if i > 0 {
                self.body.push(',');
            }
            push_quoted(&mut self.body, k.as_ref());
            self.body.push(':');
            push_quoted(&mut self.body, v.as_ref());
        }
        self.body.push('}');
        self
    }

    /// Materialize the full document.
    pub fn finish(self) -> String {
        let mut out = String::with_capacity(self.body.len() + 2);
        out.push('{');
        out.push_str(&self.body);
        out.push('}');
        out
    }

    fn begin_field(&mut self, key: &str) {
        if !self.body.is_empty() {
            self.body.push(',');
        }
        push_quoted(&mut self.body, key);
        self.body.push(':');
    }
}

impl fmt::Display for JsonDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.body)
    }
}

/// Append `"value"` to `out` with `\` and `"` escaped.
fn push_quoted(out: &mut String, value: &str) {
    out.reserve(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
}
