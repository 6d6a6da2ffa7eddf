// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key=value property files.
//!
//! Both `pyros.config` and per-process `.process` files share the same
//! format: one `key=value` per line, `#` comments, anything else ignored.
//! Insertion order is preserved so rewritten files stay diffable.

/// An ordered set of `key=value` properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Props {
    entries: Vec<(String, String)>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse property lines. Comment lines and lines without exactly one
    /// `=` separator are skipped; keys and values are trimmed.
    pub fn parse(text: &str) -> Self {
        let mut props = Self::new();
        for line in text.lines() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            let mut split = line.split('=');
            if let (Some(key), Some(value), None) = (split.next(), split.next(), split.next()) {
                let key = key.trim();
                if !key.is_empty() {
                    props.set(key, value.trim());
                }
            }
        }
        props
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Set a key, replacing an existing value in place.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render back to file form, one `key=value` per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
#[path = "props_tests.rs"]
mod tests;
