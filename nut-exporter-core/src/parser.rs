//! Parser for normalized list blobs
//!
//! [`NutSession::fetch_list`](crate::protocol::NutSession::fetch_list)
//! produces one `name: value` line per variable. This module turns that blob
//! into [`VariableRecord`]s and a lookup map used by the synchronizer.

use std::collections::HashMap;

/// Separator between name and value in a normalized line
const SEPARATOR: &str = ": ";

/// One variable from a list response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRecord {
    /// Variable name, e.g. `battery.charge`
    pub name: String,
    /// Raw value, unquoted
    pub value: String,
}

/// Stateless parser for list blobs
pub struct ResponseParser;

impl ResponseParser {
    /// Parses a blob into records, preserving line order.
    ///
    /// Lines without the `": "` separator or with an empty name are
    /// dropped. This never fails.
    #[must_use]
    pub fn parse(blob: &str) -> Vec<VariableRecord> {
        blob.lines().filter_map(Self::parse_line).collect()
    }

    fn parse_line(line: &str) -> Option<VariableRecord> {
        let (name, value) = line.split_once(SEPARATOR)?;
        if name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }
        Some(VariableRecord {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// `name → value` lookup built once per poll
#[derive(Debug, Clone, Default)]
pub struct VariableMap {
    values: HashMap<String, String>,
}

impl VariableMap {
    /// Builds a map from records; the first occurrence of a name wins
    #[must_use]
    pub fn from_records(records: Vec<VariableRecord>) -> Self {
        let mut values = HashMap::with_capacity(records.len());
        for record in records {
            values.entry(record.name).or_insert(record.value);
        }
        Self { values }
    }

    /// Parses a blob straight into a map
    #[must_use]
    pub fn from_blob(blob: &str) -> Self {
        Self::from_records(ResponseParser::parse(blob))
    }

    /// Looks up a variable
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of distinct variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no variables were parsed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
