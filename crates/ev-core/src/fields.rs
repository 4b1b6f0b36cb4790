//! # Nested Field Discovery
//!
//! Structured payloads have no schema. To offer something to chart we walk
//! every parsed payload in a batch and collect the paths of numeric leaves:
//! object keys extend a path with `.key`, array elements with `[i]`, so a
//! leaf reads like `cpu.cores[2].load`.
//!
//! A leaf counts as numeric if it is a JSON number or a string that parses
//! completely as a finite number (`"42.5"` yes, `"42 ms"` no).

use crate::series::TIME_KEY;
use crate::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("empty field path")]
    Empty,
    #[error("empty key at byte {0} in field path")]
    EmptyKey(usize),
    #[error("malformed index at byte {0} in field path")]
    BadIndex(usize),
}

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Address of a scalar inside a structured payload.
///
/// Identity, ordering and hashing use the rendered text only. Two payload
/// positions that render the same (a literal `"a.b"` key and a nested
/// `a` → `b`) are one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    text: String,
    segments: Vec<Segment>,
}

impl PartialEq for FieldPath {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for FieldPath {}

impl PartialOrd for FieldPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl Hash for FieldPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl FieldPath {
    fn root() -> Self {
        Self {
            text: String::new(),
            segments: Vec::new(),
        }
    }

    fn child_key(&self, key: &str) -> Self {
        let mut text = self.text.clone();
        if !text.is_empty() {
            text.push('.');
        }
        text.push_str(key);
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { text, segments }
    }

    fn child_index(&self, index: usize) -> Self {
        let text = format!("{}[{}]", self.text, index);
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { text, segments }
    }

    /// Parse a user-typed path such as `a.b[2].c` or `[0].x`.
    ///
    /// Keys cannot contain `.` or `[`; payload keys that do are still
    /// discovered but can only be addressed through discovery.
    pub fn parse(raw: &str) -> Result<Self, FieldPathError> {
        if raw.is_empty() {
            return Err(FieldPathError::Empty);
        }

        let mut path = Self::root();
        let bytes = raw.as_bytes();
        let mut pos = 0;
        let mut expect_key = !raw.starts_with('[');

        while pos < bytes.len() {
            match bytes[pos] {
                b'[' if !expect_key => {
                    let close = raw[pos..]
                        .find(']')
                        .map(|off| pos + off)
                        .ok_or(FieldPathError::BadIndex(pos))?;
                    let index = raw[pos + 1..close]
                        .parse::<usize>()
                        .map_err(|_| FieldPathError::BadIndex(pos))?;
                    path = path.child_index(index);
                    pos = close + 1;
                    expect_key = false;
                }
                b'.' if !expect_key => {
                    pos += 1;
                    expect_key = true;
                }
                _ if expect_key => {
                    let end = raw[pos..]
                        .find(|c: char| c == '.' || c == '[')
                        .map(|off| pos + off)
                        .unwrap_or(raw.len());
                    if end == pos {
                        return Err(FieldPathError::EmptyKey(pos));
                    }
                    path = path.child_key(&raw[pos..end]);
                    pos = end;
                    expect_key = false;
                }
                _ => return Err(FieldPathError::EmptyKey(pos)),
            }
        }

        if expect_key {
            return Err(FieldPathError::EmptyKey(raw.len()));
        }
        Ok(path)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Follow this path into `value`. `None` on a type mismatch, a missing
    /// key or an out-of-range index.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match (segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            })
    }

    /// Resolve and coerce to a finite number.
    pub fn resolve_number(&self, value: &Value) -> Option<f64> {
        self.resolve(value).and_then(numeric)
    }

    /// Collides with the label key of a serialized series point, so it is
    /// never offered for charting.
    pub fn is_reserved(&self) -> bool {
        self.text == TIME_KEY
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = FieldPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.text
    }
}

/// Numeric value of a leaf, if it has one.
pub fn numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Sorted union of numeric leaf paths over every parseable payload.
pub fn discover(events: &[Event]) -> Vec<FieldPath> {
    let mut found = BTreeSet::new();
    for event in events {
        if let Some(payload) = event.payload() {
            walk(&payload, &FieldPath::root(), &mut found);
        }
    }
    found.into_iter().collect()
}

fn walk(value: &Value, path: &FieldPath, out: &mut BTreeSet<FieldPath>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, &path.child_key(key), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, &path.child_index(index), out);
            }
        }
        leaf => {
            // A bare scalar payload has no address to chart.
            if !path.segments.is_empty() && !path.is_reserved() && numeric(leaf).is_some() {
                out.insert(path.clone());
            }
        }
    }
}

// =============================================================================
// Selection
// =============================================================================

/// The operator's chosen subset of a field catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    selected: BTreeSet<FieldPath>,
}

impl FieldSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, path: FieldPath) {
        self.selected.insert(path);
    }

    /// Flip membership. Returns `true` if the path is now selected.
    pub fn toggle(&mut self, path: &FieldPath) -> bool {
        if self.selected.remove(path) {
            false
        } else {
            self.selected.insert(path.clone());
            true
        }
    }

    pub fn is_selected(&self, path: &FieldPath) -> bool {
        self.selected.contains(path)
    }

    /// Drop every selected path missing from a freshly discovered catalogue.
    pub fn retain_known(&mut self, catalogue: &[FieldPath]) {
        self.selected
            .retain(|path| catalogue.binary_search(path).is_ok());
    }

    /// Selected paths in catalogue order.
    pub fn fields(&self) -> Vec<FieldPath> {
        self.selected.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn event(structured: &str) -> Event {
        Event {
            timestamp: DateTime::from_timestamp_millis(1_000).unwrap(),
            tool: "t".into(),
            topic: "x".into(),
            structured: structured.into(),
        }
    }

    fn names(paths: &[FieldPath]) -> Vec<&str> {
        paths.iter().map(FieldPath::as_str).collect()
    }

    #[test]
    fn test_discovers_nested_numeric_leaves() {
        let events = vec![event(
            r#"{"cpu":{"load":0.5,"cores":[1,2,{"temp":"61.5"}]},"host":"web-1","up":true}"#,
        )];
        let paths = discover(&events);
        assert_eq!(
            names(&paths),
            vec!["cpu.cores[0]", "cpu.cores[1]", "cpu.cores[2].temp", "cpu.load"]
        );
    }

    #[test]
    fn test_numeric_string_included_text_excluded() {
        let paths = discover(&[event(r#"{"a":"42.5","b":"hello","c":"","d":"1e3"}"#)]);
        assert_eq!(names(&paths), vec!["a", "d"]);
    }

    #[test]
    fn test_non_finite_strings_excluded() {
        let paths = discover(&[event(r#"{"a":"NaN","b":"inf","c":"-Infinity"}"#)]);
        assert!(paths.is_empty());
    }

    #[test]
    fn test_same_rendered_path_listed_once() {
        let paths = discover(&[event(r#"{"a.b":1,"a":{"b":2}}"#)]);
        assert_eq!(names(&paths), vec!["a.b"]);
        assert_eq!(paths[0], FieldPath::parse("a.b").unwrap());
    }

    #[test]
    fn test_top_level_time_key_not_discovered() {
        let paths = discover(&[event(r#"{"time":5,"t":{"time":1}}"#)]);
        assert_eq!(names(&paths), vec!["t.time"]);
        assert!(FieldPath::parse("time").unwrap().is_reserved());
    }

    #[test]
    fn test_malformed_payloads_are_skipped() {
        let events = vec![event("{oops"), event(r#"{"ok":1}"#), event("")];
        assert_eq!(names(&discover(&events)), vec!["ok"]);
    }

    #[test]
    fn test_union_across_events_is_sorted_and_deduplicated() {
        let events = vec![
            event(r#"{"z":1,"a":{"b":2}}"#),
            event(r#"{"m":3,"z":4}"#),
            event(r#"[{"q":5}]"#),
        ];
        let first = discover(&events);
        let second = discover(&events);
        assert_eq!(first, second);
        assert_eq!(names(&first), vec!["[0].q", "a.b", "m", "z"]);
    }

    #[test]
    fn test_root_scalar_is_not_addressable() {
        assert!(discover(&[event("12")]).is_empty());
    }

    #[test]
    fn test_parse_renders_identically() {
        for raw in ["a", "a.b", "a.b[2].c", "[0].x", "m[1][2]"] {
            assert_eq!(FieldPath::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn test_parse_matches_discovered_path() {
        let discovered = discover(&[event(r#"{"a":{"b":[0,0,{"c":7}]}}"#)]);
        let typed = FieldPath::parse("a.b[2].c").unwrap();
        assert!(discovered.contains(&typed));
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert_eq!(FieldPath::parse(""), Err(FieldPathError::Empty));
        assert!(FieldPath::parse("a..b").is_err());
        assert!(FieldPath::parse("a.").is_err());
        assert!(FieldPath::parse("a[x]").is_err());
        assert!(FieldPath::parse("a[1").is_err());
        assert!(FieldPath::parse("a[1]b").is_err());
    }

    #[test]
    fn test_resolve_short_circuits_on_mismatch() {
        let v: Value = serde_json::from_str(r#"{"a":[1,{"b":2}],"s":"x"}"#).unwrap();
        let p = |s: &str| FieldPath::parse(s).unwrap();
        assert_eq!(p("a[1].b").resolve_number(&v), Some(2.0));
        assert_eq!(p("a[5]").resolve(&v), None);
        assert_eq!(p("a.b").resolve(&v), None);
        assert_eq!(p("s[0]").resolve(&v), None);
        assert_eq!(p("a[0].x").resolve(&v), None);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let p = FieldPath::parse("a[1].b").unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"a[1].b\"");
        let back: FieldPath = serde_json::from_str("\"a[1].b\"").unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_selection_drops_vanished_fields() {
        let catalogue = discover(&[event(r#"{"a":1,"b":2}"#)]);
        let mut selection = FieldSelection::new();
        assert!(selection.toggle(&catalogue[1]));
        selection.select(FieldPath::parse("gone").unwrap());
        selection.retain_known(&catalogue);
        assert_eq!(names(&selection.fields()), vec!["b"]);
        assert!(!selection.toggle(&catalogue[1]));
        assert!(selection.is_empty());
    }
}
