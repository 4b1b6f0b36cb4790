//! # Series Aggregation
//!
//! Turns a batch of events into chart-ready points for a chosen set of
//! fields. Events sharing an exact millisecond timestamp land in the same
//! bucket and their values are summed: co-timestamped events are partial
//! contributions to one instant (shards emitting in parallel, for example).

use crate::fields::FieldPath;
use crate::Event;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the display label in a serialized [`SeriesPoint`]. A payload field
/// rendering to the same text would overwrite it, so aggregation skips it.
pub const TIME_KEY: &str = "time";

/// One bucket of the aggregated series.
///
/// Serializes flat, e.g. `{"time":"00:00:01","cpu.load":3.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// UTC wall-clock label, `HH:MM:SS`.
    pub time: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl SeriesPoint {
    pub fn get(&self, field: &FieldPath) -> Option<f64> {
        self.values.get(field.as_str()).copied()
    }
}

/// Aggregate `events` over `fields`, ascending by timestamp.
pub fn aggregate(events: &[Event], fields: &[FieldPath]) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<i64, BTreeMap<String, f64>> = BTreeMap::new();

    for event in events {
        let Some(payload) = event.payload() else {
            continue;
        };

        let bucket = buckets.entry(event.timestamp.timestamp_millis()).or_default();
        for field in fields.iter().filter(|f| !f.is_reserved()) {
            if let Some(value) = field.resolve_number(&payload) {
                *bucket.entry(field.as_str().to_string()).or_insert(0.0) += value;
            }
        }
    }

    buckets
        .into_iter()
        .map(|(millis, mut values)| {
            // Sums that overflowed have no plottable value.
            values.retain(|_, v| v.is_finite());
            SeriesPoint {
                time: display_time(millis),
                values,
            }
        })
        .collect()
}

fn display_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|ts| ts.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(millis: i64, structured: &str) -> Event {
        Event {
            timestamp: DateTime::from_timestamp_millis(millis).unwrap(),
            tool: "agent".into(),
            topic: "metrics".into(),
            structured: structured.into(),
        }
    }

    fn field(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_collisions_sum_and_sort_ascending() {
        let events = vec![
            event(2000, r#"{"a":5}"#),
            event(1000, r#"{"a":1}"#),
            event(1000, r#"{"a":2}"#),
        ];
        let series = aggregate(&events, &[field("a")]);
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"time": "00:00:01", "a": 3.0},
                {"time": "00:00:02", "a": 5.0},
            ])
        );
    }

    #[test]
    fn test_missing_field_keeps_existing_sum() {
        let events = vec![
            event(0, r#"{"x":3}"#),
            event(0, r#"{"y":1}"#),
            event(0, r#"{"x":5}"#),
        ];
        let series = aggregate(&events, &[field("x"), field("y")]);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].get(&field("x")), Some(8.0));
        assert_eq!(series[0].get(&field("y")), Some(1.0));
    }

    #[test]
    fn test_numeric_strings_and_nested_paths() {
        let events = vec![
            event(500, r#"{"m":{"v":["1.5",{"w":2}]}}"#),
            event(500, r#"{"m":{"v":["0.5",{"w":"abc"}]}}"#),
        ];
        let series = aggregate(&events, &[field("m.v[0]"), field("m.v[1].w")]);
        assert_eq!(series[0].get(&field("m.v[0]")), Some(2.0));
        assert_eq!(series[0].get(&field("m.v[1].w")), Some(2.0));
    }

    #[test]
    fn test_malformed_payload_skipped_without_bucket() {
        let events = vec![event(1000, "garbage"), event(3000, r#"{"a":1}"#)];
        let series = aggregate(&events, &[field("a")]);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].time, "00:00:03");
    }

    #[test]
    fn test_event_without_selected_fields_still_gets_bucket() {
        let events = vec![event(1000, r#"{"b":1}"#)];
        let series = aggregate(&events, &[field("a")]);
        assert_eq!(series.len(), 1);
        assert!(series[0].values.is_empty());
    }

    #[test]
    fn test_same_second_different_millis_are_separate_buckets() {
        let events = vec![event(1000, r#"{"a":1}"#), event(1001, r#"{"a":1}"#)];
        let series = aggregate(&events, &[field("a")]);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].time, series[1].time);
    }

    #[test]
    fn test_time_field_never_overwrites_label() {
        let events = vec![event(1000, r#"{"time":5,"a":1}"#)];
        let series = aggregate(&events, &[field("time"), field("a")]);
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"[{"time":"00:00:01","a":1.0}]"#);
        let back: Vec<SeriesPoint> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn test_overflowing_sum_is_dropped() {
        let events = vec![
            event(1000, r#"{"a":1e308,"b":1}"#),
            event(1000, r#"{"a":1e308,"b":2}"#),
        ];
        let series = aggregate(&events, &[field("a"), field("b")]);
        assert_eq!(series[0].get(&field("a")), None);
        assert_eq!(series[0].get(&field("b")), Some(3.0));
    }

    #[test]
    fn test_display_time_is_utc_clock() {
        // 2023-11-14T22:13:20Z
        assert_eq!(display_time(1_700_000_000_000), "22:13:20");
    }
}
