//! Terminal tables for events and aggregated series.

use ev_core::{Event, FieldPath, SeriesPoint};
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

const PAYLOAD_WIDTH: usize = 80;

#[derive(Tabled)]
struct EventRow {
    time: String,
    tool: String,
    topic: String,
    structured: String,
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        Self {
            time: event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            tool: event.tool.clone(),
            topic: event.topic.clone(),
            structured: truncate(&event.structured, PAYLOAD_WIDTH),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn events_table(events: &[Event]) -> String {
    let mut table = Table::new(events.iter().map(EventRow::from));
    table.with(Style::rounded());
    table.to_string()
}

/// One row per bucket, one column per field. Missing values stay blank.
pub fn series_table(points: &[SeriesPoint], fields: &[FieldPath]) -> String {
    let mut builder = Builder::default();
    builder.push_record(std::iter::once("time".to_string()).chain(fields.iter().map(|f| f.to_string())));
    for point in points {
        let mut row = Vec::with_capacity(fields.len() + 1);
        row.push(point.time.clone());
        for field in fields {
            row.push(point.get(field).map(|v| v.to_string()).unwrap_or_default());
        }
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use ev_core::aggregate;

    fn event(ms: i64, structured: &str) -> Event {
        Event {
            timestamp: DateTime::from_timestamp_millis(ms).unwrap(),
            tool: "t".into(),
            topic: "x".into(),
            structured: structured.into(),
        }
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("ok", 5), "ok");
    }

    #[test]
    fn test_events_table_lists_every_event() {
        let out = events_table(&[event(1000, r#"{"a":1}"#), event(2000, "not json")]);
        assert!(out.contains("1970-01-01 00:00:01.000"));
        assert!(out.contains("not json"));
        assert!(out.contains("structured"));
    }

    #[test]
    fn test_series_table_blanks_missing_values() {
        let fields = vec![FieldPath::parse("a").unwrap(), FieldPath::parse("b").unwrap()];
        let points = aggregate(
            &[event(1000, r#"{"a":1,"b":2}"#), event(2000, r#"{"a":5}"#)],
            &fields,
        );
        let out = series_table(&points, &fields);
        let lines: Vec<&str> = out.lines().filter(|l| l.contains("00:00:0")).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains('1') && lines[0].contains('2'));
        assert!(lines[1].contains('5'));
    }
}
