//! # Query Builder
//!
//! One predicate-assembly sequence, two engines:
//!
//! ```text
//! SELECT <ts_ms>, tool, topic, <structured> FROM <table> WHERE 1=1
//!   [AND timestamp >= <bound>]
//!   [AND <structured contains content>]
//!   [AND topic = <topic>]
//! ORDER BY timestamp DESC LIMIT <limit> [OFFSET <offset>]
//! ```
//!
//! The columnar engine takes positional `?` placeholders and gets limit and
//! offset written into the statement text. Those two are unsigned integers
//! straight out of the filter parser, never user text, and are the only
//! values ever interpolated. The relational engine numbers its placeholders
//! `$1, $2, …` and binds limit and offset like any other parameter.

use super::{BindValue, CompiledQuery, ResolvedFilter};
use std::fmt::Write;

/// Engine-specific syntax plugged into the shared assembly sequence.
pub trait Dialect {
    /// Placeholder for the `position`-th (1-based) bound parameter.
    fn placeholder(&self, position: usize) -> String;

    /// Select-list expression yielding the timestamp as epoch milliseconds.
    fn timestamp_millis(&self) -> &'static str;

    /// The structured column as text.
    fn structured_text(&self) -> &'static str;

    /// `timestamp >= …` given the placeholder of the bound instant.
    fn lower_bound(&self, placeholder: &str) -> String;

    /// Case-sensitive, unanchored substring test on the structured text.
    fn contains(&self, placeholder: &str) -> String;

    /// Whether LIMIT/OFFSET are bound (`true`) or written inline (`false`).
    fn binds_pagination(&self) -> bool;
}

/// ClickHouse.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarDialect;

impl Dialect for ColumnarDialect {
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn timestamp_millis(&self) -> &'static str {
        "toUnixTimestamp64Milli(toDateTime64(timestamp, 3))"
    }

    fn structured_text(&self) -> &'static str {
        "structured"
    }

    fn lower_bound(&self, placeholder: &str) -> String {
        format!("timestamp >= fromUnixTimestamp64Milli(toInt64({placeholder}))")
    }

    fn contains(&self, placeholder: &str) -> String {
        format!("position(structured, {placeholder}) > 0")
    }

    fn binds_pagination(&self) -> bool {
        false
    }
}

/// PostgreSQL. `structured` may be `jsonb`, so it is cast to text both for
/// matching and for the select list.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationalDialect;

impl Dialect for RelationalDialect {
    fn placeholder(&self, position: usize) -> String {
        format!("${position}")
    }

    fn timestamp_millis(&self) -> &'static str {
        "FLOOR(EXTRACT(EPOCH FROM timestamp) * 1000)::BIGINT"
    }

    fn structured_text(&self) -> &'static str {
        "structured::text"
    }

    fn lower_bound(&self, placeholder: &str) -> String {
        format!("timestamp >= {placeholder}")
    }

    fn contains(&self, placeholder: &str) -> String {
        format!("strpos(structured::text, {placeholder}) > 0")
    }

    fn binds_pagination(&self) -> bool {
        true
    }
}

/// Compiles a [`ResolvedFilter`] against `table` in dialect `D`.
pub struct QueryBuilder<'a, D> {
    dialect: D,
    table: &'a str,
    sql: String,
    binds: Vec<BindValue>,
}

impl<'a, D: Dialect> QueryBuilder<'a, D> {
    /// `table` must already be a validated identifier.
    pub fn new(dialect: D, table: &'a str) -> Self {
        Self {
            dialect,
            table,
            sql: String::new(),
            binds: Vec::new(),
        }
    }

    pub fn compile(mut self, filter: &ResolvedFilter) -> CompiledQuery {
        let _ = write!(
            self.sql,
            "SELECT {} AS ts_ms, tool, topic, {} AS structured FROM {} WHERE 1=1",
            self.dialect.timestamp_millis(),
            self.dialect.structured_text(),
            self.table,
        );

        if let Some(bound) = filter.lower_bound {
            let ph = self.bind(BindValue::Timestamp(bound));
            let predicate = self.dialect.lower_bound(&ph);
            self.and(&predicate);
        }
        if let Some(content) = &filter.content {
            let ph = self.bind(BindValue::Text(content.clone()));
            let predicate = self.dialect.contains(&ph);
            self.and(&predicate);
        }
        if let Some(topic) = &filter.topic {
            let ph = self.bind(BindValue::Text(topic.clone()));
            self.and(&format!("topic = {ph}"));
        }

        self.sql.push_str(" ORDER BY timestamp DESC");

        if self.dialect.binds_pagination() {
            let ph = self.bind(BindValue::Int(i64::from(filter.limit)));
            let _ = write!(self.sql, " LIMIT {ph}");
            if filter.offset > 0 {
                let offset = i64::try_from(filter.offset).unwrap_or(i64::MAX);
                let ph = self.bind(BindValue::Int(offset));
                let _ = write!(self.sql, " OFFSET {ph}");
            }
        } else {
            let _ = write!(self.sql, " LIMIT {}", filter.limit);
            if filter.offset > 0 {
                let _ = write!(self.sql, " OFFSET {}", filter.offset);
            }
        }

        CompiledQuery {
            sql: self.sql,
            binds: self.binds,
        }
    }

    /// Record a bind value and return its placeholder.
    fn bind(&mut self, value: BindValue) -> String {
        self.binds.push(value);
        self.dialect.placeholder(self.binds.len())
    }

    fn and(&mut self, predicate: &str) {
        self.sql.push_str(" AND ");
        self.sql.push_str(predicate);
    }
}

/// Compile for whichever store `D` targets; shorthand used by the adapters.
pub fn compile<D: Dialect>(dialect: D, table: &str, filter: &ResolvedFilter) -> CompiledQuery {
    QueryBuilder::new(dialect, table).compile(filter)
}
