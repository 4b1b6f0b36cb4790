//! # Columnar Store (ClickHouse)
//!
//! Runs compiled statements over the HTTP interface with the `clickhouse`
//! client. Placeholders are `?`; the client escapes each bound value into
//! the statement server-side-safe before sending.

use super::{decode_event, StoreAdapter, StoreError};
use crate::query::builder::{compile, ColumnarDialect};
use crate::query::{BindValue, ResolvedFilter};
use clickhouse::{Client, Row};
use ev_core::{Event, StoreKind};
use serde::Deserialize;

#[derive(Debug, Row, Deserialize)]
struct EventRow {
    ts_ms: i64,
    tool: String,
    topic: String,
    structured: String,
}

pub struct ClickHouseStore {
    client: Client,
    table: String,
}

impl ClickHouseStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait::async_trait]
impl StoreAdapter for ClickHouseStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Columnar
    }

    async fn fetch(&self, filter: &ResolvedFilter) -> Result<Vec<Event>, StoreError> {
        let compiled = compile(ColumnarDialect, &self.table, filter);
        tracing::debug!(sql = %compiled.sql, binds = compiled.binds.len(), "columnar query");

        let mut query = self.client.query(&compiled.sql);
        for value in compiled.binds {
            query = match value {
                // Bound as epoch millis; the statement converts back with
                // fromUnixTimestamp64Milli.
                BindValue::Timestamp(ts) => query.bind(ts.timestamp_millis()),
                BindValue::Text(text) => query.bind(text),
                BindValue::Int(n) => query.bind(n),
            };
        }

        let rows = query.fetch_all::<EventRow>().await?;
        tracing::debug!(rows = rows.len(), "columnar rows decoded");

        rows.into_iter()
            .map(|row| decode_event(row.ts_ms, row.tool, row.topic, row.structured))
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client.query("SELECT 1").execute().await?;
        Ok(())
    }
}
