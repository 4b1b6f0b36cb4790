//! # Store Adapters
//!
//! Every backing store implements [`StoreAdapter`]: compile a
//! [`ResolvedFilter`] in its own dialect, run it on the connection handle it
//! was constructed with, and decode rows into the uniform [`Event`].
//!
//! Both adapters select the same four columns, aliased identically, with the
//! timestamp already reduced to epoch milliseconds. Decoding is therefore
//! shared and identical rows decode to identical events.

pub mod clickhouse;
pub mod postgres;

use crate::query::ResolvedFilter;
use chrono::DateTime;
use ev_core::{Event, StoreKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("clickhouse: {0}")]
    ClickHouse(#[from] ::clickhouse::error::Error),
    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),
    #[error("row has out-of-range timestamp {0}ms")]
    InvalidTimestamp(i64),
    #[error("{0}")]
    Backend(String),
}

/// A queryable event store.
#[async_trait::async_trait]
pub trait StoreAdapter: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Run the filter. Rows come back ordered by timestamp, newest first.
    async fn fetch(&self, filter: &ResolvedFilter) -> Result<Vec<Event>, StoreError>;

    /// Cheap round trip used for connectivity reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Build an [`Event`] from the shared select list.
pub(crate) fn decode_event(
    ts_ms: i64,
    tool: String,
    topic: String,
    structured: String,
) -> Result<Event, StoreError> {
    let timestamp =
        DateTime::from_timestamp_millis(ts_ms).ok_or(StoreError::InvalidTimestamp(ts_ms))?;
    Ok(Event {
        timestamp,
        tool,
        topic,
        structured,
    })
}
