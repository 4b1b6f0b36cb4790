//! # Relational Store (PostgreSQL)
//!
//! Runs compiled statements on a shared `sqlx` pool. Placeholders are
//! numbered and every value, limit and offset included, is bound.

use super::{decode_event, StoreAdapter, StoreError};
use crate::query::builder::{compile, RelationalDialect};
use crate::query::{BindValue, ResolvedFilter};
use ev_core::{Event, StoreKind};
use futures_util::TryStreamExt;
use sqlx::postgres::PgPool;
use sqlx::Row;

pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

impl PostgresStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

#[async_trait::async_trait]
impl StoreAdapter for PostgresStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Relational
    }

    async fn fetch(&self, filter: &ResolvedFilter) -> Result<Vec<Event>, StoreError> {
        let compiled = compile(RelationalDialect, &self.table, filter);
        tracing::debug!(sql = %compiled.sql, binds = compiled.binds.len(), "relational query");

        let mut query = sqlx::query(&compiled.sql);
        for value in compiled.binds {
            query = match value {
                BindValue::Timestamp(ts) => query.bind(ts),
                BindValue::Text(text) => query.bind(text),
                BindValue::Int(n) => query.bind(n),
            };
        }

        let mut rows = query.fetch(&self.pool);
        let mut events = Vec::with_capacity(filter.limit as usize);
        while let Some(row) = rows.try_next().await? {
            events.push(decode_event(
                row.try_get("ts_ms")?,
                row.try_get("tool")?,
                row.try_get("topic")?,
                row.try_get("structured")?,
            )?);
        }

        tracing::debug!(rows = events.len(), "relational rows decoded");
        Ok(events)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
