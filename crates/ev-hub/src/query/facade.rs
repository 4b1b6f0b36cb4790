//! # Query Facade
//!
//! Single entry point for event queries. Resolves the window at call time,
//! dispatches to the adapter for the requested store and bounds the call
//! with a fixed timeout. Any failure comes back as one [`QueryError`] and
//! zero events: no retries, no partial pages.

use super::{QueryError, ResolvedFilter};
use crate::stores::StoreAdapter;
use chrono::Utc;
use ev_core::{Event, QueryFilter, StoreKind};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct QueryFacade {
    columnar: Arc<dyn StoreAdapter>,
    relational: Arc<dyn StoreAdapter>,
    timeout: Duration,
}

impl QueryFacade {
    pub fn new(
        columnar: Arc<dyn StoreAdapter>,
        relational: Arc<dyn StoreAdapter>,
        timeout: Duration,
    ) -> Self {
        debug_assert_eq!(columnar.kind(), StoreKind::Columnar);
        debug_assert_eq!(relational.kind(), StoreKind::Relational);
        Self {
            columnar,
            relational,
            timeout,
        }
    }

    fn adapter(&self, store: StoreKind) -> &Arc<dyn StoreAdapter> {
        match store {
            StoreKind::Columnar => &self.columnar,
            StoreKind::Relational => &self.relational,
        }
    }

    /// Fetch one page of events for `filter`.
    pub async fn resolve(&self, filter: &QueryFilter) -> Result<Vec<Event>, QueryError> {
        let store = filter.store;
        let resolved = ResolvedFilter::resolve(filter, Utc::now());
        tracing::info!(
            %store,
            window = ?filter.window,
            content = ?resolved.content,
            topic = ?resolved.topic,
            limit = resolved.limit,
            offset = resolved.offset,
            "resolving query"
        );

        let start = Instant::now();
        let outcome =
            tokio::time::timeout(self.timeout, self.adapter(store).fetch(&resolved)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(events)) => {
                tracing::info!(%store, count = events.len(), elapsed_ms, "query succeeded");
                Ok(events)
            }
            Ok(Err(e)) => {
                tracing::error!(%store, elapsed_ms, "query failed: {}", e);
                Err(QueryError::Adapter {
                    store,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                tracing::error!(%store, elapsed_ms, "query timed out");
                Err(QueryError::Timeout {
                    store,
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Connectivity check for one store, under the same timeout.
    pub async fn probe(&self, store: StoreKind) -> Result<(), QueryError> {
        match tokio::time::timeout(self.timeout, self.adapter(store).ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(QueryError::Adapter {
                store,
                message: e.to_string(),
            }),
            Err(_) => Err(QueryError::Timeout {
                store,
                timeout: self.timeout,
            }),
        }
    }
}
