//! # Query Resolution
//!
//! Turns a store-agnostic [`QueryFilter`] into a statement for one of the
//! two engines and runs it through the matching store adapter.
//!
//! - [`builder`] assembles the predicate sequence once and lets a
//!   [`builder::Dialect`] decide placeholder syntax and statement shape.
//! - [`facade`] picks the adapter, applies the timeout and normalizes errors.

pub mod builder;
pub mod facade;

use chrono::{DateTime, Utc};
use ev_core::{QueryFilter, StoreKind, DEFAULT_LIMIT};
use std::time::Duration;
use thiserror::Error;

/// A filter with its window pinned to an absolute lower bound.
///
/// Produced at query-issue time so that the same token always means
/// "the most recent N" relative to the moment of the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFilter {
    pub lower_bound: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub topic: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

impl ResolvedFilter {
    pub fn resolve(filter: &QueryFilter, now: DateTime<Utc>) -> Self {
        Self {
            lower_bound: filter.window.map(|w| w.lower_bound(now)),
            content: filter.content.clone().filter(|c| !c.is_empty()),
            topic: filter.topic.clone().filter(|t| !t.is_empty()),
            limit: if filter.limit == 0 {
                DEFAULT_LIMIT
            } else {
                filter.limit
            },
            offset: filter.offset,
        }
    }
}

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Timestamp(DateTime<Utc>),
    Text(String),
    Int(i64),
}

/// Statement text plus its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// The single failure shape the facade hands to callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("{store} query failed: {message}")]
    Adapter { store: StoreKind, message: String },
    #[error("{store} query timed out after {}ms", .timeout.as_millis())]
    Timeout { store: StoreKind, timeout: Duration },
}
