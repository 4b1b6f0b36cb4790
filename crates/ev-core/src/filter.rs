//! # Query Filter
//!
//! The store-agnostic description of "which events": time window, content
//! substring, exact topic, target store and the page to return.
//!
//! [`FilterParams`] is the raw, stringly-typed form received over HTTP;
//! [`FilterParams::into_filter`] validates it and applies defaults. Limit
//! and offset leave this module as unsigned integers, which is what allows
//! the columnar dialect to interpolate them into statement text.

use crate::window::WindowToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Page size used when the caller asks for nothing, zero, or a negative limit.
pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown database '{0}' (expected columnar or relational)")]
    UnknownStore(String),
    #[error("invalid {field} '{value}': expected an integer")]
    InvalidInteger { field: &'static str, value: String },
}

/// Which backing store a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// ClickHouse.
    #[default]
    Columnar,
    /// PostgreSQL.
    Relational,
}

impl StoreKind {
    /// Accepts both the role names and the engine names.
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "columnar" | "clickhouse" => Ok(Self::Columnar),
            "relational" | "postgresql" | "postgres" => Ok(Self::Relational),
            other => Err(FilterError::UnknownStore(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Columnar => "columnar",
            Self::Relational => "relational",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw query-string parameters of `GET /api/events`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub time_range: Option<String>,
    pub content: Option<String>,
    pub topic: Option<String>,
    pub database: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl FilterParams {
    /// Validate and normalize into a [`QueryFilter`].
    pub fn into_filter(self) -> Result<QueryFilter, FilterError> {
        let store = match non_blank(self.database) {
            Some(raw) => StoreKind::parse(&raw)?,
            None => StoreKind::default(),
        };

        let limit = match non_blank(self.limit) {
            Some(raw) => parse_int("limit", &raw)?,
            None => 0,
        };
        let offset = match non_blank(self.offset) {
            Some(raw) => parse_int("offset", &raw)?,
            None => 0,
        };

        Ok(QueryFilter {
            window: non_empty(self.time_range).map(|t| WindowToken::parse(&t)),
            content: non_empty(self.content),
            topic: non_empty(self.topic),
            store,
            limit: normalize_limit(limit),
            offset: offset.max(0) as u64,
        })
    }
}

/// A validated, defaulted filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    #[serde(rename = "timeRange", skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(rename = "database")]
    pub store: StoreKind,
    pub limit: u32,
    pub offset: u64,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            window: None,
            content: None,
            topic: None,
            store: StoreKind::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl QueryFilter {
    pub fn new(store: StoreKind) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn with_window(mut self, window: WindowToken) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into()).filter(|c: &String| !c.is_empty());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// Set the page. A zero limit is replaced with [`DEFAULT_LIMIT`].
    pub fn page(mut self, limit: u32, offset: u64) -> Self {
        self.limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        self.offset = offset;
        self
    }

    /// Encode back into `/api/events` query-string pairs.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(6);
        if let Some(window) = self.window {
            pairs.push(("timeRange", window.as_str().to_string()));
        }
        if let Some(content) = &self.content {
            pairs.push(("content", content.clone()));
        }
        if let Some(topic) = &self.topic {
            pairs.push(("topic", topic.clone()));
        }
        pairs.push(("database", self.store.as_str().to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("offset", self.offset.to_string()));
        pairs
    }
}

/// Text filters are literal: only the empty string means "not requested".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_int(field: &'static str, raw: &str) -> Result<i64, FilterError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| FilterError::InvalidInteger {
            field,
            value: raw.to_string(),
        })
}

fn normalize_limit(limit: i64) -> u32 {
    if limit <= 0 {
        DEFAULT_LIMIT
    } else {
        u32::try_from(limit).unwrap_or(u32::MAX)
    }
}
