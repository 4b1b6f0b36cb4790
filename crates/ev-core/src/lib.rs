//! # ev-core — The event model of eventscope
//!
//! Everything that is the same no matter which store an event came from:
//! the uniform [`Event`] record, the store-agnostic [`QueryFilter`], and the
//! charting pipeline that turns a batch of events into plottable series.
//!
//! Nothing in this crate performs I/O. The hub compiles filters into store
//! queries; the CLI drives the [`pager::Pager`] over HTTP.

pub mod fields;
pub mod filter;
pub mod pager;
pub mod series;
pub mod window;

pub use fields::{discover, FieldPath, FieldSelection};
pub use filter::{FilterError, FilterParams, QueryFilter, StoreKind, DEFAULT_LIMIT};
pub use series::{aggregate, SeriesPoint};
pub use window::WindowToken;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single time-stamped event, decoded identically from either store.
///
/// `structured` is kept as opaque text. It is usually a JSON document, but
/// nothing guarantees that; consumers parse it lazily and skip what fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub topic: String,
    pub structured: String,
}

impl Event {
    /// Parse the structured payload. `None` for malformed documents.
    pub fn payload(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.structured).ok()
    }
}
