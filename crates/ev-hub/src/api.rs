//! # API Handlers
//!
//! Axum handlers for the event browser: the filtered event listing, store
//! connectivity and the JSON 404 for unknown API paths.

use crate::query::QueryError;
use crate::AppState;
use axum::{
    extract::{OriginalUri, Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    Json,
};
use ev_core::{Event, FilterParams, QueryFilter, StoreKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn reject(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
}

impl From<QueryError> for (StatusCode, Json<ApiError>) {
    fn from(err: QueryError) -> Self {
        reject(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub count: usize,
    pub params: QueryFilter,
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> ApiResult<EventsResponse> {
    let request_id = uuid::Uuid::new_v4();
    fetch_events(&state, params)
        .instrument(tracing::info_span!("events", %request_id))
        .await
}

async fn fetch_events(state: &AppState, params: FilterParams) -> ApiResult<EventsResponse> {
    let filter = params.into_filter().map_err(|e| {
        tracing::warn!("rejected filter: {}", e);
        reject(StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let events = state.facade.resolve(&filter).await?;
    Ok(Json(EventsResponse {
        count: events.len(),
        events,
        params: filter,
    }))
}

// =============================================================================
// Health & Stats
// =============================================================================

pub async fn health(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "path": uri.path(),
    }))
}

#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub columnar: String,
    pub relational: String,
}

fn connectivity(result: Result<(), QueryError>) -> String {
    match result {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    }
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StoreStats> {
    let (columnar, relational) = tokio::join!(
        state.facade.probe(StoreKind::Columnar),
        state.facade.probe(StoreKind::Relational),
    );
    Json(StoreStats {
        columnar: connectivity(columnar),
        relational: connectivity(relational),
    })
}

// =============================================================================
// Fallback
// =============================================================================

/// Paths are reported as requested, `/api` prefix included.
pub async fn api_not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "API endpoint not found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::facade::QueryFacade;
    use crate::query::ResolvedFilter;
    use crate::stores::{StoreAdapter, StoreError};
    use chrono::DateTime;
    use std::time::Duration;

    struct FixedStore {
        kind: StoreKind,
        events: Vec<Event>,
    }

    #[async_trait::async_trait]
    impl StoreAdapter for FixedStore {
        fn kind(&self) -> StoreKind {
            self.kind
        }

        async fn fetch(&self, filter: &ResolvedFilter) -> Result<Vec<Event>, StoreError> {
            Ok(self
                .events
                .iter()
                .skip(filter.offset as usize)
                .take(filter.limit as usize)
                .cloned()
                .collect())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            match self.kind {
                StoreKind::Columnar => Ok(()),
                StoreKind::Relational => Err(StoreError::Backend("pool timed out".into())),
            }
        }
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl StoreAdapter for FailingStore {
        fn kind(&self) -> StoreKind {
            StoreKind::Relational
        }

        async fn fetch(&self, _filter: &ResolvedFilter) -> Result<Vec<Event>, StoreError> {
            Err(StoreError::Backend("boom".into()))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Backend("boom".into()))
        }
    }

    fn sample(n: i64) -> Event {
        Event {
            timestamp: DateTime::from_timestamp(1_700_000_000 - n, 0).unwrap(),
            tool: "agent".into(),
            topic: "cpu".into(),
            structured: format!(r#"{{"n":{n}}}"#),
        }
    }

    fn state() -> Arc<AppState> {
        let columnar = Arc::new(FixedStore {
            kind: StoreKind::Columnar,
            events: (0..5).map(sample).collect(),
        });
        let relational = Arc::new(FixedStore {
            kind: StoreKind::Relational,
            events: Vec::new(),
        });
        Arc::new(AppState {
            facade: QueryFacade::new(columnar, relational, Duration::from_secs(5)),
        })
    }

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        let mut p = FilterParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "timeRange" => p.time_range = v,
                "database" => p.database = v,
                "limit" => p.limit = v,
                "offset" => p.offset = v,
                _ => unreachable!(),
            }
        }
        p
    }

    #[tokio::test]
    async fn test_list_events_echoes_normalized_params() {
        let Json(body) = list_events(
            State(state()),
            Query(params(&[("limit", "2"), ("offset", "1"), ("database", "clickhouse")])),
        )
        .await
        .unwrap();

        assert_eq!(body.count, 2);
        assert_eq!(body.events[0], sample(1));
        assert_eq!(body.params.store, StoreKind::Columnar);
        assert_eq!(body.params.limit, 2);
        assert_eq!(body.params.offset, 1);
    }

    #[tokio::test]
    async fn test_list_events_rejects_bad_params() {
        let (status, Json(body)) =
            list_events(State(state()), Query(params(&[("database", "mongo")])))
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("mongo"));

        let (status, _) = list_events(State(state()), Query(params(&[("limit", "ten")])))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_events_surfaces_store_failure() {
        let state = Arc::new(AppState {
            facade: QueryFacade::new(
                Arc::new(FixedStore {
                    kind: StoreKind::Columnar,
                    events: Vec::new(),
                }),
                Arc::new(FailingStore),
                Duration::from_secs(5),
            ),
        });
        let (status, Json(body)) =
            list_events(State(state), Query(params(&[("database", "relational")])))
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "relational query failed: boom");
    }

    #[tokio::test]
    async fn test_stats_reports_each_store() {
        let Json(stats) = stats(State(state())).await;
        assert_eq!(stats.columnar, "connected");
        assert!(stats.relational.starts_with("error: "));
        assert!(stats.relational.contains("pool timed out"));
    }
}
