//! HTTP client for the hub's `/api/events` endpoint.

use ev_core::{Event, QueryFilter};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("hub returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Deserialize)]
struct EventsBody {
    events: Vec<Event>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct EventsClient {
    http: reqwest::Client,
    base_url: String,
}

impl EventsClient {
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn events_url(&self) -> String {
        format!("{}/api/events", self.base_url)
    }

    /// Fetch the single page described by `filter`.
    pub async fn fetch_page(&self, filter: &QueryFilter) -> Result<Vec<Event>, ClientError> {
        let resp = self
            .http
            .get(self.events_url())
            .query(&filter.to_query_pairs())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string(),
            };
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<EventsBody>().await?.events)
    }
}
