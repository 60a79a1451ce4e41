//! Point-in-time REST client.

use reqwest::Client;
use time::Date;
use url::Url;

use super::ClientError;
use crate::objects::{AggregationResult, EventDetail, HealthResponse, iso_date};

/// Typed HTTP client for the snapshot endpoints.
#[derive(Debug, Clone)]
pub struct ScoresClient {
    http: Client,
    base_url: Url,
}

impl ScoresClient {
    /// Create a new `ScoresClient`.
    ///
    /// * `base_url` – root URL of the livescore server (e.g. `http://localhost:8080`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /scores?date=YYYY-MM-DD` – the aggregated scoreboard for a date.
    pub async fn get_scores(&self, date: Date) -> Result<AggregationResult, ClientError> {
        let mut url = self.base_url.join("/scores")?;
        url.query_pairs_mut()
            .append_pair("date", &iso_date::format(date));

        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /events/{source}/{id}` – full detail for one event.
    pub async fn get_event_detail(
        &self,
        source: &str,
        event_id: &str,
    ) -> Result<EventDetail, ClientError> {
        let url = self.base_url.join(&format!("/events/{source}/{event_id}"))?;

        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /health` – per-source health report.
    pub async fn get_health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.base_url.join("/health")?;

        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
