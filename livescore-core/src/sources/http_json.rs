//! Adapter for providers that already publish the uniform event model as
//! JSON.

use std::time::Duration;

use async_trait::async_trait;
use livescore_sdk::objects::{Event, EventDetail, iso_date};
use serde::de::DeserializeOwned;
use time::Date;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use super::{FetchError, SourceAdapter};
use crate::config::SourceConfig;
use crate::rate_limit::DomainRateLimiter;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source backed by `GET {base_url}events?date=YYYY-MM-DD` and
/// `GET {base_url}events/{id}`.
pub struct HttpJsonSource {
    id: String,
    name: String,
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpJsonSource {
    pub fn new(config: &SourceConfig) -> Self {
        Self::with_http_client(
            config,
            reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        )
    }

    pub fn with_http_client(config: &SourceConfig, http_client: reqwest::Client) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            base_url: config.base_url.clone(),
            http_client,
        }
    }

    fn events_url(&self, date: Date) -> Result<Url, FetchError> {
        let mut url = self.base_url.join("events")?;
        url.query_pairs_mut()
            .append_pair("date", &iso_date::format(date));
        Ok(url)
    }

    fn detail_url(&self, id: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.join("events/")?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Throttle, send, check the status and decode the body. Every call is
    /// logged with its URL, duration and outcome.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        limiter: &DomainRateLimiter,
    ) -> Result<T, FetchError> {
        limiter.throttle(&url).await;

        let started = Instant::now();
        let result = self.send(&url).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => debug!(source = %self.id, %url, elapsed_ms, "Upstream fetch succeeded"),
            Err(e) => warn!(source = %self.id, %url, elapsed_ms, error = %e, "Upstream fetch failed"),
        }
        result
    }

    async fn send<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let response = self.http_client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl SourceAdapter for HttpJsonSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_events(
        &self,
        date: Date,
        limiter: &DomainRateLimiter,
    ) -> Result<Vec<Event>, FetchError> {
        let url = self.events_url(date)?;
        match self.get_json(url, limiter).await {
            Err(FetchError::Shape(e)) => {
                warn!(source = %self.id, %date, error = %e, "Upstream schema changed, returning no events");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn fetch_event_detail(
        &self,
        id: &str,
        limiter: &DomainRateLimiter,
    ) -> Result<EventDetail, FetchError> {
        let url = self.detail_url(id)?;
        match self.get_json(url, limiter).await {
            Err(FetchError::Status { status: 404, .. }) => Err(FetchError::NotFound),
            other => other,
        }
    }
}
