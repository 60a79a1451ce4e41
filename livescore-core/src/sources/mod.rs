//! Upstream providers.
//!
//! A [`SourceAdapter`] turns one provider's feed into the uniform event
//! model. The aggregator only ever sees this trait; provider wire formats
//! stay behind it.

mod http_json;

use async_trait::async_trait;
use livescore_sdk::objects::{Event, EventDetail};
use thiserror::Error;
use time::Date;

use crate::rate_limit::DomainRateLimiter;

pub use http_json::HttpJsonSource;

/// Errors returned by a source adapter.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Retryable failure reported by the adapter itself.
    #[error("transient upstream failure: {message}")]
    Transient { message: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// The payload no longer matches the expected schema.
    #[error("unexpected upstream payload: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("event not found")]
    NotFound,
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transient { .. } | FetchError::Http(_) => true,
            FetchError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            FetchError::Shape(_) | FetchError::InvalidUrl(_) | FetchError::NotFound => false,
        }
    }
}

/// One upstream provider.
///
/// Implementations must route every outbound request through the given
/// limiter so per-host intervals hold across all sources sharing a host.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable id; used as the league group id.
    fn id(&self) -> &str;

    /// Human-readable league name.
    fn name(&self) -> &str;

    /// All events on `date`.
    async fn fetch_events(
        &self,
        date: Date,
        limiter: &DomainRateLimiter,
    ) -> Result<Vec<Event>, FetchError>;

    /// Full detail for the event with id `id`.
    async fn fetch_event_detail(
        &self,
        id: &str,
        limiter: &DomainRateLimiter,
    ) -> Result<EventDetail, FetchError>;
}
