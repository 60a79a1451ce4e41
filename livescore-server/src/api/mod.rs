//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `GET /health`                – per-source health report
//! - `GET /scores?date=`          – aggregated scoreboard for a date
//! - `GET /live-stream?date=`     – WebSocket live update stream
//! - `GET /events/{source}/{id}`  – full detail for one event

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use livescore_core::processors::DetailError;
use livescore_core::sources::FetchError;
use livescore_sdk::objects::iso_date;
use serde::Deserialize;
use time::Date;

use crate::state::AppState;

mod events;
mod health;
mod live;
mod scores;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::get_health))
        .route("/scores", get(scores::get_scores))
        .route("/live-stream", get(live::live_stream))
        .route("/events/{source}/{id}", get(events::get_event_detail))
}

/// `?date=YYYY-MM-DD` query parameter.
#[derive(Debug, Deserialize)]
struct DateQuery {
    date: Option<String>,
}

impl DateQuery {
    fn parse(&self) -> Result<Date, ApiError> {
        let raw = self
            .date
            .as_deref()
            .ok_or_else(|| ApiError::BadDate("missing date parameter".into()))?;
        iso_date::parse(raw).map_err(|_| ApiError::BadDate(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
    }
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in API handlers.
#[derive(Debug)]
enum ApiError {
    /// The `date` parameter is missing or malformed.
    BadDate(String),
    /// No configured source has this id.
    UnknownSource(String),
    /// The source does not know the event.
    EventNotFound,
    /// The upstream fetch failed after retries.
    Upstream(FetchError),
}

impl From<DetailError> for ApiError {
    fn from(e: DetailError) -> Self {
        match e {
            DetailError::UnknownSource(source) => ApiError::UnknownSource(source),
            DetailError::Fetch(FetchError::NotFound) => ApiError::EventNotFound,
            DetailError::Fetch(e) => ApiError::Upstream(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::BadDate(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::UnknownSource(source) => {
                (StatusCode::NOT_FOUND, format!("unknown source {source}")).into_response()
            }
            ApiError::EventNotFound => (StatusCode::NOT_FOUND, "event not found").into_response(),
            ApiError::Upstream(e) => {
                tracing::warn!(error = %e, "Event detail fetch failed");
                (StatusCode::BAD_GATEWAY, "upstream source unavailable").into_response()
            }
        }
    }
}
