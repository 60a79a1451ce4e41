use axum::{Json, extract::State};
use livescore_sdk::objects::HealthResponse;

use crate::state::AppState;

/// `GET /health` — health of every source, derived from fetch outcomes.
///
/// Always 200: this reports upstream health, not process liveness.
pub(super) async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        sources: state.aggregator.health_report().await,
    })
}
