use axum::{
    Json,
    extract::{Path, State},
};
use livescore_sdk::objects::EventDetail;

use super::ApiError;
use crate::state::AppState;

/// `GET /events/{source}/{id}` — full detail for one event.
pub(super) async fn get_event_detail(
    State(state): State<AppState>,
    Path((source, id)): Path<(String, String)>,
) -> Result<Json<EventDetail>, ApiError> {
    let detail = state.aggregator.event_detail(&source, &id).await?;
    Ok(Json(detail))
}
