use axum::{
    Json,
    extract::{Query, State},
};
use livescore_sdk::objects::AggregationResult;

use super::{ApiError, DateQuery};
use crate::state::AppState;

/// `GET /scores?date=YYYY-MM-DD` — the aggregated scoreboard for a date.
///
/// Failing sources degrade their own league group; the request itself only
/// fails on a bad date.
pub(super) async fn get_scores(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<AggregationResult>, ApiError> {
    let date = query.parse()?;
    Ok(Json(state.aggregator.build_result(date).await))
}
