// handlers/likes.rs - PUT /like-count, GET /liked-count

use axum::extract::{Query, State};
use serde::Deserialize;

use super::parse_id;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::{LikeOutcome, LikeUpdate};
use crate::state::AppState;

pub async fn update_like(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LikeUpdate>,
) -> ApiResult<LikeOutcome> {
    body.validate()?;
    let outcome = state.store.apply_like(&body).await?;
    if outcome.matched_count == 0 {
        tracing::warn!("Like recorded for unknown meal {}", body.id);
    }
    Ok(ApiResponse::success(outcome))
}

#[derive(Debug, Deserialize)]
pub struct LikedParams {
    pub id: Option<String>,
    pub email: Option<String>,
}

/// Whether `email` currently likes meal `id`; false when never liked.
pub async fn liked(
    State(state): State<AppState>,
    Query(params): Query<LikedParams>,
) -> ApiResult<bool> {
    let id = params
        .id
        .as_deref()
        .ok_or_else(|| ApiError::invalid_field("id", "Meal id is required"))
        .and_then(|raw| parse_id("id", raw))?;
    let email = params
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::invalid_field("email", "Email is required"))?;

    let like = state.store.find_like(email, id).await?;
    Ok(ApiResponse::success(like.is_some_and(|l| l.liked)))
}
