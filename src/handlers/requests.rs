// handlers/requests.rs - meal requests

use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{join_with_meals, parse_id, DeleteResult, InsertResult};
use crate::filter::PageParams;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::NewMealRequest;
use crate::state::AppState;

/// POST /meals-request - one request per user and meal.
pub async fn create_request(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewMealRequest>,
) -> ApiResult<InsertResult> {
    body.validate()?;
    let request = body.into_request(Uuid::new_v4(), Utc::now());

    match state.store.insert_request(request).await? {
        Some(id) => Ok(ApiResponse::success(InsertResult::inserted(id))),
        None => Ok(ApiResponse::success(InsertResult::duplicate("Request Already Exists"))),
    }
}

/// GET /request-meals/:email - the user's requests merged with their meals.
pub async fn requests_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Vec<Map<String, Value>>> {
    let requests = state
        .store
        .requests_by_email(&email, params.page(state.max_limit()))
        .await?;
    let meal_ids = requests.iter().map(|r| r.rec_meal_id);
    let joined = join_with_meals(state.store.as_ref(), &requests, meal_ids, "recMealId").await?;
    Ok(ApiResponse::success(joined))
}

/// DELETE /cancel-req/:id
pub async fn cancel_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResult> {
    let id = parse_id("id", &id)?;
    let deleted_count = state.store.delete_request(id).await?;
    Ok(ApiResponse::success(DeleteResult { deleted_count }))
}
