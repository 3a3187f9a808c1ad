// handlers/reviews.rs - meal reviews and rating summaries

use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{join_with_meals, parse_id, DeleteResult, InsertResult};
use crate::filter::PageParams;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::{NewReview, RatingSummary, Review, ReviewUpdate, UpdateOutcome};
use crate::state::AppState;

/// POST /post-review
pub async fn create_review(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewReview>,
) -> ApiResult<InsertResult> {
    body.validate()?;
    let review = body.into_review(Uuid::new_v4(), Utc::now());
    let id = state.store.insert_review(review).await?;
    Ok(ApiResponse::success(InsertResult::inserted(id)))
}

/// PUT /review-update/:id - merge the given fields into the review.
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ReviewUpdate>,
) -> ApiResult<UpdateOutcome> {
    let id = parse_id("id", &id)?;
    body.validate()?;
    Ok(ApiResponse::success(state.store.update_review(id, body).await?))
}

/// GET /read-my-review/:email - the author's reviews, each merged with its meal.
pub async fn reviews_by_author(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Vec<Map<String, Value>>> {
    let reviews = state
        .store
        .reviews_by_author(&email, params.page(state.max_limit()))
        .await?;
    let meal_ids = reviews.iter().map(|r| r.post_id);
    let joined = join_with_meals(state.store.as_ref(), &reviews, meal_ids, "postId").await?;
    Ok(ApiResponse::success(joined))
}

/// GET /read-review/:id - reviews of one meal, newest first.
pub async fn reviews_for_meal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Vec<Review>> {
    let post_id = parse_id("id", &id)?;
    let reviews = state
        .store
        .reviews_for_meal(post_id, params.page(state.max_limit()))
        .await?;
    Ok(ApiResponse::success(reviews))
}

/// DELETE /delete-review/:id
pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResult> {
    let id = parse_id("id", &id)?;
    let deleted_count = state.store.delete_review(id).await?;
    Ok(ApiResponse::success(DeleteResult { deleted_count }))
}

/// GET /sum-of-rating/:id
pub async fn rating_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<RatingSummary> {
    let post_id = parse_id("id", &id)?;
    Ok(ApiResponse::success(state.store.rating_summary(post_id).await?))
}
