// handlers/meals.rs - meal catalogue

use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{parse_id, InsertResult};
use crate::error::ApiError;
use crate::filter::{MealListParams, MealQuery};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::{Meal, MealType, NewMeal};
use crate::state::AppState;

/// Size of the home page strips (`/meals-six`, `/breakfast` ...).
const LATEST_COUNT: i64 = 6;

/// POST /post-meal
pub async fn create_meal(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewMeal>,
) -> ApiResult<InsertResult> {
    body.validate()?;
    let meal = body.into_meal(Uuid::new_v4(), Utc::now());
    tracing::info!("Posting {} meal '{}'", meal.meal_type, meal.title);

    let id = state.store.insert_meal(meal).await?;
    Ok(ApiResponse::success(InsertResult::inserted(id)))
}

/// GET /meals?offset&limit&filter&search
pub async fn list_meals(
    State(state): State<AppState>,
    Query(params): Query<MealListParams>,
) -> ApiResult<Vec<Meal>> {
    let query = MealQuery::from_params(&params, state.max_limit());
    Ok(ApiResponse::success(state.store.list_meals(&query).await?))
}

/// GET /meals-len
pub async fn count_meals(State(state): State<AppState>) -> ApiResult<Value> {
    let count = state.store.count_meals().await?;
    Ok(ApiResponse::success(json!({ "count": count })))
}

/// GET /meals-six
pub async fn latest_meals(State(state): State<AppState>) -> ApiResult<Vec<Meal>> {
    let query = MealQuery::latest(LATEST_COUNT.min(state.max_limit()));
    Ok(ApiResponse::success(state.store.list_meals(&query).await?))
}

async fn latest_of_type(state: &AppState, meal_type: MealType) -> ApiResult<Vec<Meal>> {
    let query = MealQuery::latest(LATEST_COUNT.min(state.max_limit())).with_type(meal_type);
    Ok(ApiResponse::success(state.store.list_meals(&query).await?))
}

/// GET /breakfast
pub async fn breakfast(State(state): State<AppState>) -> ApiResult<Vec<Meal>> {
    latest_of_type(&state, MealType::Breakfast).await
}

/// GET /lunch
pub async fn lunch(State(state): State<AppState>) -> ApiResult<Vec<Meal>> {
    latest_of_type(&state, MealType::Lunch).await
}

/// GET /dinner
pub async fn dinner(State(state): State<AppState>) -> ApiResult<Vec<Meal>> {
    latest_of_type(&state, MealType::Dinner).await
}

/// GET /details/:id
pub async fn meal_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Meal> {
    let id = parse_id("id", &id)?;
    state
        .store
        .find_meal(id)
        .await?
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found(format!("Meal {} not found", id)))
}
