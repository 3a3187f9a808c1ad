// handlers/users.rs - user registration, listing and roles

use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{parse_id, InsertResult};
use crate::error::ApiError;
use crate::filter::PageParams;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::{NewUser, UpdateOutcome, User};
use crate::state::AppState;

/// POST /new-user - register a user unless the email is already known.
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult<InsertResult> {
    body.validate()?;
    let user = body.into_user(Uuid::new_v4(), Utc::now());
    let email = user.user_email.clone();

    match state.store.insert_user(user).await? {
        Some(id) => {
            tracing::info!("Registered user {}", email);
            Ok(ApiResponse::success(InsertResult::inserted(id)))
        }
        None => Ok(ApiResponse::success(InsertResult::duplicate("User Already Exists"))),
    }
}

/// GET /users (session required)
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Vec<User>> {
    let users = state.store.list_users(params.page(state.max_limit())).await?;
    Ok(ApiResponse::success(users))
}

/// GET /user/admin/:email - `{admin: bool}`; unknown users are not admins.
pub async fn is_admin(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Value> {
    let admin = state
        .store
        .find_user_by_email(&email)
        .await?
        .is_some_and(|user| user.is_admin());
    Ok(ApiResponse::success(json!({ "admin": admin })))
}

#[derive(Debug, Deserialize)]
pub struct RoleChangeParams {
    pub role: Option<String>,
    pub id: Option<String>,
}

/// PATCH /change-user-role?role=..&id=.. (session required)
pub async fn change_role(
    State(state): State<AppState>,
    Query(params): Query<RoleChangeParams>,
) -> ApiResult<UpdateOutcome> {
    let role = params
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::invalid_field("role", "Role is required"))?;
    let id = params
        .id
        .as_deref()
        .ok_or_else(|| ApiError::invalid_field("id", "User id is required"))
        .and_then(|raw| parse_id("id", raw))?;

    let outcome = state.store.set_user_role(id, role).await?;
    tracing::info!("Role of user {} set to {} (modified: {})", id, role, outcome.modified_count);
    Ok(ApiResponse::success(outcome))
}
