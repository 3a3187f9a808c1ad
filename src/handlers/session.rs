// handlers/session.rs - POST /jwt, POST /logout

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, SessionUser};
use crate::state::AppState;

/// POST /jwt - sign the identity payload and set it as the session cookie.
///
/// The payload comes from the external identity provider and is trusted as
/// sent; `exp`/`iat` are always set by the server.
pub async fn issue(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Value>,
) -> ApiResult<Value> {
    let Value::Object(identity) = payload else {
        return Err(ApiError::bad_request("Identity payload must be a JSON object"));
    };

    let email = identity.get("email").and_then(Value::as_str).unwrap_or("<none>").to_string();
    let token = state.sessions.issue(identity)?;
    tracing::info!("Issued session for {}", email);

    Ok(ApiResponse::success(json!({ "success": true }))
        .with_cookie(state.sessions.session_cookie(&token)))
}

/// POST /logout - expire the session cookie.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> ApiResult<Value> {
    tracing::info!("Session closed for {}", user.email().unwrap_or("<anonymous>"));
    Ok(ApiResponse::success(json!({ "success": true }))
        .with_cookie(state.sessions.clearing_cookie()))
}
