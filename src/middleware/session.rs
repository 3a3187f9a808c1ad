use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};

use crate::auth::{extract_token, SessionClaims, SessionError};
use crate::error::ApiError;
use crate::state::AppState;

/// Identity of the caller, decoded from a verified session token
#[derive(Clone, Debug)]
pub struct SessionUser {
    pub identity: Map<String, Value>,
}

impl SessionUser {
    pub fn email(&self) -> Option<&str> {
        self.identity.get("email").and_then(Value::as_str)
    }
}

impl From<SessionClaims> for SessionUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            identity: claims.identity,
        }
    }
}

/// Reject the request with 401 unless it carries a valid session token.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or(SessionError::MissingToken)?;
    let claims = state.sessions.verify(&token)?;

    let user = SessionUser::from(claims);
    tracing::debug!("Session accepted for {}", user.email().unwrap_or("<anonymous>"));
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
