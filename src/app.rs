use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::{likes, meals, requests, reviews, session, users};
use crate::middleware::require_session;
use crate::state::AppState;

/// Build the full router with global middleware applied.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/jwt", post(session::issue))
        .merge(protected_routes(state.clone()))
        .merge(user_routes())
        .merge(meal_routes())
        .merge(review_routes())
        .merge(request_routes())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/logout", post(session::logout))
        .route("/users", get(users::list_users))
        .route("/change-user-role", patch(users::change_role))
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/new-user", post(users::create_user))
        .route("/user/admin/:email", get(users::is_admin))
}

fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/post-meal", post(meals::create_meal))
        .route("/meals", get(meals::list_meals))
        .route("/meals-len", get(meals::count_meals))
        .route("/meals-six", get(meals::latest_meals))
        .route("/breakfast", get(meals::breakfast))
        .route("/lunch", get(meals::lunch))
        .route("/dinner", get(meals::dinner))
        .route("/details/:id", get(meals::meal_details))
        .route("/like-count", put(likes::update_like))
        .route("/liked-count", get(likes::liked))
}

fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/post-review", post(reviews::create_review))
        .route("/review-update/:id", put(reviews::update_review))
        .route("/read-my-review/:email", get(reviews::reviews_by_author))
        .route("/read-review/:id", get(reviews::reviews_for_meal))
        .route("/delete-review/:id", delete(reviews::delete_review))
        .route("/sum-of-rating/:id", get(reviews::rating_summary))
}

fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/meals-request", post(requests::create_request))
        .route("/request-meals/:email", get(requests::requests_by_email))
        .route("/cancel-req/:id", delete(requests::cancel_request))
}

/// Credentialed CORS needs explicit origins, methods and headers.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Fueled API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Meal-sharing platform backend",
            "endpoints": {
                "session": "/jwt, /logout",
                "users": "/new-user, /users, /user/admin/:email, /change-user-role",
                "meals": "/post-meal, /meals, /meals-len, /meals-six, /breakfast, /lunch, /dinner, /details/:id",
                "likes": "/like-count, /liked-count",
                "reviews": "/post-review, /review-update/:id, /read-my-review/:email, /read-review/:id, /delete-review/:id, /sum-of-rating/:id",
                "requests": "/meals-request, /request-meals/:email, /cancel-req/:id",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Response {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            let error = ApiError::service_unavailable("Database unavailable");
            let mut body = error.to_json();
            body["data"] = json!({
                "status": "degraded",
                "timestamp": now,
                "database": "unavailable"
            });
            (error.status_code(), Json(body)).into_response()
        }
    }
}
