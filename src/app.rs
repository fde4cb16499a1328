use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware::from_fn,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{config, SecurityConfig};
use crate::error::ApiError;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{jwt_auth_middleware, require_admin};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(review_public_routes())
        // Protected API
        .merge(review_routes())
        // Admin API
        .merge(admin_routes())
        .fallback(not_found)
        .with_state(state)
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config().security)),
        )
}

fn review_public_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/reviews/developer/:developer_id",
            get(public::review_list_for_developer),
        )
        .route(
            "/api/reviews/developer/:developer_id/summary",
            get(public::review_developer_summary),
        )
}

fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews", post(protected::review_add))
        .route(
            "/api/reviews/:id",
            put(protected::review_update)
                .patch(protected::review_update)
                .delete(protected::review_delete),
        )
        .route_layer(from_fn(jwt_auth_middleware))
}

fn admin_routes() -> Router<AppState> {
    // Last layer added runs first: authenticate, then check is_admin
    Router::new()
        .route("/api/admin/reviews", get(elevated::review_list))
        .route("/api/admin/reviews/:id", delete(elevated::review_delete))
        .route("/api/admin/users/:id", delete(elevated::user_delete))
        .route(
            "/api/admin/developers/:id/recompute",
            post(elevated::developer_recompute),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
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

    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "DevHub API",
            "version": version,
            "description": "Freelance marketplace reviews with transactionally maintained developer ratings",
            "endpoints": {
                "health": "/health (public)",
                "reviews": "/api/reviews/developer/:developer_id[/summary] (public)",
                "review_crud": "/api/reviews[/:id] (protected - clients)",
                "admin": "/api/admin/{reviews,users,developers}/* (admin)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.reviews.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "retryable": e.is_retryable()
                    }
                })),
            )
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
