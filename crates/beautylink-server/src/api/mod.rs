mod beta;
mod bookings;
mod chat;
mod dashboard;
mod geocode;
mod providers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use beautylink_core::{beta::BetaCatalog, AppConfig, DataError};
use beautylink_remote::{ApiClient, GeocodeClient};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::middleware::{
    enforce_rate_limit, request_id, request_scope, require_bearer_auth, AuthState,
    RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub api: ApiClient,
    pub geocoder: GeocodeClient,
    pub catalog: &'static BetaCatalog,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "network_error" | "request_cancelled" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Turns a [`DataError`] into the API error envelope. Internal details of
/// network and unknown failures are logged, not returned.
pub(super) fn map_data_error(request_id: String, error: &DataError) -> ApiError {
    let message = match error {
        DataError::NotFound(msg) | DataError::Validation(msg) => {
            tracing::debug!(error = %error, "request rejected");
            msg.clone()
        }
        DataError::Network(_) => {
            tracing::error!(error = %error, "upstream unavailable");
            "an upstream service is unavailable".to_string()
        }
        DataError::Unknown(_) => {
            tracing::error!(error = %error, "request failed");
            "internal error".to_string()
        }
    };
    ApiError::new(request_id, error.code(), message)
}

pub(super) fn map_db_error(request_id: String, error: beautylink_db::DbError) -> ApiError {
    map_data_error(request_id, &DataError::from(error))
}

pub(super) fn map_remote_error(
    request_id: String,
    error: beautylink_remote::RemoteError,
) -> ApiError {
    map_data_error(request_id, &DataError::from(error))
}

/// Response for an aggregation whose scope was cancelled before it finished.
pub(super) fn cancelled(request_id: String) -> ApiError {
    ApiError::new(request_id, "request_cancelled", "request was cancelled")
}

pub(super) fn parse_uuid(request_id: &str, field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("'{field}' must be a UUID, got '{raw}'"),
        )
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/services/{service_id}/providers",
            get(providers::list_service_providers),
        )
        .route(
            "/api/v1/clients/{client_id}/bookings",
            get(bookings::list_client_bookings),
        )
        .route("/api/v1/beta/catalog/{role}", get(beta::get_catalog))
        .route(
            "/api/v1/beta/{role}/testers/{user_id}",
            get(beta::get_tester_status).delete(beta::reset_tester),
        )
        .route(
            "/api/v1/beta/{role}/testers/{user_id}/tests/{test_id}",
            put(beta::mark_test),
        )
        .route("/api/v1/admin/beta/overview", get(beta::get_overview))
        .route("/api/v1/admin/dashboard", get(dashboard::get_dashboard))
        .route("/api/v1/chat/direct", post(chat::open_direct_chat))
        .route("/api/v1/geocode", get(geocode::search))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn(request_scope)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match beautylink_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::new(
                req_id.0,
                HealthData {
                    status: "ok",
                    database: "ok",
                },
            ),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::new(
                    req_id.0,
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                ),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
