use axum::{
    Json, Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
    routing::get,
};
use utoipa::OpenApi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Admin).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use gateway::{AuditSinkState, MemoryAuditSink, TracingAuditSink};
pub use repository::{DirectoryState, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI document for the admin API from the `#[utoipa::path]` and
/// `#[derive(utoipa::ToSchema)]` annotations. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_admin_stats, handlers::delete_comment, handlers::change_user_role
    ),
    components(
        schemas(
            models::UserRoleChangeRequest, models::UserResponse, models::AdminDashboardStats,
            error::ErrorBody,
        )
    ),
    tags(
        (name = "admin-gateway", description = "Audited administrative API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding all shared services and configuration.
/// Every field is an immutable handle, so cloning it per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: persistence for the admin operations.
    pub repo: RepositoryState,
    /// User directory consulted by the access gate.
    pub directory: DirectoryState,
    /// Logging capability shared by the gate and the auditor.
    pub audit_sink: AuditSinkState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets middleware running with the full AppState pull just the configuration.
impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's routing structure, applies global and scoped middleware,
/// and registers the application state.
///
/// Per admin request the middleware runs in this order: authentication, access gate,
/// auditor (allow-listed routes only), handler.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Admin Routes: authentication is layered outside the gate so the identity is
        // present in the request extensions by the time the gate runs.
        .nest(
            "/admin",
            admin::admin_routes(&state).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::authenticate,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: Generates a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: Wraps the request/response lifecycle in a tracing span.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: returns the x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (Applied last)
        .layer(cors)
}

/// trace_span_logger
///
/// Used by `TraceLayer` to create the per-request span. It includes the `x-request-id`
/// header so that gate and audit lines for one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
