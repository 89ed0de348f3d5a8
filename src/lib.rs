use std::{any::Any, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod repository;
pub mod storage;
pub mod uploads;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::{AuthUser, IdentityState, RolePolicy, require_admin};
use rate_limit::RateLimiter;
use routes::{admin, authenticated, public};
use uploads::UploadResolver;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiResult, AppError};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{LocalDiskStorage, MockStorageService, S3StorageClient, StorageState};

// Room for multipart boundaries and text fields on top of the largest accepted file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and schema into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::signup, handlers::auth::signin, handlers::auth::google_signin,
        handlers::auth::me, handlers::auth::logout, handlers::auth::list_admins,
        handlers::auth::change_password,
        handlers::projects::list_projects, handlers::projects::get_project,
        handlers::projects::create_project, handlers::projects::update_project,
        handlers::projects::delete_project,
        handlers::achievements::list_achievements, handlers::achievements::get_achievement,
        handlers::achievements::create_achievement, handlers::achievements::update_achievement,
        handlers::achievements::delete_achievement,
        handlers::team::list_team_members, handlers::team::get_team_member,
        handlers::team::create_team_member, handlers::team::update_team_member,
        handlers::team::delete_team_member,
        handlers::courses::list_courses, handlers::courses::get_course,
        handlers::courses::create_course, handlers::courses::update_course,
        handlers::courses::delete_course,
    ),
    components(
        schemas(
            models::Project, models::Achievement, models::TeamMember, models::SocialLinks,
            models::Course, models::CourseLevel, models::Department, models::Role,
            models::UserProfile, models::AdminSummary, models::SignupRequest,
            models::SigninRequest, models::GoogleSigninRequest, models::ChangePasswordRequest,
            handlers::auth::AuthPayload, handlers::HealthResponse,
            error::ErrorBody, error::FieldError,
        )
    ),
    tags(
        (name = "portfolio", description = "Engineering Team Portfolio API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container of every shared service, built once in
/// `main` and cloned into each request.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres, or in-memory when no database is configured.
    pub repo: RepositoryState,
    /// Storage Layer: S3-compatible blob store or local disk.
    pub storage: StorageState,
    /// Google ID-token verification.
    pub identity: IdentityState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
    pub uploads: UploadResolver,
    pub roles: RolePolicy,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Assembles the state; the upload resolver, role policy and rate limiter
    /// are derived from `config`.
    pub fn new(
        repo: RepositoryState,
        storage: StorageState,
        identity: IdentityState,
        config: AppConfig,
    ) -> Self {
        Self {
            uploads: UploadResolver::from_config(&config),
            roles: RolePolicy::from_config(&config),
            limiter: Arc::new(RateLimiter::from_config(&config)),
            repo,
            storage,
            identity,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`: the `AuthUser` extractor rejects the request
/// with 401 before the handler runs when no valid session is present.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // 1. CORS: explicit origins, because credentialed requests cannot use `*`.
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let mut base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No access control.
        .merge(public::public_routes())
        // Authenticated Routes: any valid session.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin Routes: the single role gate, applied before body extraction.
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        );

    // Local mode serves uploaded files itself.
    if !state.uploads.is_cloud() {
        base_router = base_router.nest_service(
            uploads::LOCAL_UPLOAD_PREFIX,
            ServeDir::new(&config.upload_dir),
        );
    }

    let base_router = base_router
        .layer(DefaultBodyLimit::max(
            config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit,
        ))
        // Apply the Unified State to all routes.
        .with_state(state);

    let expose_panic_detail = !config.is_production();

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id))
                // 3d. Panics become a 500 envelope instead of a dropped connection.
                .layer(CatchPanicLayer::custom(move |panic| {
                    panic_response(panic, expose_panic_detail)
                })),
        )
        // 4. CORS Layer
        .layer(cors)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, expose_detail: bool) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());

    tracing::error!(detail = %detail, "handler panicked");

    let mut body = serde_json::json!({
        "success": false,
        "message": "Internal server error",
    });
    if expose_detail {
        body["detail"] = serde_json::Value::String(detail);
    }

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id`, so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<Body>) -> Span {
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
