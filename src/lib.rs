use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access control core: session resolution, guard, navigation tree, layout.
pub mod context;
pub mod guard;
pub mod layout;
pub mod navigation;
pub mod session;
pub mod storage;

// Data surface over the external resource API.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod library;
pub mod models;
pub mod resource;
pub mod validation;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use resource::{HttpResourceApi, MockResourceApi, ResourceState};
pub use session::SessionStore;
pub use storage::{FileKeyValueStore, KeyValueState, MemoryKeyValueStore};

/// ApiDoc
///
/// OpenAPI document for the `/api` surface, served at `/api-docs/openapi.json`.
/// Navigation (the fallback) is not an API operation and is left out.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::login, handlers::signup, handlers::logout,
        handlers::get_session, handlers::list_books, handlers::get_recent_books,
        handlers::get_book, handlers::get_book_reviews, handlers::add_review,
        handlers::get_my_profile, handlers::update_my_profile, handlers::get_my_issued_books,
        handlers::get_dashboard_stats, handlers::get_customers, handlers::delete_customer,
        handlers::create_book, handlers::update_book, handlers::delete_book,
        handlers::get_issue_history, handlers::issue_book, handlers::return_book,
        handlers::get_recent_activities
    ),
    components(
        schemas(
            models::Book, models::BookInput, models::IssuedBook, models::IssueStatus,
            models::IssueHistoryEntry, models::IssueRequest, models::Review, models::ReviewRequest,
            models::Activity, models::Credentials, models::RegisterRequest, models::ProfileUpdate,
            models::UserProfile, models::LoginResponse, models::LogoutResponse,
            models::DashboardStats, models::ErrorBody, session::Session, session::Role,
            navigation::View, navigation::ViewDescriptor, guard::Decision,
        )
    ),
    tags(
        (name = "library-portal", description = "Library Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared by every request: the resource API client, the session store, and the
/// loaded configuration. All members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Client for the external `users`/`books`/`issuedBooks`/`reviews`/`activities` API.
    pub resources: ResourceState,
    /// The single active session (`currentUser`).
    pub sessions: SessionStore,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ResourceState {
    fn from_ref(app_state: &AppState) -> ResourceState {
        app_state.resources.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(app_state: &AppState) -> SessionStore {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the data surface, the docs and the navigation fallback, then wraps
/// everything in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Any session passes; anonymous callers get 401.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session)),
        )
        // Admin role only; signed-in users get 403.
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin)),
        )
        // Everything else is a navigation event.
        .fallback(handlers::navigate_page)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// cors_layer
///
/// Cross-origin access for the configured front-end origin only. Requests carry
/// no credentials of their own: the session is process-wide.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = match HeaderValue::from_str(&config.allowed_origin) {
        Ok(origin) => vec![origin],
        Err(e) => {
            tracing::warn!(origin = %config.allowed_origin, "ignoring unusable ALLOWED_ORIGIN: {}", e);
            Vec::new()
        }
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// trace_span_logger
///
/// Span for one request, carrying the `x-request-id` so every log line of the
/// request can be correlated.
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
