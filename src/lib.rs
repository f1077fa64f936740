use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Persistence and session handling.
pub mod storage;
pub mod session;
pub mod guard;
pub mod auth;

// Backend contract, data pipeline and per-view state.
pub mod backend;
pub mod pipeline;
pub mod view;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

// Routing split by access level (public, visitor, admin).
pub mod routes;
use routes::{admin, public, visitor};

// --- Public Re-exports ---

pub use backend::{BackendState, HttpBackend};
pub use config::AppConfig;
pub use pipeline::export::EncoderState;
pub use session::SessionStore;
pub use storage::{FileStorage, MemoryStorage, StorageState};

/// ApiDoc
///
/// The OpenAPI document of the console host, served at `/api-docs/openapi.json` and
/// browsable through the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_prompt, handlers::forbidden, handlers::login_success,
        handlers::admin_login_form, handlers::admin_login, handlers::sign_out,
        handlers::admin_sign_out, handlers::get_sidebar_preference,
        handlers::put_sidebar_preference, handlers::get_sidebar,
        handlers::findings_home, handlers::export_findings_csv, handlers::export_findings_xlsx,
        handlers::admin_dashboard, handlers::list_users, handlers::user_detail,
        handlers::change_role
    ),
    components(
        schemas(
            models::StatusTone, models::RoleChangeLog, models::AdminLoginRequest,
            models::ChangeRoleRequest, models::SidebarPreference, models::RoleOption,
            models::UserRow, models::UsersPage, models::FindingRow, models::FindingsPage,
            models::UserDetailView, models::StatusCount, models::DashboardView,
            models::NavLink, models::SidebarView, models::LoginPrompt,
            pipeline::PaginationInfo,
        )
    ),
    tags(
        (name = "triup-console", description = "Research output admin console")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of the console host's services. Cloned per request;
/// every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// REST backend client.
    pub backend: BackendState,
    /// Operator's session store (admin session, SSO session, UI preferences).
    pub sessions: SessionStore,
    /// Spreadsheet encoder used by the findings export.
    pub encoder: EncoderState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Guard extractors and handlers pull only the services they use out of the state.

impl FromRef<AppState> for SessionStore {
    fn from_ref(app_state: &AppState) -> SessionStore {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for BackendState {
    fn from_ref(app_state: &AppState) -> BackendState {
        app_state.backend.clone()
    }
}

impl FromRef<AppState> for EncoderState {
    fn from_ref(app_state: &AppState) -> EncoderState {
        app_state.encoder.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the route tree, the Swagger UI and the observability layers around the
/// shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Guarded per handler by `VisitorAccess`.
        .merge(visitor::visitor_routes())
        // Guarded per handler by `AdminAccess`, except the login form and sign-out.
        .nest("/admin", admin::admin_routes())
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

/// trace_span_logger
///
/// Span for one request, tagged with the `x-request-id` set by the layer above so every
/// log line of the request (guard decisions, backend failures) correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
