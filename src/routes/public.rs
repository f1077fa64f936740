use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session. None of them returns backend data; they only read or
/// write the operator's own session store.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Visitor login landing, also the redirect target for a missing SSO session.
        .route("/", get(handlers::login_prompt))
        // GET /403
        // Redirect target when the administrator role is missing.
        .route("/403", get(handlers::forbidden))
        // GET /login-success?session=...
        // SSO hand-back. Stores the session blob and continues to /user-psu/home.
        .route("/login-success", get(handlers::login_success))
        // POST /sign-out
        .route("/sign-out", post(handlers::sign_out))
        // GET|PUT /preferences/sidebar
        .route(
            "/preferences/sidebar",
            get(handlers::get_sidebar_preference).put(handlers::put_sidebar_preference),
        )
        // GET /layout/sidebar
        // Display name, role name and navigation for the layout shell.
        .route("/layout/sidebar", get(handlers::get_sidebar))
}
