use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Everything under `/admin`. The login form and sign-out stay reachable without a
/// session; every other handler takes `AdminAccess`, which redirects to
/// `/admin/login-admin` without a valid admin session and to `/403` without the
/// administrator role.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET|POST /admin/login-admin
        // Prompt, and the credential exchange with the backend.
        .route(
            "/login-admin",
            get(handlers::admin_login_form).post(handlers::admin_login),
        )
        // POST /admin/sign-out
        .route("/sign-out", post(handlers::admin_sign_out))
        // GET /admin/dashboard
        .route("/dashboard", get(handlers::admin_dashboard))
        // GET /admin/users-data?search=&role=&page=
        .route("/users-data", get(handlers::list_users))
        // GET /admin/users-data/{uuid}
        // User detail with the role change history.
        .route("/users-data/{uuid}", get(handlers::user_detail))
        // PUT /admin/users-data/{uuid}/role
        .route("/users-data/{uuid}/role", put(handlers::change_role))
}
