use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Visitor Router Module
///
/// The findings area. Every handler takes `VisitorAccess`, so a request without an SSO
/// session is redirected to `/` before any backend call is made.
pub fn visitor_routes() -> Router<AppState> {
    Router::new()
        // GET /user-psu/home?search=&status=&page=
        .route("/user-psu/home", get(handlers::findings_home))
        // GET /user-psu/home/export.csv
        // Whole filtered subset, fixed four columns.
        .route(
            "/user-psu/home/export.csv",
            get(handlers::export_findings_csv),
        )
        // GET /user-psu/home/export.xlsx
        // Whole filtered subset, every backend column.
        .route(
            "/user-psu/home/export.xlsx",
            get(handlers::export_findings_xlsx),
        )
}
