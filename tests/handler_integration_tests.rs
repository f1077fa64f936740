mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::Duration;
use common::StubBackend;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;
use triup_console::{
    guard::{ADMIN_LOGIN_ROUTE, FORBIDDEN_ROUTE, HOME_LOGIN_ROUTE},
    models::{
        AdminLoginResponse, DashboardView, FindingsPage, LoginSession, SidebarPreference,
        SidebarView, UserDetailView, UsersPage,
    },
    pipeline::export::{CSV_MIME, XLSX_MIME},
    session::{SessionFlow, SessionStore},
};

// --- Helpers ---

fn findings_backend() -> StubBackend {
    let findings = (1..=23)
        .map(|i| {
            let status = if i % 3 == 0 { "ยืนยันความถูกต้อง" } else { "รอตรวจสอบ" };
            common::finding(i, &format!("RC-{i:03}"), &format!("Study {i}"), status)
        })
        .collect();
    StubBackend {
        findings,
        ..StubBackend::default()
    }
}

fn users_backend() -> StubBackend {
    StubBackend {
        users: vec![
            common::user("somchai", Some("Somchai Jaidee"), 1000),
            common::user("malee", Some("Malee Srisuk"), 3000),
            common::user("john", None, 2000),
            common::user("ghost", None, 9999),
        ],
        ..StubBackend::default()
    }
}

fn admin_store() -> SessionStore {
    let store = common::memory_store();
    common::sign_in(&store, Some(1000), Some(Duration::hours(1)));
    store
}

fn visitor_store() -> SessionStore {
    let store = common::memory_store();
    common::sign_in(&store, Some(3000), None);
    store
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn send_json(app: Router, method: &str, uri: &str, payload: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// --- Guarded routes ---

#[tokio::test]
async fn test_admin_route_without_any_session_is_forbidden() {
    let app = common::app(users_backend(), common::memory_store());
    let response = get(app, "/admin/dashboard").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), FORBIDDEN_ROUTE);
}

#[tokio::test]
async fn test_admin_route_with_expired_session_goes_to_login() {
    let store = common::memory_store();
    common::sign_in(&store, Some(1000), Some(Duration::seconds(-1)));
    let app = common::app(users_backend(), store.clone());

    let response = get(app, "/admin/users-data").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), ADMIN_LOGIN_ROUTE);
    assert_eq!(store.admin_session(), None);
}

#[tokio::test]
async fn test_visitor_route_without_sso_session_goes_home() {
    let app = common::app(findings_backend(), common::memory_store());
    let response = get(app, "/user-psu/home").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), HOME_LOGIN_ROUTE);
}

#[tokio::test]
async fn test_visitor_cannot_reach_admin_views() {
    let store = visitor_store();
    common::sign_in(&store, Some(3000), Some(Duration::hours(1)));
    let app = common::app(users_backend(), store);

    let response = get(app, "/admin/users-data").await;
    assert_eq!(location(&response), FORBIDDEN_ROUTE);
}

// --- Findings ---

#[tokio::test]
async fn test_findings_home_pages_and_filters() {
    let app = common::app(findings_backend(), visitor_store());

    let response = get(app.clone(), "/user-psu/home?page=5").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: FindingsPage = body_json(response).await;
    assert_eq!(page.rows.len(), 3);
    assert_eq!(page.pagination.total_pages, 5);
    assert_eq!(page.pagination.total_count, 23);
    assert_eq!(page.status, "all");
    assert_eq!(page.status_options, vec!["รอตรวจสอบ", "ยืนยันความถูกต้อง"]);

    let response = get(
        app,
        "/user-psu/home?status=%E0%B8%A2%E0%B8%B7%E0%B8%99%E0%B8%A2%E0%B8%B1%E0%B8%99%E0%B8%84%E0%B8%A7%E0%B8%B2%E0%B8%A1%E0%B8%96%E0%B8%B9%E0%B8%81%E0%B8%95%E0%B9%89%E0%B8%AD%E0%B8%87&page=9",
    )
    .await;
    let page: FindingsPage = body_json(response).await;
    assert_eq!(page.pagination.total_count, 7);
    // Out-of-range page requests are clamped.
    assert_eq!(page.pagination.current_page, 2);
    assert_eq!(page.rows.len(), 2);
}

#[tokio::test]
async fn test_findings_search_is_case_insensitive() {
    let app = common::app(findings_backend(), visitor_store());

    let response = get(app, "/user-psu/home?search=study%2012").await;
    let page: FindingsPage = body_json(response).await;
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].report_code, "RC-012");
    assert_eq!(page.search, "study 12");
}

#[tokio::test]
async fn test_findings_load_failure_is_inline() {
    let backend = StubBackend {
        fail_lists: true,
        ..StubBackend::default()
    };
    let app = common::app(backend, visitor_store());

    let response = get(app, "/user-psu/home").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: FindingsPage = body_json(response).await;
    assert_eq!(page.error.as_deref(), Some("findings unavailable"));
    assert!(page.rows.is_empty());
}

#[tokio::test]
async fn test_csv_export_covers_whole_filtered_subset() {
    let app = common::app(findings_backend(), visitor_store());

    let response = get(app, "/user-psu/home/export.csv?search=rc-0&page=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], CSV_MIME);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"findings.csv\""
    );

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    // Header plus all 23 matches, not just one page.
    assert_eq!(text.lines().count(), 24);
    assert!(text.starts_with(r#""Report Code","Title TH","Title EN","Status""#));
}

#[tokio::test]
async fn test_xlsx_export_download() {
    let app = common::app(findings_backend(), visitor_store());

    let response = get(app, "/user-psu/home/export.xlsx").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_MIME);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"findings.xlsx\""
    );
    assert!(body_bytes(response).await.starts_with(b"PK"));
}

#[tokio::test]
async fn test_export_with_failed_load_is_bad_gateway() {
    let backend = StubBackend {
        fail_lists: true,
        ..StubBackend::default()
    };
    let app = common::app(backend, visitor_store());

    let response = get(app, "/user-psu/home/export.csv").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

// --- Users ---

#[tokio::test]
async fn test_users_list_with_role_filter_and_counts() {
    let app = common::app(users_backend(), admin_store());

    let response = get(app.clone(), "/admin/users-data").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: UsersPage = body_json(response).await;
    assert_eq!(page.pagination.total_count, 4);
    let admin_option = page.role_options.iter().find(|o| o.code == 1000).unwrap();
    assert_eq!(admin_option.count, 1);
    let ghost = page.rows.iter().find(|r| r.username == "ghost").unwrap();
    assert_eq!(ghost.role_label, "unrecognized");

    let response = get(app, "/admin/users-data?role=3000&search=MALEE").await;
    let page: UsersPage = body_json(response).await;
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].fullname, "Malee Srisuk");
    assert_eq!(page.role, "3000");
}

#[tokio::test]
async fn test_user_detail_and_not_found() {
    let backend = users_backend();
    let known = backend.users[1].user_pk_uuid;
    let app = common::app(backend, admin_store());

    let response = get(app.clone(), &format!("/admin/users-data/{}", known)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail: UserDetailView = body_json(response).await;
    assert_eq!(detail.user.username, "malee");
    assert_eq!(detail.role_label, "ผู้ใช้งานทั่วไป");
    assert_eq!(detail.roles.len(), 6);

    let response = get(app, &format!("/admin/users-data/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_change_role_records_acting_admin() {
    let backend = Arc::new(users_backend());
    let target = backend.users[2].user_pk_uuid;
    let app = common::app_with(backend.clone(), admin_store());

    let response = send_json(
        app,
        "PUT",
        &format!("/admin/users-data/{}/role", target),
        json!({ "roles_id": 5000 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let updates = backend.role_updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, target);
    assert_eq!(updates[0].1.roles_id, 5000);
    assert_eq!(updates[0].1.changed_by, "somchai");
}

#[tokio::test]
async fn test_change_role_rejects_unknown_code() {
    let backend = Arc::new(users_backend());
    let target = backend.users[0].user_pk_uuid;
    let app = common::app_with(backend.clone(), admin_store());

    let response = send_json(
        app,
        "PUT",
        &format!("/admin/users-data/{}/role", target),
        json!({ "roles_id": 7 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(backend.role_updates.lock().unwrap().is_empty());
}

// --- Dashboard ---

#[tokio::test]
async fn test_dashboard_statistics() {
    let backend = StubBackend {
        users: users_backend().users,
        findings: findings_backend().findings,
        ..StubBackend::default()
    };
    let app = common::app(backend, admin_store());

    let response = get(app, "/admin/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    let view: DashboardView = body_json(response).await;

    assert_eq!(view.display_name, "somchai");
    assert_eq!(view.total_users, 4);
    assert_eq!(view.total_findings, 23);
    let confirmed = view
        .findings_by_status
        .iter()
        .find(|s| s.status == "ยืนยันความถูกต้อง")
        .unwrap();
    assert_eq!(confirmed.count, 7);
    assert_eq!(view.error, None);
}

// --- Login flows ---

#[tokio::test]
async fn test_admin_login_requires_both_credentials() {
    let app = common::app(StubBackend::default(), common::memory_store());

    let response = send_json(
        app,
        "POST",
        "/admin/login-admin",
        json!({ "email": "admin@psu.ac.th", "password": "" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_login_rejection_keeps_operator_on_login() {
    let backend = StubBackend {
        login_response: AdminLoginResponse {
            success: false,
            session: None,
            error: Some("wrong password".to_string()),
        },
        ..StubBackend::default()
    };
    let store = common::memory_store();
    let app = common::app(backend, store.clone());

    let response = send_json(
        app,
        "POST",
        "/admin/login-admin",
        json!({ "email": "admin@psu.ac.th", "password": "nope" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(response).await;
    assert_eq!(body["message"], "wrong password");
    assert_eq!(store.admin_session(), None);
}

#[tokio::test]
async fn test_admin_login_success_persists_session() {
    let expires_at = chrono::Utc::now() + Duration::hours(8);
    let backend = StubBackend {
        login_response: AdminLoginResponse {
            success: true,
            session: Some(LoginSession {
                id: Some("opaque-credential".to_string()),
                expires_at: Some(expires_at),
            }),
            error: None,
        },
        ..StubBackend::default()
    };
    let store = common::memory_store();
    let app = common::app(backend, store.clone());

    let response = send_json(
        app,
        "POST",
        "/admin/login-admin",
        json!({ "email": "admin@psu.ac.th", "password": "secret" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/dashboard");

    let session = store.admin_session().unwrap();
    assert_eq!(session.credential, "opaque-credential");
    assert_eq!(
        session.expires_at.timestamp_millis(),
        expires_at.timestamp_millis()
    );
}

#[tokio::test]
async fn test_login_success_stores_sso_session() {
    let store = common::memory_store();
    let app = common::app(StubBackend::default(), store.clone());

    let response = get(
        app.clone(),
        "/login-success?session=%7B%22user%22%3A%7B%22username%22%3A%22malee%22%7D%7D",
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user-psu/home");
    assert_eq!(
        store.sso_session().and_then(|s| s.user.username).as_deref(),
        Some("malee")
    );

    let response = get(app, "/login-success").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_success_accepts_string_role_code() {
    let store = common::memory_store();
    let app = common::app(StubBackend::default(), store.clone());

    // {"user":{"username":"malee","role_code":"1000"}}
    let response = get(
        app.clone(),
        "/login-success?session=%7B%22user%22%3A%7B%22username%22%3A%22malee%22%2C%22role_code%22%3A%221000%22%7D%7D",
    )
    .await;
    assert_eq!(location(&response), "/user-psu/home");

    let view: SidebarView = body_json(get(app, "/layout/sidebar").await).await;
    assert_eq!(view.admin_links.len(), 2);
    assert_eq!(view.display_name, "malee");
}

#[tokio::test]
async fn test_sign_out_clears_only_its_flow() {
    let store = admin_store();
    let app = common::app(StubBackend::default(), store.clone());

    let response = send_json(app.clone(), "POST", "/sign-out", json!({})).await;
    assert_eq!(location(&response), HOME_LOGIN_ROUTE);
    assert_eq!(store.load(SessionFlow::Sso), None);
    assert!(store.admin_session().is_some());

    let response = send_json(app, "POST", "/admin/sign-out", json!({})).await;
    assert_eq!(location(&response), ADMIN_LOGIN_ROUTE);
    assert_eq!(store.admin_session(), None);
}

// --- Layout ---

#[tokio::test]
async fn test_sidebar_lists_admin_links_for_administrators_only() {
    let app = common::app(StubBackend::default(), admin_store());
    let view: SidebarView = body_json(get(app, "/layout/sidebar").await).await;
    assert_eq!(view.admin_links.len(), 2);
    assert_eq!(view.display_name, "somchai");

    let app = common::app(StubBackend::default(), visitor_store());
    let view: SidebarView = body_json(get(app, "/layout/sidebar").await).await;
    assert!(view.admin_links.is_empty());
    assert_eq!(view.links[0].href, "/user-psu/home");

    let app = common::app(StubBackend::default(), common::memory_store());
    let view: SidebarView = body_json(get(app, "/layout/sidebar").await).await;
    assert_eq!(view.display_name, "Guest");
}

#[tokio::test]
async fn test_sidebar_preference_round_trip() {
    let store = common::memory_store();
    let app = common::app(StubBackend::default(), store.clone());

    let response = send_json(app.clone(), "PUT", "/preferences/sidebar", json!({ "open": true })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let preference: SidebarPreference = body_json(get(app, "/preferences/sidebar").await).await;
    assert!(preference.open);
    assert!(store.preferences().sidebar_open());
}

#[tokio::test]
async fn test_forbidden_page() {
    let app = common::app(StubBackend::default(), common::memory_store());
    let response = get(app, "/403").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
