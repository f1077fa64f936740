use axum::{
    Json, Router,
    extract::Path,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use triup_console::{
    backend::{Backend, HttpBackend},
    error::BackendError,
    models::{AdminLoginRequest, UpdateRoleRequest},
};
use uuid::Uuid;

// --- FAKE REST BACKEND ---

async fn spawn_fake_backend() -> String {
    let known = Uuid::nil();

    let router = Router::new()
        .route(
            "/api/admin/users",
            get(|| async {
                Json(json!({
                    "success": true,
                    "data": [{
                        "user_pk_uuid": Uuid::nil(),
                        "username": "somchai",
                        "roles_id": 1000,
                        "profile": { "fullname": "Somchai Jaidee", "faculty": "Science" }
                    }]
                }))
            }),
        )
        .route(
            "/api/admin/users/{uuid}",
            get(move |Path(id): Path<Uuid>| async move {
                if id == known {
                    Json(json!({ "success": true, "data": { "user_pk_uuid": id, "username": "somchai", "roles_id": 1000 } }))
                } else {
                    Json(json!({ "success": true, "data": null }))
                }
            }),
        )
        .route(
            "/api/admin/users/{uuid}/role-log",
            get(|| async {
                Json(json!({
                    "success": true,
                    "data": [{
                        "log_id": 1,
                        "old_role_name": "ผู้ใช้งานทั่วไป",
                        "new_role_name": "ผู้ดูแลระบบ",
                        "changed_by": "admin",
                        "changed_at": "2024-05-01T08:00:00Z"
                    }]
                }))
            }),
        )
        .route(
            "/api/admin/users/{uuid}/role",
            put(|Json(body): Json<Value>| async move {
                if body["changed_by"].as_str().unwrap_or("").is_empty() {
                    Json(json!({ "success": false, "error": "changed_by required" }))
                } else {
                    Json(json!({ "success": true, "data": null }))
                }
            }),
        )
        .route(
            "/api/master/form-new-findings",
            get(|| async { "<html>gateway timeout</html>" }),
        )
        .route(
            "/api/login-api-triup/login",
            post(|| async {
                Json(json!({
                    "success": true,
                    "session": { "id": "opaque", "expiresAt": "2030-01-01T00:00:00Z" }
                }))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://127.0.0.1:{}/", port)
}

#[tokio::test]
async fn test_list_and_get_users() {
    let backend = HttpBackend::new(&spawn_fake_backend().await);

    let users = backend.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    let profile = users[0].profile.as_ref().unwrap();
    assert_eq!(profile.fullname.as_deref(), Some("Somchai Jaidee"));
    assert_eq!(profile.extra.get("faculty"), Some(&json!("Science")));

    let user = backend.get_user(Uuid::nil()).await.unwrap();
    assert_eq!(user.username, "somchai");

    assert!(matches!(
        backend.get_user(Uuid::new_v4()).await,
        Err(BackendError::NotFound)
    ));
}

#[tokio::test]
async fn test_role_log_and_update() {
    let backend = HttpBackend::new(&spawn_fake_backend().await);

    let logs = backend.role_log(Uuid::nil()).await.unwrap();
    assert_eq!(logs[0].changed_by.as_deref(), Some("admin"));

    let ok = UpdateRoleRequest {
        roles_id: 1000,
        changed_by: "somchai".to_string(),
    };
    backend.update_role(Uuid::nil(), &ok).await.unwrap();

    let rejected = UpdateRoleRequest {
        roles_id: 1000,
        changed_by: String::new(),
    };
    match backend.update_role(Uuid::nil(), &rejected).await {
        Err(BackendError::Rejected(message)) => assert_eq!(message, "changed_by required"),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_malformed() {
    let backend = HttpBackend::new(&spawn_fake_backend().await);
    assert!(matches!(
        backend.list_findings().await,
        Err(BackendError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_admin_login_exchange() {
    let backend = HttpBackend::new(&spawn_fake_backend().await);
    let response = backend
        .admin_login(&AdminLoginRequest {
            email: "admin@psu.ac.th".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.session.unwrap().id.as_deref(), Some("opaque"));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let backend = HttpBackend::new(&format!("http://127.0.0.1:{}", port));
    assert!(matches!(
        backend.list_users().await,
        Err(BackendError::Transport(_))
    ));
}
