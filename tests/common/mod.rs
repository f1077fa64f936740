#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use triup_console::{
    AppConfig, AppState, create_router,
    backend::{Backend, BackendState},
    error::BackendError,
    models::{
        AdminLoginRequest, AdminLoginResponse, Finding, Profile, RoleChangeLog, SessionUser,
        SsoSession, UpdateRoleRequest, UserAccount,
    },
    pipeline::{XlsxEncoder, export::EncoderState},
    session::{AdminSession, Session, SessionStore},
    storage::{MemoryStorage, StorageState},
};
use uuid::Uuid;

// --- STUB BACKEND ---

/// Canned backend for handler tests. Records every role update it receives.
#[derive(Default)]
pub struct StubBackend {
    pub users: Vec<UserAccount>,
    pub findings: Vec<Finding>,
    pub logs: Vec<RoleChangeLog>,
    pub fail_lists: bool,
    pub login_response: AdminLoginResponse,
    pub role_updates: Mutex<Vec<(Uuid, UpdateRoleRequest)>>,
}

#[async_trait]
impl Backend for StubBackend {
    async fn list_users(&self) -> Result<Vec<UserAccount>, BackendError> {
        if self.fail_lists {
            return Err(BackendError::Rejected("users unavailable".to_string()));
        }
        Ok(self.users.clone())
    }

    async fn get_user(&self, id: Uuid) -> Result<UserAccount, BackendError> {
        self.users
            .iter()
            .find(|u| u.user_pk_uuid == id)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn role_log(&self, _id: Uuid) -> Result<Vec<RoleChangeLog>, BackendError> {
        Ok(self.logs.clone())
    }

    async fn update_role(&self, id: Uuid, req: &UpdateRoleRequest) -> Result<(), BackendError> {
        self.role_updates.lock().unwrap().push((id, req.clone()));
        Ok(())
    }

    async fn list_findings(&self) -> Result<Vec<Finding>, BackendError> {
        if self.fail_lists {
            return Err(BackendError::Rejected("findings unavailable".to_string()));
        }
        Ok(self.findings.clone())
    }

    async fn admin_login(
        &self,
        _req: &AdminLoginRequest,
    ) -> Result<AdminLoginResponse, BackendError> {
        Ok(self.login_response.clone())
    }
}

// --- FIXTURES ---

pub fn user(username: &str, fullname: Option<&str>, roles_id: i64) -> UserAccount {
    UserAccount {
        user_pk_uuid: Uuid::new_v4(),
        username: username.to_string(),
        roles_id,
        token: None,
        profile: fullname.map(|name| Profile {
            fullname: Some(name.to_string()),
            ..Profile::default()
        }),
    }
}

pub fn finding(id: i64, code: &str, title_en: &str, status: &str) -> Finding {
    Finding {
        findings_pk_id: id,
        report_code: Some(code.to_string()),
        report_title_th: Some(format!("รายงาน {}", id)),
        report_title_en: Some(title_en.to_string()),
        status: Some(status.to_string()),
        ..Finding::default()
    }
}

pub fn sso_session(username: &str, role_code: Option<i64>) -> SsoSession {
    SsoSession {
        user: SessionUser {
            username: Some(username.to_string()),
            role_code,
            role_name: Some("ผู้ดูแลระบบ".to_string()),
        },
        profile: None,
    }
}

pub fn memory_store() -> SessionStore {
    SessionStore::new(Arc::new(MemoryStorage::new()) as StorageState)
}

/// Stores an SSO session for `role_code` and, when `admin_valid_for` is set, an admin
/// session expiring that far in the future (negative for already expired).
pub fn sign_in(store: &SessionStore, role_code: Option<i64>, admin_valid_for: Option<Duration>) {
    store.save(&Session::Sso(sso_session("somchai", role_code)));
    if let Some(offset) = admin_valid_for {
        store.save(&Session::Admin(AdminSession {
            credential: "opaque-token".to_string(),
            expires_at: Utc::now() + offset,
        }));
    }
}

pub fn app(backend: StubBackend, sessions: SessionStore) -> Router {
    app_with(Arc::new(backend), sessions)
}

/// Same as `app`, keeping a handle on the stub to inspect what it received.
pub fn app_with(backend: Arc<StubBackend>, sessions: SessionStore) -> Router {
    let state = AppState {
        backend: backend as BackendState,
        sessions,
        encoder: Arc::new(XlsxEncoder) as EncoderState,
        config: AppConfig::default(),
    };
    create_router(state)
}
