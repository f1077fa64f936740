use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::BackendError;
use crate::models::{
    AdminLoginRequest, AdminLoginResponse, ApiEnvelope, Finding, RoleChangeLog,
    UpdateRoleRequest, UserAccount,
};

/// Backend Trait
///
/// Defines the abstract contract for everything the console reads from or submits to
/// the REST backend. Handlers only see this trait, so tests substitute a stub without a
/// network.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Backend>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Backend: Send + Sync {
    // --- Users (admin) ---
    async fn list_users(&self) -> Result<Vec<UserAccount>, BackendError>;
    async fn get_user(&self, id: Uuid) -> Result<UserAccount, BackendError>;
    async fn role_log(&self, id: Uuid) -> Result<Vec<RoleChangeLog>, BackendError>;
    async fn update_role(&self, id: Uuid, req: &UpdateRoleRequest) -> Result<(), BackendError>;

    // --- Findings ---
    async fn list_findings(&self) -> Result<Vec<Finding>, BackendError>;

    // --- Login exchange ---
    async fn admin_login(&self, req: &AdminLoginRequest)
    -> Result<AdminLoginResponse, BackendError>;
}

/// BackendState
///
/// The concrete type used to share the backend client across the application state.
pub type BackendState = Arc<dyn Backend>;

/// HttpBackend
///
/// The concrete implementation of the `Backend` trait over HTTP, rooted at `API_URL`.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GETs an enveloped payload and unwraps it.
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, BackendError> {
        let response = self.client.get(self.url(path)).send().await?;
        decode::<ApiEnvelope<T>>(response).await?.into_data()
    }
}

// Error responses from the backend still carry the envelope, so the body is decoded
// whatever the status; only an undecodable body is an error here.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| BackendError::Malformed(format!("{} (HTTP {})", e, status.as_u16())))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_users(&self) -> Result<Vec<UserAccount>, BackendError> {
        Ok(self.fetch("/api/admin/users").await?.unwrap_or_default())
    }

    async fn get_user(&self, id: Uuid) -> Result<UserAccount, BackendError> {
        self.fetch(&format!("/api/admin/users/{}", id))
            .await?
            .ok_or(BackendError::NotFound)
    }

    async fn role_log(&self, id: Uuid) -> Result<Vec<RoleChangeLog>, BackendError> {
        Ok(self
            .fetch(&format!("/api/admin/users/{}/role-log", id))
            .await?
            .unwrap_or_default())
    }

    async fn update_role(&self, id: Uuid, req: &UpdateRoleRequest) -> Result<(), BackendError> {
        let response = self
            .client
            .put(self.url(&format!("/api/admin/users/{}/role", id)))
            .json(req)
            .send()
            .await?;
        decode::<ApiEnvelope<serde_json::Value>>(response)
            .await?
            .into_data()
            .map(|_| ())
    }

    async fn list_findings(&self) -> Result<Vec<Finding>, BackendError> {
        Ok(self
            .fetch("/api/master/form-new-findings")
            .await?
            .unwrap_or_default())
    }

    async fn admin_login(
        &self,
        req: &AdminLoginRequest,
    ) -> Result<AdminLoginResponse, BackendError> {
        let response = self
            .client
            .post(self.url("/api/login-api-triup/login"))
            .json(req)
            .send()
            .await?;
        decode(response).await
    }
}
