use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// StorageError
///
/// Failures raised by the persisted key/value substrate (disabled storage, quota,
/// unreadable backing file). `SessionStore` never lets these escape: they are logged
/// and treated as "absent".
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded ({used} of {quota} bytes)")]
    QuotaExceeded { used: usize, quota: usize },

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// BackendError
///
/// Failures while talking to the REST backend. The `Display` output is what the views
/// show as their inline error message.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The envelope came back with `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("record not found")]
    NotFound,

    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// ExportError
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("spreadsheet encoding failed: {0}")]
    Encoding(String),

    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// LoginError
///
/// Outcomes of the admin login exchange that keep the operator on the login view.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("enter an email and password first")]
    MissingCredentials,

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// ConsoleError
///
/// Host-level failures returned by handlers. Guard denials are never represented here;
/// they are always resolved by a redirect.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error("unknown role code {0}")]
    UnknownRole(i64),
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ConsoleError::Backend(BackendError::NotFound) => {
                (StatusCode::NOT_FOUND, json!({ "error": self.to_string() }))
            }
            ConsoleError::Backend(_) => {
                tracing::error!("backend failure: {}", self);
                (StatusCode::BAD_GATEWAY, json!({ "error": self.to_string() }))
            }
            // Export failures only affect a secondary action: report them as a notice.
            ConsoleError::Export(_) => {
                tracing::warn!("export failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "notice": self.to_string() }),
                )
            }
            ConsoleError::Login(LoginError::Backend(_)) => {
                (StatusCode::BAD_GATEWAY, json!({ "message": self.to_string() }))
            }
            ConsoleError::Login(LoginError::MissingCredentials) => {
                (StatusCode::BAD_REQUEST, json!({ "message": self.to_string() }))
            }
            ConsoleError::Login(LoginError::Rejected(_)) => {
                (StatusCode::UNAUTHORIZED, json!({ "message": self.to_string() }))
            }
            ConsoleError::UnknownRole(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
        };

        (status, Json(body)).into_response()
    }
}
