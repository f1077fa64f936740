use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use chrono::Utc;

use crate::{
    backend::Backend,
    error::LoginError,
    guard::{ADMIN_LOGIN_ROUTE, GuardActivation, GuardPolicy, HOME_LOGIN_ROUTE},
    models::{AdminLoginRequest, AdminLoginResponse, LoginSession, SsoSession},
    session::{AdminSession, Session, SessionStore},
};

/// exchange_admin_login
///
/// Runs the admin login exchange: checks that both credentials were entered, posts them
/// to the backend, and on success persists the returned credential and expiry as the
/// admin session.
///
/// The backend's answer is trusted as-is. A reply without a credential or an expiry is
/// a rejection, whatever its `success` flag says.
pub async fn exchange_admin_login(
    backend: &dyn Backend,
    store: &SessionStore,
    req: &AdminLoginRequest,
) -> Result<AdminSession, LoginError> {
    if req.email.trim().is_empty() || req.password.trim().is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    let AdminLoginResponse {
        success,
        session,
        error,
    } = backend.admin_login(req).await?;
    let LoginSession { id, expires_at } = session.unwrap_or_default();

    match (success, id, expires_at) {
        (true, Some(credential), Some(expires_at)) if !credential.is_empty() => {
            let admin = AdminSession {
                credential,
                expires_at,
            };
            if !store.save(&Session::Admin(admin.clone())) {
                tracing::warn!("admin session could not be persisted; next view will ask to log in again");
            }
            tracing::info!(expires_at = %admin.expires_at, "admin session created");
            Ok(admin)
        }
        _ => Err(LoginError::Rejected(
            error.unwrap_or_else(|| "invalid username or password".to_string()),
        )),
    }
}

/// AdminAccess Extractor Result
///
/// Produced only for an admitted activation of an admin view. Carries the sessions the
/// handler needs for display names and audit attribution.
#[derive(Debug, Clone)]
pub struct AdminAccess {
    pub admin: AdminSession,
    /// The SSO session that supplied the administrator role.
    pub visitor: Option<SsoSession>,
}

/// VisitorAccess Extractor Result
#[derive(Debug, Clone)]
pub struct VisitorAccess {
    pub visitor: SsoSession,
}

/// AdminAccess Extractor Implementation
///
/// Runs one guard activation with the admin policy before the handler executes. A
/// denied activation rejects with a single redirect to the guard's target, so the
/// handler (and therefore any protected content) never runs.
impl<S> FromRequestParts<S> for AdminAccess
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = SessionStore::from_ref(state);

        let mut activation = GuardActivation::new(GuardPolicy::admin());
        activation.evaluate(&store, Utc::now());
        if let Some(target) = activation.take_redirect() {
            return Err(Redirect::to(&target));
        }

        // The session can disappear between evaluation and this read; send the operator
        // to log in again rather than render with nothing.
        let admin = store
            .admin_session()
            .ok_or_else(|| Redirect::to(ADMIN_LOGIN_ROUTE))?;

        Ok(AdminAccess {
            admin,
            visitor: store.sso_session(),
        })
    }
}

/// VisitorAccess Extractor Implementation
///
/// Same as `AdminAccess`, with the visitor policy (SSO session present, any role).
impl<S> FromRequestParts<S> for VisitorAccess
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = SessionStore::from_ref(state);

        let mut activation = GuardActivation::new(GuardPolicy::visitor());
        activation.evaluate(&store, Utc::now());
        if let Some(target) = activation.take_redirect() {
            return Err(Redirect::to(&target));
        }

        let visitor = store
            .sso_session()
            .ok_or_else(|| Redirect::to(HOME_LOGIN_ROUTE))?;

        Ok(VisitorAccess { visitor })
    }
}
