//! Route admission for protected views.
//!
//! This is a coarse UX gate, not a security boundary. The role it checks is read from
//! the console's own stored SSO session, which the operator can edit at will; the
//! backend must still authorize every request it serves. Callers reusing the guard
//! must not treat `Admitted` as proof of anything beyond "render the view".

use chrono::{DateTime, Utc};

use crate::models::RoleCode;
use crate::session::{SessionFlow, SessionStore};

pub const FORBIDDEN_ROUTE: &str = "/403";
pub const ADMIN_LOGIN_ROUTE: &str = "/admin/login-admin";
pub const HOME_LOGIN_ROUTE: &str = "/";

/// RequiredRole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRole {
    Any,
    Administrator,
}

/// Decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Admitted,
    Denied(String),
}

/// decide
///
/// The pure admission rule, evaluated in fixed order:
/// 1. administrator required but the current role is not administrator → `/403`;
/// 2. the flow's session is not valid → the flow's login route;
/// 3. otherwise admitted.
pub fn decide(
    required: RequiredRole,
    current_role: Option<RoleCode>,
    session_valid: bool,
    login_route: &str,
) -> Decision {
    if required == RequiredRole::Administrator && current_role != Some(RoleCode::Administrator) {
        return Decision::Denied(FORBIDDEN_ROUTE.to_string());
    }
    if !session_valid {
        return Decision::Denied(login_route.to_string());
    }
    Decision::Admitted
}

/// GuardPolicy
///
/// What a protected view declares about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    pub required: RequiredRole,
    pub flow: SessionFlow,
    pub login_route: &'static str,
}

impl GuardPolicy {
    /// Admin console views: administrator role plus an unexpired admin session.
    pub fn admin() -> Self {
        Self {
            required: RequiredRole::Administrator,
            flow: SessionFlow::Admin,
            login_route: ADMIN_LOGIN_ROUTE,
        }
    }

    /// Visitor views: any role with an SSO session present.
    pub fn visitor() -> Self {
        Self {
            required: RequiredRole::Any,
            flow: SessionFlow::Sso,
            login_route: HOME_LOGIN_ROUTE,
        }
    }
}

/// GuardState
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Admitted,
    Denied { target: String },
}

/// GuardActivation
///
/// One activation of a guarded view. It starts in `Checking`, is evaluated exactly once,
/// and holds nothing across activations: a session revoked elsewhere is noticed on the
/// next activation. While the state is not `Admitted` the view renders nothing.
#[derive(Debug)]
pub struct GuardActivation {
    policy: GuardPolicy,
    state: GuardState,
    redirect_taken: bool,
}

impl GuardActivation {
    pub fn new(policy: GuardPolicy) -> Self {
        Self {
            policy,
            state: GuardState::Checking,
            redirect_taken: false,
        }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn is_admitted(&self) -> bool {
        self.state == GuardState::Admitted
    }

    /// Runs the admission rule against the store. Later calls return the settled state
    /// without re-reading the store.
    pub fn evaluate(&mut self, store: &SessionStore, now: DateTime<Utc>) -> &GuardState {
        if self.state != GuardState::Checking {
            return &self.state;
        }

        let current_role = store.sso_session().and_then(|s| s.role());
        let session_valid = store.is_valid(self.policy.flow, now);

        // An expired admin session is destroyed once it is detected.
        if self.policy.flow == SessionFlow::Admin && !session_valid {
            store.clear(SessionFlow::Admin);
        }

        self.state = match decide(
            self.policy.required,
            current_role,
            session_valid,
            self.policy.login_route,
        ) {
            Decision::Admitted => GuardState::Admitted,
            Decision::Denied(target) => {
                tracing::debug!(%target, "guard denied view activation");
                GuardState::Denied { target }
            }
        };
        &self.state
    }

    /// The redirect target of a denied activation, handed out once.
    pub fn take_redirect(&mut self) -> Option<String> {
        match &self.state {
            GuardState::Denied { target } if !self.redirect_taken => {
                self.redirect_taken = true;
                Some(target.clone())
            }
            _ => None,
        }
    }
}
