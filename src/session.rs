use chrono::{DateTime, Utc};

use crate::models::{Profile, SsoSession};
use crate::storage::StorageState;

// --- Persisted Keys ---

pub const TOKEN_KEY: &str = "token";
pub const TOKEN_EXP_KEY: &str = "token_exp";
pub const SSO_SESSION_KEY: &str = "psuSession";
pub const SIDEBAR_OPEN_KEY: &str = "sidebar:open";

/// AdminSession
///
/// The admin flow's opaque credential plus its absolute expiry. The credential is never
/// inspected or verified locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub credential: String,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.credential.is_empty() && now < self.expires_at
    }
}

/// SessionFlow
///
/// Selects which of the two independently stored sessions an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlow {
    /// `token` + `token_exp`, expiry checked.
    Admin,
    /// `psuSession` JSON blob, presence only.
    Sso,
}

/// Session
///
/// The two session schemas the console carries, kept as variants of one type rather
/// than merged.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Admin(AdminSession),
    Sso(SsoSession),
}

impl Session {
    /// Admin sessions are valid strictly before their expiry; an SSO session is valid by
    /// being present.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Session::Admin(admin) => admin.is_valid_at(now),
            Session::Sso(_) => true,
        }
    }
}

/// SessionStore
///
/// Persists and retrieves both sessions over the injected key/value substrate.
///
/// Every operation is best-effort: a disabled or full store is logged and then treated
/// exactly like a missing session, so the guard still reaches a deterministic (denying)
/// decision. Malformed stored data also reads back as absent.
#[derive(Clone)]
pub struct SessionStore {
    storage: StorageState,
}

impl SessionStore {
    pub fn new(storage: StorageState) -> Self {
        Self { storage }
    }

    /// Returns false when the substrate rejected any part of the write.
    pub fn save(&self, session: &Session) -> bool {
        match session {
            Session::Admin(admin) => {
                let exp_ms = admin.expires_at.timestamp_millis().to_string();
                self.set(TOKEN_KEY, &admin.credential) && self.set(TOKEN_EXP_KEY, &exp_ms)
            }
            Session::Sso(sso) => match serde_json::to_string(sso) {
                Ok(raw) => self.set(SSO_SESSION_KEY, &raw),
                Err(e) => {
                    tracing::warn!("could not encode sso session: {}", e);
                    false
                }
            },
        }
    }

    /// Stores the raw SSO blob as handed over by the login callback. Anything that is not
    /// a JSON object is refused so a later load cannot flip between present and absent.
    pub fn save_sso_blob(&self, raw: &str) -> bool {
        match SsoSession::from_blob(raw) {
            Ok(_) => self.set(SSO_SESSION_KEY, raw),
            Err(e) => {
                tracing::warn!("refusing malformed sso session blob: {}", e);
                false
            }
        }
    }

    pub fn load(&self, flow: SessionFlow) -> Option<Session> {
        match flow {
            SessionFlow::Admin => self.admin_session().map(Session::Admin),
            SessionFlow::Sso => self.sso_session().map(Session::Sso),
        }
    }

    pub fn admin_session(&self) -> Option<AdminSession> {
        let credential = self.get(TOKEN_KEY)?;
        let raw_exp = self.get(TOKEN_EXP_KEY)?;
        if credential.is_empty() {
            return None;
        }

        let expires_at = raw_exp
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        match expires_at {
            Some(expires_at) => Some(AdminSession {
                credential,
                expires_at,
            }),
            None => {
                tracing::debug!("ignoring admin session with unreadable expiry {:?}", raw_exp);
                None
            }
        }
    }

    pub fn sso_session(&self) -> Option<SsoSession> {
        let raw = self.get(SSO_SESSION_KEY)?;
        match SsoSession::from_blob(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("ignoring malformed sso session: {}", e);
                None
            }
        }
    }

    /// Idempotent; clearing an absent session is a no-op.
    pub fn clear(&self, flow: SessionFlow) {
        match flow {
            SessionFlow::Admin => {
                self.remove(TOKEN_KEY);
                self.remove(TOKEN_EXP_KEY);
            }
            SessionFlow::Sso => self.remove(SSO_SESSION_KEY),
        }
    }

    pub fn is_valid(&self, flow: SessionFlow, now: DateTime<Utc>) -> bool {
        self.load(flow).is_some_and(|s| s.is_valid_at(now))
    }

    pub fn preferences(&self) -> UiPreferences {
        UiPreferences {
            storage: self.storage.clone(),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        match self.storage.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, "storage read failed, treating as absent: {}", e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> bool {
        match self.storage.set_item(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, "storage write failed: {}", e);
                false
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(key) {
            tracing::warn!(key, "storage remove failed: {}", e);
        }
    }
}

/// UiPreferences
///
/// Non-security UI state that shares the substrate with the sessions.
#[derive(Clone)]
pub struct UiPreferences {
    storage: StorageState,
}

impl UiPreferences {
    pub fn sidebar_open(&self) -> bool {
        match self.storage.get_item(SIDEBAR_OPEN_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                tracing::warn!("sidebar preference unreadable: {}", e);
                false
            }
        }
    }

    pub fn set_sidebar_open(&self, open: bool) {
        let value = if open { "true" } else { "false" };
        if let Err(e) = self.storage.set_item(SIDEBAR_OPEN_KEY, value) {
            tracing::warn!("sidebar preference not saved: {}", e);
        }
    }
}

// --- Display-Name Resolution ---

/// NameSource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// `profile.fullname`
    Fullname,
    /// `profile.first_name` and `profile.last_name` joined by a space.
    FirstLast,
    /// `user.username`
    Username,
    /// `profile.username`
    ProfileUsername,
}

/// DisplayNamePolicy
///
/// An ordered list of candidate name sources. The first one that yields a non-empty
/// (trimmed) value wins; otherwise the fallback is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNamePolicy {
    pub sources: Vec<NameSource>,
    pub fallback: &'static str,
}

impl DisplayNamePolicy {
    /// Name shown in the layout's top bar.
    pub fn sidebar() -> Self {
        Self {
            sources: vec![NameSource::Fullname, NameSource::FirstLast, NameSource::Username],
            fallback: "Guest",
        }
    }

    /// Greeting on the admin dashboard.
    pub fn dashboard() -> Self {
        Self {
            sources: vec![NameSource::Fullname, NameSource::FirstLast, NameSource::Username],
            fallback: "Admin",
        }
    }

    /// Actor recorded as `changed_by` on role updates.
    pub fn audit_actor() -> Self {
        Self {
            sources: vec![
                NameSource::Username,
                NameSource::ProfileUsername,
                NameSource::FirstLast,
            ],
            fallback: "unknown",
        }
    }

    pub fn resolve(&self, session: Option<&SsoSession>) -> String {
        session
            .and_then(|s| {
                self.sources
                    .iter()
                    .filter_map(|source| candidate(*source, s))
                    .next()
            })
            .unwrap_or_else(|| self.fallback.to_string())
    }
}

fn candidate(source: NameSource, session: &SsoSession) -> Option<String> {
    let profile: Option<&Profile> = session.profile.as_ref();
    let value = match source {
        NameSource::Fullname => profile.and_then(|p| p.fullname.clone()),
        NameSource::FirstLast => profile.map(|p| {
            format!(
                "{} {}",
                p.first_name.as_deref().unwrap_or(""),
                p.last_name.as_deref().unwrap_or("")
            )
        }),
        NameSource::Username => session.user.username.clone(),
        NameSource::ProfileUsername => profile.and_then(|p| p.username.clone()),
    }?;

    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
