use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::BackendError;
use crate::pipeline::{Identified, paginate::PaginationInfo};

// --- Roles ---

/// Label rendered for any role code outside the known set.
pub const UNRECOGNIZED_ROLE_LABEL: &str = "unrecognized";

/// RoleCode
///
/// The enumerated numeric role codes the backend assigns, one per user record.
/// Records keep the raw `i64` so an unknown code never fails deserialization; this enum
/// is the lookup side used for labels, icons and the administrator check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoleCode {
    Administrator,
    ResearchOfficer,
    GeneralUser,
    ExternalCollaborator,
    DataCurator,
    Other,
}

impl RoleCode {
    /// All known roles in ascending code order.
    pub const ALL: [RoleCode; 6] = [
        RoleCode::Administrator,
        RoleCode::ResearchOfficer,
        RoleCode::GeneralUser,
        RoleCode::ExternalCollaborator,
        RoleCode::DataCurator,
        RoleCode::Other,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1000 => Some(RoleCode::Administrator),
            2000 => Some(RoleCode::ResearchOfficer),
            3000 => Some(RoleCode::GeneralUser),
            4000 => Some(RoleCode::ExternalCollaborator),
            5000 => Some(RoleCode::DataCurator),
            6000 => Some(RoleCode::Other),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            RoleCode::Administrator => 1000,
            RoleCode::ResearchOfficer => 2000,
            RoleCode::GeneralUser => 3000,
            RoleCode::ExternalCollaborator => 4000,
            RoleCode::DataCurator => 5000,
            RoleCode::Other => 6000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RoleCode::Administrator => "ผู้ดูแลระบบ",
            RoleCode::ResearchOfficer => "เจ้าหน้าที่วิจัย",
            RoleCode::GeneralUser => "ผู้ใช้งานทั่วไป",
            RoleCode::ExternalCollaborator => "ผู้ร่วมวิจัยภายนอก",
            RoleCode::DataCurator => "ผู้บ่มข้อมูล",
            RoleCode::Other => "อื่นๆ",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            RoleCode::Administrator => "🔴",
            RoleCode::ResearchOfficer => "🔵",
            RoleCode::GeneralUser => "⚪",
            RoleCode::ExternalCollaborator => "🟠",
            RoleCode::DataCurator => "🟢",
            RoleCode::Other => "🟣",
        }
    }
}

/// Display label for a raw role code. Unknown codes render as "unrecognized".
pub fn role_label(code: i64) -> &'static str {
    RoleCode::from_code(code)
        .map(RoleCode::label)
        .unwrap_or(UNRECOGNIZED_ROLE_LABEL)
}

/// Marker icon for a raw role code, empty for unknown codes.
pub fn role_icon(code: i64) -> &'static str {
    RoleCode::from_code(code).map(RoleCode::icon).unwrap_or("")
}

// --- Backend Records ---

/// Profile
///
/// Free-form profile blob attached to both SSO sessions and user records. The named
/// fields are the ones display-name resolution reads; everything else is kept verbatim
/// in `extra` so the detail view can show the full profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
pub struct Profile {
    #[serde(default, deserialize_with = "lenient_text")]
    pub fullname: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub username: Option<String>,
    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

/// UserAccount
///
/// A user record as returned by `/api/admin/users` and `/api/admin/users/{uuid}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
pub struct UserAccount {
    pub user_pk_uuid: Uuid,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub roles_id: i64,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl Identified for UserAccount {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.user_pk_uuid
    }
}

/// Finding
///
/// A research finding report from `/api/master/form-new-findings`. Columns the console
/// does not interpret are preserved in `extra` and flow into the spreadsheet export.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
pub struct Finding {
    pub findings_pk_id: i64,
    #[serde(default)]
    pub report_code: Option<String>,
    #[serde(default)]
    pub report_title_th: Option<String>,
    #[serde(default)]
    pub report_title_en: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

impl Identified for Finding {
    type Id = i64;

    fn id(&self) -> i64 {
        self.findings_pk_id
    }
}

/// StatusTone
///
/// Badge tone derived from a finding's free-text status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum StatusTone {
    Confirmed,
    Pending,
    Neutral,
}

impl StatusTone {
    pub fn for_status(status: Option<&str>) -> Self {
        match status {
            Some(s) if s.contains("ยืนยันความถูกต้อง") => StatusTone::Confirmed,
            Some(s) if s.contains("รอตรวจสอบ") => StatusTone::Pending,
            _ => StatusTone::Neutral,
        }
    }
}

/// RoleChangeLog
///
/// One entry of `/api/admin/users/{uuid}/role-log`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RoleChangeLog {
    pub log_id: i64,
    #[serde(default)]
    pub old_role_name: Option<String>,
    #[serde(default)]
    pub new_role_name: Option<String>,
    #[serde(default)]
    pub changed_by: Option<String>,
    #[ts(type = "string")]
    pub changed_at: DateTime<Utc>,
}

// --- Session Payloads ---

/// SessionUser
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
pub struct SessionUser {
    #[serde(default, deserialize_with = "lenient_text")]
    pub username: Option<String>,
    /// Accepted as a number or a numeric string.
    #[serde(default, deserialize_with = "lenient_code")]
    pub role_code: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub role_name: Option<String>,
}

/// SsoSession
///
/// The JSON blob the SSO callback hands over and the console stores under `psuSession`.
/// Any JSON object is a present session. Fields of the wrong shape read as empty
/// instead of failing the whole blob.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
pub struct SsoSession {
    #[serde(default, deserialize_with = "lenient_object")]
    pub user: SessionUser,
    #[serde(default, deserialize_with = "lenient_optional_object")]
    pub profile: Option<Profile>,
}

impl SsoSession {
    /// Parses a stored or handed-over blob. Only a JSON object is a session.
    pub fn from_blob(raw: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(raw)? {
            value @ Value::Object(_) => serde_json::from_value(value),
            _ => Err(serde::de::Error::custom("session blob is not a JSON object")),
        }
    }

    /// The role this session claims, if the code is a known one.
    pub fn role(&self) -> Option<RoleCode> {
        self.user.role_code.and_then(RoleCode::from_code)
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient_optional_object(deserializer)?.unwrap_or_default())
}

fn lenient_optional_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

// --- Backend Wire Contract ---

/// ApiEnvelope
///
/// The `{ success, data, error? }` envelope wrapped around every backend response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwraps the payload, turning `success: false` into `BackendError::Rejected`.
    pub fn into_data(self) -> Result<Option<T>, BackendError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(BackendError::Rejected(
                self.error.unwrap_or_else(|| "request failed".to_string()),
            ))
        }
    }
}

/// UpdateRoleRequest
///
/// Body of `PUT /api/admin/users/{uuid}/role` on the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateRoleRequest {
    pub roles_id: i64,
    pub changed_by: String,
}

/// AdminLoginRequest
///
/// Credentials posted to the console's admin login view and forwarded to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// LoginSession
///
/// `expiresAt` is read leniently: RFC 3339, an offset-less date-time or plain date
/// (taken as UTC), RFC 2822, or epoch milliseconds. Anything else reads as absent,
/// which the login exchange treats as a rejection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoginSession {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "expiresAt", deserialize_with = "lenient_instant")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn lenient_instant<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => parse_instant(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    })
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    }
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// AdminLoginResponse
///
/// Backend reply to `POST /api/login-api-triup/login`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminLoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub session: Option<LoginSession>,
    #[serde(default)]
    pub error: Option<String>,
}

// --- Console Request Payloads ---

/// ChangeRoleRequest
///
/// Input payload for `PUT /admin/users-data/{uuid}/role`. The acting admin is resolved
/// from the session, never taken from the request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangeRoleRequest {
    pub roles_id: i64,
}

/// SidebarPreference
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct SidebarPreference {
    pub open: bool,
}

// --- View Models (Output) ---

/// RoleOption
///
/// One entry of the role dropdown: code, label, icon and how many loaded users hold it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RoleOption {
    pub code: i64,
    pub label: String,
    pub icon: String,
    pub count: usize,
}

/// UserRow
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UserRow {
    pub user_pk_uuid: Uuid,
    pub username: String,
    /// Profile full name, or "-" when the profile has none.
    pub fullname: String,
    pub roles_id: i64,
    pub role_label: String,
    pub role_icon: String,
}

impl From<&UserAccount> for UserRow {
    fn from(user: &UserAccount) -> Self {
        let fullname = user
            .profile
            .as_ref()
            .and_then(|p| p.fullname.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("-")
            .to_string();

        Self {
            user_pk_uuid: user.user_pk_uuid,
            username: user.username.clone(),
            fullname,
            roles_id: user.roles_id,
            role_label: role_label(user.roles_id).to_string(),
            role_icon: role_icon(user.roles_id).to_string(),
        }
    }
}

/// UsersPage
///
/// Output of `GET /admin/users-data`: the visible page of the filtered user list plus
/// everything the view needs to render its filter bar and pagination.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UsersPage {
    pub rows: Vec<UserRow>,
    pub pagination: PaginationInfo,
    pub search: String,
    /// The active role filter: `"all"` or a role code.
    pub role: String,
    pub role_options: Vec<RoleOption>,
    /// Inline load error; the page stays interactive when set.
    pub error: Option<String>,
}

/// FindingRow
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct FindingRow {
    pub findings_pk_id: i64,
    pub report_code: String,
    pub report_title_th: String,
    pub report_title_en: String,
    pub status: String,
    pub status_tone: StatusTone,
}

impl From<&Finding> for FindingRow {
    fn from(finding: &Finding) -> Self {
        Self {
            findings_pk_id: finding.findings_pk_id,
            report_code: finding.report_code.clone().unwrap_or_default(),
            report_title_th: finding.report_title_th.clone().unwrap_or_default(),
            report_title_en: finding.report_title_en.clone().unwrap_or_default(),
            status: finding.status.clone().unwrap_or_default(),
            status_tone: StatusTone::for_status(finding.status.as_deref()),
        }
    }
}

/// FindingsPage
///
/// Output of `GET /user-psu/home`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FindingsPage {
    pub rows: Vec<FindingRow>,
    pub pagination: PaginationInfo,
    pub search: String,
    pub status: String,
    /// Distinct statuses of the loaded findings, first-seen order.
    pub status_options: Vec<String>,
    pub error: Option<String>,
}

/// UserDetailView
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserDetailView {
    #[schema(value_type = Object)]
    pub user: UserAccount,
    pub role_label: String,
    pub logs: Vec<RoleChangeLog>,
    pub roles: Vec<RoleOption>,
    pub error: Option<String>,
}

/// StatusCount
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

/// DashboardView
///
/// Output of `GET /admin/dashboard`: the greeting plus the user and finding statistics.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardView {
    pub display_name: String,
    pub role_name: String,
    pub total_users: usize,
    pub users_by_role: Vec<RoleOption>,
    pub total_findings: usize,
    pub findings_by_status: Vec<StatusCount>,
    pub error: Option<String>,
}

/// NavLink
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct NavLink {
    pub href: String,
    pub label: String,
}

/// SidebarView
///
/// Everything the layout shell renders around a view. `admin_links` is empty unless the
/// SSO session claims the administrator role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SidebarView {
    pub open: bool,
    pub display_name: String,
    pub role_name: String,
    pub links: Vec<NavLink>,
    pub admin_links: Vec<NavLink>,
}

/// LoginPrompt
///
/// Message shown by the login landings and by the SSO callback when it has nothing
/// to store.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginPrompt {
    pub message: String,
}
