use crate::{
    AppConfig,
    auth::{AdminAccess, VisitorAccess, exchange_admin_login},
    backend::BackendState,
    error::{BackendError, ConsoleError},
    guard::{ADMIN_LOGIN_ROUTE, HOME_LOGIN_ROUTE},
    models::{
        AdminLoginRequest, ChangeRoleRequest, DashboardView, Finding, FindingRow, FindingsPage,
        LoginPrompt, NavLink, RoleChangeLog, RoleCode, RoleOption, SidebarPreference,
        SidebarView, StatusCount, UNRECOGNIZED_ROLE_LABEL, UpdateRoleRequest, UserAccount,
        UserDetailView, UserRow, UsersPage, role_label,
    },
    pipeline::{
        Column, ExportBlob, FilterCriteria, FilterEngine, Paginator,
        export::{EncoderState, to_delimited_text, to_spreadsheet},
    },
    session::{DisplayNamePolicy, SessionFlow, SessionStore},
    view::{DetailView, ListView},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const ADMIN_HOME_ROUTE: &str = "/admin/dashboard";
pub const VISITOR_HOME_ROUTE: &str = "/user-psu/home";
pub const FINDINGS_CSV_FILENAME: &str = "findings.csv";
pub const FINDINGS_XLSX_FILENAME: &str = "findings.xlsx";
pub const FINDINGS_SHEET_NAME: &str = "Findings";

// --- Query Structs ---

/// UsersQuery
///
/// Filter and page parameters of the user management list (GET /admin/users-data).
#[derive(Deserialize, utoipa::IntoParams, Default)]
pub struct UsersQuery {
    /// Free-text search over username, full name and role label.
    pub search: Option<String>,
    /// Role code to keep, or "all".
    pub role: Option<String>,
    /// 1-based page; clamped into range.
    pub page: Option<usize>,
}

/// FindingsQuery
///
/// Filter and page parameters of the findings list and its exports.
#[derive(Deserialize, utoipa::IntoParams, Default)]
pub struct FindingsQuery {
    /// Free-text search over report code, both titles and status.
    pub search: Option<String>,
    /// Status to keep, or "all".
    pub status: Option<String>,
    /// 1-based page; clamped into range. Ignored by the exports.
    pub page: Option<usize>,
}

/// LoginSuccessQuery
#[derive(Deserialize, utoipa::IntoParams)]
pub struct LoginSuccessQuery {
    /// JSON-encoded SSO session blob.
    pub session: Option<String>,
}

// --- View Assembly ---

/// The user list: categorised by role code, searchable by username, full name and the
/// role's display label.
pub fn users_view(page_size: usize) -> ListView<UserAccount> {
    let engine = FilterEngine::new(|u: &UserAccount| Some(u.roles_id.to_string()))
        .search_field(|u: &UserAccount| Some(u.username.clone()))
        .search_field(|u: &UserAccount| u.profile.as_ref().and_then(|p| p.fullname.clone()))
        .search_field(|u: &UserAccount| {
            RoleCode::from_code(u.roles_id).map(|r| r.label().to_string())
        });
    ListView::new(engine, Paginator::new(page_size))
}

/// The findings list: categorised by status.
pub fn findings_view(page_size: usize) -> ListView<Finding> {
    let engine = FilterEngine::new(|f: &Finding| f.status.clone())
        .search_field(|f: &Finding| f.report_code.clone())
        .search_field(|f: &Finding| f.report_title_th.clone())
        .search_field(|f: &Finding| f.report_title_en.clone())
        .search_field(|f: &Finding| f.status.clone());
    ListView::new(engine, Paginator::new(page_size))
}

/// Export columns of `findings.csv`, independent of the table's display columns.
pub fn findings_csv_columns() -> Vec<Column<Finding>> {
    vec![
        Column::new("Report Code", |f: &Finding| f.report_code.clone().unwrap_or_default()),
        Column::new("Title TH", |f: &Finding| f.report_title_th.clone().unwrap_or_default()),
        Column::new("Title EN", |f: &Finding| f.report_title_en.clone().unwrap_or_default()),
        Column::new("Status", |f: &Finding| f.status.clone().unwrap_or_default()),
    ]
}

fn role_options(counts: &BTreeMap<String, usize>) -> Vec<RoleOption> {
    RoleCode::ALL
        .iter()
        .map(|role| RoleOption {
            code: role.code(),
            label: role.label().to_string(),
            icon: role.icon().to_string(),
            count: counts.get(&role.code().to_string()).copied().unwrap_or(0),
        })
        .collect()
}

async fn load_findings(
    backend: &BackendState,
    config: &AppConfig,
    query: &FindingsQuery,
) -> ListView<Finding> {
    let mut view = findings_view(config.findings_page_size);
    view.load(backend.list_findings().await);
    view.set_criteria(FilterCriteria::from_params(
        query.search.clone(),
        query.status.as_deref(),
    ));
    view.set_page(query.page.unwrap_or(1));
    view
}

fn download(blob: ExportBlob, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, blob.mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        blob.bytes,
    )
        .into_response()
}

// --- Handlers ---

/// forbidden
///
/// [Public Route] Target of a guard denial for a missing administrator role.
#[utoipa::path(
    get,
    path = "/403",
    responses((status = 403, description = "Forbidden"))
)]
pub async fn forbidden() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "status": 403, "message": "you do not have permission to view this page" })),
    )
}

/// login_prompt
///
/// [Public Route] Visitor login landing; the actual sign-in happens at the SSO provider,
/// which hands back to `/login-success`.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Login prompt", body = LoginPrompt))
)]
pub async fn login_prompt() -> Json<LoginPrompt> {
    Json(LoginPrompt {
        message: "sign in with your PSU account".to_string(),
    })
}

/// admin_login_form
#[utoipa::path(
    get,
    path = "/admin/login-admin",
    responses((status = 200, description = "Admin login prompt", body = LoginPrompt))
)]
pub async fn admin_login_form() -> Json<LoginPrompt> {
    Json(LoginPrompt {
        message: "enter your administrator email and password".to_string(),
    })
}

/// login_success
///
/// [Public Route] SSO callback. Stores the handed-over session blob as `psuSession` and
/// continues to the visitor home; without a usable blob it renders a neutral prompt.
#[utoipa::path(
    get,
    path = "/login-success",
    params(LoginSuccessQuery),
    responses(
        (status = 303, description = "Session stored, redirect to home"),
        (status = 200, description = "Nothing to store", body = LoginPrompt)
    )
)]
pub async fn login_success(
    State(sessions): State<SessionStore>,
    Query(query): Query<LoginSuccessQuery>,
) -> Response {
    if let Some(raw) = query.session.as_deref() {
        if sessions.save_sso_blob(raw) {
            tracing::info!("sso session stored");
            return Redirect::to(VISITOR_HOME_ROUTE).into_response();
        }
    }

    Json(LoginPrompt {
        message: "signing in...".to_string(),
    })
    .into_response()
}

/// admin_login
///
/// [Public Route] Admin login exchange. On success the admin session is persisted and
/// the operator is sent to the dashboard.
#[utoipa::path(
    post,
    path = "/admin/login-admin",
    request_body = AdminLoginRequest,
    responses(
        (status = 303, description = "Logged in, redirect to dashboard"),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Rejected by the backend")
    )
)]
pub async fn admin_login(
    State(backend): State<BackendState>,
    State(sessions): State<SessionStore>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Redirect, ConsoleError> {
    exchange_admin_login(backend.as_ref(), &sessions, &payload).await?;
    Ok(Redirect::to(ADMIN_HOME_ROUTE))
}

/// sign_out
///
/// [Public Route] Destroys the SSO session.
#[utoipa::path(
    post,
    path = "/sign-out",
    responses((status = 303, description = "Signed out"))
)]
pub async fn sign_out(State(sessions): State<SessionStore>) -> Redirect {
    sessions.clear(SessionFlow::Sso);
    Redirect::to(HOME_LOGIN_ROUTE)
}

/// admin_sign_out
///
/// [Public Route] Destroys the admin session.
#[utoipa::path(
    post,
    path = "/admin/sign-out",
    responses((status = 303, description = "Signed out"))
)]
pub async fn admin_sign_out(State(sessions): State<SessionStore>) -> Redirect {
    sessions.clear(SessionFlow::Admin);
    Redirect::to(ADMIN_LOGIN_ROUTE)
}

/// get_sidebar_preference
#[utoipa::path(
    get,
    path = "/preferences/sidebar",
    responses((status = 200, description = "Sidebar state", body = SidebarPreference))
)]
pub async fn get_sidebar_preference(
    State(sessions): State<SessionStore>,
) -> Json<SidebarPreference> {
    Json(SidebarPreference {
        open: sessions.preferences().sidebar_open(),
    })
}

/// put_sidebar_preference
#[utoipa::path(
    put,
    path = "/preferences/sidebar",
    request_body = SidebarPreference,
    responses((status = 200, description = "Sidebar state", body = SidebarPreference))
)]
pub async fn put_sidebar_preference(
    State(sessions): State<SessionStore>,
    Json(payload): Json<SidebarPreference>,
) -> Json<SidebarPreference> {
    let preferences = sessions.preferences();
    preferences.set_sidebar_open(payload.open);
    Json(SidebarPreference {
        open: preferences.sidebar_open(),
    })
}

/// get_sidebar
///
/// [Public Route] Layout shell: display name, role name and navigation. The admin
/// section is listed only when the SSO session claims the administrator role, using
/// the same role inspection as the guard.
#[utoipa::path(
    get,
    path = "/layout/sidebar",
    responses((status = 200, description = "Layout", body = SidebarView))
)]
pub async fn get_sidebar(State(sessions): State<SessionStore>) -> Json<SidebarView> {
    let session = sessions.sso_session();
    let is_admin = session.as_ref().and_then(|s| s.role()) == Some(RoleCode::Administrator);

    let role_name = session
        .as_ref()
        .and_then(|s| s.user.role_name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNRECOGNIZED_ROLE_LABEL.to_string());

    let admin_links = if is_admin {
        vec![
            NavLink {
                href: ADMIN_HOME_ROUTE.to_string(),
                label: "Dashboard".to_string(),
            },
            NavLink {
                href: "/admin/users-data".to_string(),
                label: "Manage Users".to_string(),
            },
        ]
    } else {
        Vec::new()
    };

    Json(SidebarView {
        open: sessions.preferences().sidebar_open(),
        display_name: DisplayNamePolicy::sidebar().resolve(session.as_ref()),
        role_name,
        links: vec![NavLink {
            href: VISITOR_HOME_ROUTE.to_string(),
            label: "Home".to_string(),
        }],
        admin_links,
    })
}

/// findings_home
///
/// [Visitor Route] The findings list: loads every finding, applies the search and status
/// filter, and returns the requested page. A failed load is reported inline.
#[utoipa::path(
    get,
    path = "/user-psu/home",
    params(FindingsQuery),
    responses(
        (status = 200, description = "Findings page", body = FindingsPage),
        (status = 303, description = "No SSO session")
    )
)]
pub async fn findings_home(
    _access: VisitorAccess,
    State(backend): State<BackendState>,
    State(config): State<AppConfig>,
    Query(query): Query<FindingsQuery>,
) -> Json<FindingsPage> {
    let view = load_findings(&backend, &config, &query).await;

    Json(FindingsPage {
        rows: view.page().into_iter().map(FindingRow::from).collect(),
        pagination: view.pagination(),
        search: view.criteria().search_term.clone(),
        status: view.criteria().category.as_param().to_string(),
        status_options: view.engine().categories(view.records()),
        error: view.error(),
    })
}

/// export_findings_csv
///
/// [Visitor Route] Downloads the whole filtered subset (not just one page) as
/// `findings.csv`.
#[utoipa::path(
    get,
    path = "/user-psu/home/export.csv",
    params(FindingsQuery),
    responses((status = 200, description = "findings.csv", content_type = "text/csv"))
)]
pub async fn export_findings_csv(
    _access: VisitorAccess,
    State(backend): State<BackendState>,
    State(config): State<AppConfig>,
    Query(query): Query<FindingsQuery>,
) -> Result<Response, ConsoleError> {
    let view = load_findings(&backend, &config, &query).await;
    if let Some(message) = view.error() {
        return Err(BackendError::Rejected(message).into());
    }

    let blob = to_delimited_text(view.filtered(), &findings_csv_columns());
    Ok(download(blob, FINDINGS_CSV_FILENAME))
}

/// export_findings_xlsx
///
/// [Visitor Route] Downloads the whole filtered subset as `findings.xlsx`, every backend
/// column included. An encoding failure is reported as a notice.
#[utoipa::path(
    get,
    path = "/user-psu/home/export.xlsx",
    params(FindingsQuery),
    responses(
        (status = 200, description = "findings.xlsx"),
        (status = 500, description = "Export notice")
    )
)]
pub async fn export_findings_xlsx(
    _access: VisitorAccess,
    State(backend): State<BackendState>,
    State(config): State<AppConfig>,
    State(encoder): State<EncoderState>,
    Query(query): Query<FindingsQuery>,
) -> Result<Response, ConsoleError> {
    let view = load_findings(&backend, &config, &query).await;
    if let Some(message) = view.error() {
        return Err(BackendError::Rejected(message).into());
    }

    let blob = to_spreadsheet(view.filtered(), FINDINGS_SHEET_NAME, encoder.as_ref())?;
    Ok(download(blob, FINDINGS_XLSX_FILENAME))
}

/// admin_dashboard
///
/// [Admin Route] Greeting plus user counts per role and finding counts per status.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 303, description = "Guard redirect")
    )
)]
pub async fn admin_dashboard(
    access: AdminAccess,
    State(backend): State<BackendState>,
    State(config): State<AppConfig>,
) -> Json<DashboardView> {
    let mut users = users_view(config.users_page_size);
    let mut findings = findings_view(config.findings_page_size);

    let (user_result, finding_result) = tokio::join!(backend.list_users(), backend.list_findings());
    users.load(user_result);
    findings.load(finding_result);

    let status_counts = findings.engine().category_counts(findings.records());
    let findings_by_status = findings
        .engine()
        .categories(findings.records())
        .into_iter()
        .map(|status| StatusCount {
            count: status_counts.get(&status).copied().unwrap_or(0),
            status,
        })
        .collect();

    let error = users.error().or_else(|| findings.error());
    let visitor = access.visitor.as_ref();

    Json(DashboardView {
        display_name: DisplayNamePolicy::dashboard().resolve(visitor),
        role_name: visitor
            .and_then(|s| s.user.role_name.clone())
            .unwrap_or_default(),
        total_users: users.records().len(),
        users_by_role: role_options(&users.engine().category_counts(users.records())),
        total_findings: findings.records().len(),
        findings_by_status,
        error,
    })
}

/// list_users
///
/// [Admin Route] User management list with search, role filter and pagination.
#[utoipa::path(
    get,
    path = "/admin/users-data",
    params(UsersQuery),
    responses(
        (status = 200, description = "Users page", body = UsersPage),
        (status = 303, description = "Guard redirect")
    )
)]
pub async fn list_users(
    _access: AdminAccess,
    State(backend): State<BackendState>,
    State(config): State<AppConfig>,
    Query(query): Query<UsersQuery>,
) -> Json<UsersPage> {
    let mut view = users_view(config.users_page_size);
    view.load(backend.list_users().await);
    view.set_criteria(FilterCriteria::from_params(query.search, query.role.as_deref()));
    view.set_page(query.page.unwrap_or(1));

    Json(UsersPage {
        rows: view.page().into_iter().map(UserRow::from).collect(),
        pagination: view.pagination(),
        search: view.criteria().search_term.clone(),
        role: view.criteria().category.as_param().to_string(),
        role_options: role_options(&view.engine().category_counts(view.records())),
        error: view.error(),
    })
}

/// user_detail
///
/// [Admin Route] One user with the history of role changes.
#[utoipa::path(
    get,
    path = "/admin/users-data/{uuid}",
    params(("uuid" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User detail", body = UserDetailView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn user_detail(
    _access: AdminAccess,
    State(backend): State<BackendState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<UserDetailView>, ConsoleError> {
    let mut detail: DetailView<UserAccount> = DetailView::new();
    detail.request(uuid);
    let fetched = backend.get_user(uuid).await?;
    detail.apply(&uuid, Ok(fetched));

    // A record carrying a different id is never shown.
    let user = detail.record().cloned().ok_or(BackendError::NotFound)?;

    let (logs, error): (Vec<RoleChangeLog>, Option<String>) =
        match backend.role_log(uuid).await {
            Ok(logs) => (logs, None),
            Err(e) => {
                tracing::error!("role log load failed: {}", e);
                (Vec::new(), Some(e.to_string()))
            }
        };

    Ok(Json(UserDetailView {
        role_label: role_label(user.roles_id).to_string(),
        user,
        logs,
        roles: role_options(&BTreeMap::new()),
        error,
    }))
}

/// change_role
///
/// [Admin Route] Submits a role change. The acting admin recorded as `changed_by` is
/// resolved from the session, never taken from the request body.
#[utoipa::path(
    put,
    path = "/admin/users-data/{uuid}/role",
    params(("uuid" = Uuid, Path, description = "User ID")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 204, description = "Role updated"),
        (status = 400, description = "Unknown role code"),
        (status = 502, description = "Backend rejected the change")
    )
)]
pub async fn change_role(
    access: AdminAccess,
    State(backend): State<BackendState>,
    Path(uuid): Path<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<StatusCode, ConsoleError> {
    let role = RoleCode::from_code(payload.roles_id)
        .ok_or(ConsoleError::UnknownRole(payload.roles_id))?;

    let request = UpdateRoleRequest {
        roles_id: role.code(),
        changed_by: DisplayNamePolicy::audit_actor().resolve(access.visitor.as_ref()),
    };

    backend.update_role(uuid, &request).await?;
    tracing::info!(user = %uuid, roles_id = request.roles_id, changed_by = %request.changed_by, "role updated");
    Ok(StatusCode::NO_CONTENT)
}
