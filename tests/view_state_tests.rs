mod common;

use triup_console::{
    error::BackendError,
    handlers::{findings_view, users_view},
    models::UserAccount,
    view::{DetailView, LoadStatus},
};

#[test]
fn test_list_view_starts_loading() {
    let view = findings_view(5);
    assert_eq!(view.status(), &LoadStatus::Loading);
    assert!(view.records().is_empty());
    assert_eq!(view.pagination().total_pages, 1);
}

#[test]
fn test_stale_list_response_is_dropped() {
    let mut view = findings_view(5);

    let first = view.begin_load();
    let second = view.begin_load();

    assert!(view.finish_load(second, Ok(vec![common::finding(2, "RC-002", "New", "draft")])));
    assert!(!view.finish_load(first, Ok(vec![common::finding(1, "RC-001", "Old", "draft")])));

    assert_eq!(view.records().len(), 1);
    assert_eq!(view.records()[0].findings_pk_id, 2);
    assert_eq!(view.status(), &LoadStatus::Loaded);
}

#[test]
fn test_one_shot_load_applies_and_supersedes_pending_loads() {
    let mut view = findings_view(5);
    let pending = view.begin_load();

    view.load(Ok(vec![common::finding(3, "RC-003", "Fresh", "draft")]));
    assert_eq!(view.status(), &LoadStatus::Loaded);
    assert_eq!(view.records()[0].findings_pk_id, 3);

    assert!(!view.finish_load(pending, Ok(Vec::new())));
    assert_eq!(view.records().len(), 1);

    view.load(Err(BackendError::Rejected("server down".to_string())));
    assert_eq!(view.error().as_deref(), Some("server down"));
}

#[test]
fn test_failed_load_is_reported_inline() {
    let mut view = users_view(10);
    let ticket = view.begin_load();
    view.finish_load(ticket, Err(BackendError::Rejected("server down".to_string())));

    assert_eq!(view.error().as_deref(), Some("server down"));
    assert!(view.page().is_empty());
    assert_eq!(view.pagination().current_page, 1);
}

#[test]
fn test_reload_after_failure_recovers() {
    let mut view = users_view(10);
    let ticket = view.begin_load();
    view.finish_load(ticket, Err(BackendError::NotFound));

    let ticket = view.begin_load();
    view.finish_load(ticket, Ok(vec![common::user("malee", None, 3000)]));
    assert_eq!(view.error(), None);
    assert_eq!(view.page().len(), 1);
}

#[test]
fn test_detail_view_ignores_previous_request() {
    let old = common::user("somchai", None, 1000);
    let new = common::user("malee", None, 3000);

    let mut detail: DetailView<UserAccount> = DetailView::new();
    detail.request(old.user_pk_uuid);
    detail.request(new.user_pk_uuid);

    assert!(!detail.apply(&old.user_pk_uuid, Ok(old.clone())));
    assert!(detail.record().is_none());

    assert!(detail.apply(&new.user_pk_uuid, Ok(new.clone())));
    assert_eq!(detail.record().map(|u| u.username.as_str()), Some("malee"));
    assert_eq!(detail.requested(), Some(&new.user_pk_uuid));
}

#[test]
fn test_detail_view_rejects_record_with_other_id() {
    let wanted = common::user("somchai", None, 1000);
    let other = common::user("malee", None, 3000);

    let mut detail: DetailView<UserAccount> = DetailView::new();
    detail.request(wanted.user_pk_uuid);

    assert!(!detail.apply(&wanted.user_pk_uuid, Ok(other)));
    assert!(detail.record().is_none());
    assert_eq!(detail.status(), &LoadStatus::Loading);
}

#[test]
fn test_detail_view_failure() {
    let wanted = common::user("somchai", None, 1000);

    let mut detail: DetailView<UserAccount> = DetailView::new();
    detail.request(wanted.user_pk_uuid);

    assert!(detail.apply(&wanted.user_pk_uuid, Err(BackendError::NotFound)));
    assert_eq!(
        detail.status(),
        &LoadStatus::Failed("record not found".to_string())
    );
}
