use super::*;
use crate::test_support::{FakeLibrary, signed_in_app};
use reqwest::Method;
use serde_json::json;

#[tokio::test]
async fn load_fetches_users_and_stats() {
    let fake = FakeLibrary::new();
    let admin = fake.add_user("Root", "root@example.com", "secret1", Role::Admin);
    fake.add_user("Ada", "ada@example.com", "secret1", Role::Member);
    let app = signed_in_app(&fake, &admin);
    let mut view = AdminUsersView::new(app.api().clone());

    view.load().await.unwrap();

    assert_eq!(view.users().len(), 2);
    let stats = view.stats().unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.users_by_role.admin, 1);
    assert_eq!(stats.users_by_role.member, 1);
}

#[tokio::test]
async fn stats_failure_is_not_surfaced() {
    let fake = FakeLibrary::new();
    let admin = fake.add_user("Root", "root@example.com", "secret1", Role::Admin);
    fake.respond_with(Method::GET, "/users/statistics/all", 500, json!({ "message": "boom" }));
    let app = signed_in_app(&fake, &admin);
    let mut view = AdminUsersView::new(app.api().clone());

    view.load().await.unwrap();
    assert_eq!(view.users().len(), 1);
    assert!(view.stats().is_none());
}

#[tokio::test]
async fn search_filters_with_admin_limit() {
    let fake = FakeLibrary::new();
    let admin = fake.add_user("Root", "root@example.com", "secret1", Role::Admin);
    fake.add_user("Ada", "ada@example.com", "secret1", Role::Member);
    let app = signed_in_app(&fake, &admin);
    let mut view = AdminUsersView::new(app.api().clone());

    view.set_search("ada").await.unwrap();
    assert_eq!(view.users().len(), 1);
    assert_eq!(view.users()[0].name, "Ada");

    let list = fake.requests().into_iter().find(|r| r.path == "/users").unwrap();
    assert_eq!(list.query_value("search"), Some("ada"));
    assert_eq!(list.query_value("limit"), Some("100"));
}

#[tokio::test]
async fn mutations_refetch_the_list() {
    let fake = FakeLibrary::new();
    let admin = fake.add_user("Root", "root@example.com", "secret1", Role::Admin);
    let member = fake.add_user("Ada", "ada@example.com", "secret1", Role::Member);
    let app = signed_in_app(&fake, &admin);
    let mut view = AdminUsersView::new(app.api().clone());
    view.load().await.unwrap();

    view.toggle_status(&member.id).await.unwrap();
    let ada = view.users().iter().find(|u| u.id == member.id).unwrap();
    assert!(!ada.is_active);

    view.change_role(&member.id, Role::Librarian).await.unwrap();
    let ada = view.users().iter().find(|u| u.id == member.id).unwrap();
    assert_eq!(ada.role, Role::Librarian);

    view.delete(&member.id).await.unwrap();
    assert_eq!(view.users().len(), 1);
    assert_eq!(fake.count(&Method::GET, "/users"), 4);
}

#[tokio::test]
async fn librarian_is_refused_by_the_server() {
    let fake = FakeLibrary::new();
    let librarian = fake.add_user("Lib", "lib@example.com", "secret1", Role::Librarian);
    let app = signed_in_app(&fake, &librarian);
    let mut view = AdminUsersView::new(app.api().clone());

    let err = view.load().await.unwrap_err();
    assert_eq!(err.to_string(), "Access denied");
    assert!(app.session().token().is_some());
}
