//! History log tests
//!
//! History writes are asynchronous (best-effort channel), so these tests
//! poll until the worker has drained.

use salon_admin::models::Role;

use crate::common::{fixtures, TestApp};

#[tokio::test]
async fn test_mutations_are_recorded() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;
    let session = app.login("ana", "password123").await;

    let created = app
        .post_json_auth(
            "/api/v1/employees",
            serde_json::json!({ "name": "Ana" }),
            &session,
        )
        .await;
    created.assert_created();
    let id = created.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    app.delete_auth(&format!("/api/v1/employees/{}", id), &session)
        .await
        .assert_ok();

    fixtures::wait_for_history(&app.state, org.id, 2).await;

    let response = app.get_auth("/api/v1/history", &session).await;
    response.assert_ok();
    let page: serde_json::Value = response.json();
    assert_eq!(page["total"], 2);

    let actions: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"employee.create"));
    assert!(actions.contains(&"employee.delete"));

    // Username is snapshotted on every row
    assert!(page["items"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["username"] == "ana"));
}

#[tokio::test]
async fn test_history_filters() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;
    let session = app.login("ana", "password123").await;

    app.post_json_auth(
        "/api/v1/employees",
        serde_json::json!({ "name": "Ana" }),
        &session,
    )
    .await
    .assert_created();
    app.post_json_auth(
        "/api/v1/services",
        serde_json::json!({ "name": "Haircut", "duration_minutes": 30 }),
        &session,
    )
    .await
    .assert_created();

    fixtures::wait_for_history(&app.state, org.id, 2).await;

    let filtered = app
        .get_auth("/api/v1/history?entity_type=services", &session)
        .await;
    filtered.assert_ok();
    let page: serde_json::Value = filtered.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["action"], "service.create");

    let filtered = app
        .get_auth("/api/v1/history?action=employee.create", &session)
        .await;
    assert_eq!(filtered.json::<serde_json::Value>()["total"], 1);
}

#[tokio::test]
async fn test_history_is_tenant_scoped() {
    let app = TestApp::new().await;
    let org_a = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    let org_b = fixtures::seed_org(&app.state, "Salon B", "salon-b").await;
    fixtures::seed_user(&app.state, Some(org_a.id), "ana", "password123", Role::Admin).await;
    fixtures::seed_user(&app.state, Some(org_b.id), "bea", "password123", Role::Admin).await;

    let ana = app.login("ana", "password123").await;
    let bea = app.login("bea", "password123").await;

    app.post_json_auth(
        "/api/v1/employees",
        serde_json::json!({ "name": "Ana's Stylist" }),
        &ana,
    )
    .await
    .assert_created();

    fixtures::wait_for_history(&app.state, org_a.id, 1).await;

    let foreign = app.get_auth("/api/v1/history", &bea).await;
    foreign.assert_ok();
    assert_eq!(foreign.json::<serde_json::Value>()["total"], 0);
}
