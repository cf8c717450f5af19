//! CRUD, validation and soft-delete tests

use chrono::{TimeZone, Utc};
use salon_admin::models::Role;

use crate::common::{fixtures, TestApp};

struct Ctx {
    app: TestApp,
    session: String,
    org_id: uuid::Uuid,
}

async fn setup() -> Ctx {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;
    let session = app.login("ana", "password123").await;
    Ctx {
        app,
        session,
        org_id: org.id,
    }
}

#[tokio::test]
async fn test_employee_crud_roundtrip() {
    let ctx = setup().await;

    let created = ctx
        .app
        .post_json_auth(
            "/api/v1/employees",
            serde_json::json!({ "name": "Ana" }),
            &ctx.session,
        )
        .await;
    created.assert_created();
    let id = created.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let updated = ctx
        .app
        .put_json_auth(
            &format!("/api/v1/employees/{}", id),
            serde_json::json!({ "name": "Ana Maria" }),
            &ctx.session,
        )
        .await;
    updated.assert_ok();
    assert_eq!(updated.json::<serde_json::Value>()["name"], "Ana Maria");

    let fetched = ctx
        .app
        .get_auth(&format!("/api/v1/employees/{}", id), &ctx.session)
        .await;
    fetched.assert_ok();
    assert_eq!(fetched.json::<serde_json::Value>()["status"], "active");
}

#[tokio::test]
async fn test_empty_name_rejected() {
    let ctx = setup().await;

    let response = ctx
        .app
        .post_json_auth(
            "/api/v1/employees",
            serde_json::json!({ "name": "" }),
            &ctx.session,
        )
        .await;
    response.assert_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_service_validation() {
    let ctx = setup().await;

    // Zero duration
    ctx.app
        .post_json_auth(
            "/api/v1/services",
            serde_json::json!({ "name": "Haircut", "duration_minutes": 0 }),
            &ctx.session,
        )
        .await
        .assert_bad_request();

    // Negative price
    ctx.app
        .post_json_auth(
            "/api/v1/services",
            serde_json::json!({ "name": "Haircut", "duration_minutes": 30, "price_cents": -1 }),
            &ctx.session,
        )
        .await
        .assert_bad_request();

    // Valid
    ctx.app
        .post_json_auth(
            "/api/v1/services",
            serde_json::json!({ "name": "Haircut", "duration_minutes": 30, "price_cents": 2000 }),
            &ctx.session,
        )
        .await
        .assert_created();
}

#[tokio::test]
async fn test_client_phone_validation() {
    let ctx = setup().await;

    let response = ctx
        .app
        .post_json_auth(
            "/api/v1/clients",
            serde_json::json!({ "full_name": "Marta", "phone": "not a phone" }),
            &ctx.session,
        )
        .await;
    response.assert_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("phone"));
}

#[tokio::test]
async fn test_soft_delete_without_bookings_hides_and_restore_returns() {
    let ctx = setup().await;
    let employee = fixtures::seed_employee(&ctx.app.state, ctx.org_id, "Ana").await;

    ctx.app
        .delete_auth(&format!("/api/v1/employees/{}", employee.id), &ctx.session)
        .await
        .assert_ok();

    // Hidden from the default listing
    let listing = ctx.app.get_auth("/api/v1/employees", &ctx.session).await;
    let employees: Vec<serde_json::Value> = listing.json();
    assert!(employees.is_empty());

    // Visible when hidden records are requested
    let listing = ctx
        .app
        .get_auth("/api/v1/employees?include_hidden=true", &ctx.session)
        .await;
    let employees: Vec<serde_json::Value> = listing.json();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0]["status"], "hidden");

    // Restore
    let restored = ctx
        .app
        .patch_auth(
            &format!("/api/v1/employees/{}/restore", employee.id),
            &ctx.session,
        )
        .await;
    restored.assert_ok();
    assert_eq!(restored.json::<serde_json::Value>()["status"], "active");
}

#[tokio::test]
async fn test_soft_delete_refused_with_future_booking() {
    let ctx = setup().await;
    let employee = fixtures::seed_employee(&ctx.app.state, ctx.org_id, "Ana").await;
    let service = fixtures::seed_service(&ctx.app.state, ctx.org_id, "Haircut", 30, 2000).await;
    let client =
        fixtures::seed_client(&ctx.app.state, ctx.org_id, "Marta", "+351 912 000 111").await;

    fixtures::seed_booking(
        &ctx.app.state,
        ctx.org_id,
        employee.id,
        client.id,
        vec![service.id],
        Utc.with_ymd_and_hms(2030, 6, 1, 10, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2030, 6, 1, 10, 30, 0).unwrap(),
    )
    .await;

    // All three dependents refuse deletion while the booking is upcoming
    ctx.app
        .delete_auth(&format!("/api/v1/employees/{}", employee.id), &ctx.session)
        .await
        .assert_bad_request();
    ctx.app
        .delete_auth(&format!("/api/v1/services/{}", service.id), &ctx.session)
        .await
        .assert_bad_request();
    ctx.app
        .delete_auth(&format!("/api/v1/clients/{}", client.id), &ctx.session)
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_soft_delete_allowed_with_only_past_bookings() {
    let ctx = setup().await;
    let employee = fixtures::seed_employee(&ctx.app.state, ctx.org_id, "Ana").await;
    let service = fixtures::seed_service(&ctx.app.state, ctx.org_id, "Haircut", 30, 2000).await;
    let client =
        fixtures::seed_client(&ctx.app.state, ctx.org_id, "Marta", "+351 912 000 111").await;

    fixtures::seed_booking(
        &ctx.app.state,
        ctx.org_id,
        employee.id,
        client.id,
        vec![service.id],
        Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 6, 1, 10, 30, 0).unwrap(),
    )
    .await;

    ctx.app
        .delete_auth(&format!("/api/v1/employees/{}", employee.id), &ctx.session)
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_client_search_and_pagination() {
    let ctx = setup().await;

    for i in 0..7 {
        fixtures::seed_client(
            &ctx.app.state,
            ctx.org_id,
            &format!("Client {}", i),
            &format!("+351 912 000 1{:02}", i),
        )
        .await;
    }
    fixtures::seed_client(&ctx.app.state, ctx.org_id, "Marta Lopes", "+351 933 555 777").await;

    // Substring search over name
    let search = ctx
        .app
        .get_auth("/api/v1/clients?q=Marta", &ctx.session)
        .await;
    search.assert_ok();
    let page: serde_json::Value = search.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["full_name"], "Marta Lopes");

    // Substring search over phone
    let search = ctx
        .app
        .get_auth("/api/v1/clients?q=933", &ctx.session)
        .await;
    assert_eq!(search.json::<serde_json::Value>()["total"], 1);

    // Pagination
    let page1 = ctx
        .app
        .get_auth("/api/v1/clients?page=1&per_page=5", &ctx.session)
        .await;
    let body: serde_json::Value = page1.json();
    assert_eq!(body["total"], 8);
    assert_eq!(body["items"].as_array().unwrap().len(), 5);

    let page2 = ctx
        .app
        .get_auth("/api/v1/clients?page=2&per_page=5", &ctx.session)
        .await;
    let body: serde_json::Value = page2.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_org_user_management() {
    let ctx = setup().await;

    // Create a colleague
    let created = ctx
        .app
        .post_json_auth(
            "/api/v1/users",
            serde_json::json!({ "username": "front-desk", "password": "password123" }),
            &ctx.session,
        )
        .await;
    created.assert_created();
    let body: serde_json::Value = created.json();
    assert_eq!(body["role"], "user");
    let user_id = body["id"].as_str().unwrap().to_string();

    // Short password rejected
    ctx.app
        .post_json_auth(
            "/api/v1/users",
            serde_json::json!({ "username": "weak", "password": "short" }),
            &ctx.session,
        )
        .await
        .assert_bad_request();

    // Org admins cannot mint superadmins
    ctx.app
        .post_json_auth(
            "/api/v1/users",
            serde_json::json!({ "username": "sneaky", "password": "password123", "role": "superadmin" }),
            &ctx.session,
        )
        .await
        .assert_bad_request();

    // Promote to admin
    let updated = ctx
        .app
        .put_json_auth(
            &format!("/api/v1/users/{}", user_id),
            serde_json::json!({ "role": "admin" }),
            &ctx.session,
        )
        .await;
    updated.assert_ok();
    assert_eq!(updated.json::<serde_json::Value>()["role"], "admin");

    // Cannot delete yourself
    let me = ctx.app.get_auth("/api/v1/auth/me", &ctx.session).await;
    let my_id = me.json::<serde_json::Value>()["id"].as_str().unwrap().to_string();
    ctx.app
        .delete_auth(&format!("/api/v1/users/{}", my_id), &ctx.session)
        .await
        .assert_bad_request();

    // Deleting the colleague works
    ctx.app
        .delete_auth(&format!("/api/v1/users/{}", user_id), &ctx.session)
        .await
        .assert_ok();
}
