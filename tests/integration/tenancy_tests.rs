//! Multi-tenant isolation tests

use salon_admin::models::Role;

use crate::common::{fixtures, TestApp};

#[tokio::test]
async fn test_listings_are_scoped_to_the_callers_org() {
    let app = TestApp::new().await;
    let org_a = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    let org_b = fixtures::seed_org(&app.state, "Salon B", "salon-b").await;
    fixtures::seed_user(&app.state, Some(org_a.id), "ana", "password123", Role::Admin).await;
    fixtures::seed_employee(&app.state, org_a.id, "Ana's Stylist").await;
    fixtures::seed_employee(&app.state, org_b.id, "Bea's Stylist").await;

    let session = app.login("ana", "password123").await;
    let response = app.get_auth("/api/v1/employees", &session).await;
    response.assert_ok();

    let employees: Vec<serde_json::Value> = response.json();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0]["name"], "Ana's Stylist");
}

#[tokio::test]
async fn test_cross_tenant_get_is_not_found() {
    let app = TestApp::new().await;
    let org_a = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    let org_b = fixtures::seed_org(&app.state, "Salon B", "salon-b").await;
    fixtures::seed_user(&app.state, Some(org_a.id), "ana", "password123", Role::Admin).await;
    let foreign = fixtures::seed_employee(&app.state, org_b.id, "Bea's Stylist").await;

    let session = app.login("ana", "password123").await;
    app.get_auth(&format!("/api/v1/employees/{}", foreign.id), &session)
        .await
        .assert_not_found();
}

#[tokio::test]
async fn test_duplicate_phone_within_org_conflicts() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;

    let session = app.login("ana", "password123").await;
    let body = serde_json::json!({ "full_name": "Marta Lopes", "phone": "+351 912 000 111" });

    app.post_json_auth("/api/v1/clients", body.clone(), &session)
        .await
        .assert_created();

    let conflict = app
        .post_json_auth(
            "/api/v1/clients",
            serde_json::json!({ "full_name": "Other Person", "phone": "+351 912 000 111" }),
            &session,
        )
        .await;
    conflict.assert_bad_request();
    let parsed: serde_json::Value = conflict.json();
    assert_eq!(parsed["error"], "phone number already in use");
}

#[tokio::test]
async fn test_same_phone_in_another_org_is_fine() {
    let app = TestApp::new().await;
    let org_a = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    let org_b = fixtures::seed_org(&app.state, "Salon B", "salon-b").await;
    fixtures::seed_user(&app.state, Some(org_a.id), "ana", "password123", Role::Admin).await;
    fixtures::seed_user(&app.state, Some(org_b.id), "bea", "password123", Role::Admin).await;

    let phone = "+351 912 000 111";
    let ana = app.login("ana", "password123").await;
    let bea = app.login("bea", "password123").await;

    app.post_json_auth(
        "/api/v1/clients",
        serde_json::json!({ "full_name": "Marta Lopes", "phone": phone }),
        &ana,
    )
    .await
    .assert_created();

    app.post_json_auth(
        "/api/v1/clients",
        serde_json::json!({ "full_name": "Marta Lopes", "phone": phone }),
        &bea,
    )
    .await
    .assert_created();
}

#[tokio::test]
async fn test_org_admin_cannot_touch_foreign_users() {
    let app = TestApp::new().await;
    let org_a = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    let org_b = fixtures::seed_org(&app.state, "Salon B", "salon-b").await;
    fixtures::seed_user(&app.state, Some(org_a.id), "ana", "password123", Role::Admin).await;
    let foreign =
        fixtures::seed_user(&app.state, Some(org_b.id), "bea", "password123", Role::User).await;

    let session = app.login("ana", "password123").await;

    // Foreign users are invisible in the listing
    let listing = app.get_auth("/api/v1/users", &session).await;
    listing.assert_ok();
    let users: Vec<serde_json::Value> = listing.json();
    assert!(users.iter().all(|u| u["username"] != "bea"));

    // And unreachable for mutation
    app.put_json_auth(
        &format!("/api/v1/users/{}", foreign.id),
        serde_json::json!({ "role": "admin" }),
        &session,
    )
    .await
    .assert_not_found();
    app.delete_auth(&format!("/api/v1/users/{}", foreign.id), &session)
        .await
        .assert_not_found();
}

#[tokio::test]
async fn test_superadmin_org_lifecycle() {
    let app = TestApp::new().await;
    fixtures::seed_user(&app.state, None, "root", "password123", Role::Superadmin).await;
    let root = app.login("root", "password123").await;

    // Create
    let created = app
        .post_json_auth(
            "/api/v1/organizations",
            serde_json::json!({ "name": "Salon A", "slug": "salon-a" }),
            &root,
        )
        .await;
    created.assert_created();
    let org: serde_json::Value = created.json();
    assert_eq!(org["slug"], "salon-a");
    assert_eq!(org["is_active"], true);
    let org_id = org["id"].as_str().unwrap().to_string();

    // Duplicate slug conflicts
    let dup = app
        .post_json_auth(
            "/api/v1/organizations",
            serde_json::json!({ "name": "Other", "slug": "salon-a" }),
            &root,
        )
        .await;
    dup.assert_bad_request();

    // Invalid slug is a validation error
    app.post_json_auth(
        "/api/v1/organizations",
        serde_json::json!({ "name": "Bad", "slug": "Not A Slug" }),
        &root,
    )
    .await
    .assert_bad_request();

    // Deactivate
    let updated = app
        .put_json_auth(
            &format!("/api/v1/organizations/{}", org_id),
            serde_json::json!({ "is_active": false }),
            &root,
        )
        .await;
    updated.assert_ok();
    assert_eq!(updated.json::<serde_json::Value>()["is_active"], false);

    // Empty org can be deleted
    app.delete_auth(&format!("/api/v1/organizations/{}", org_id), &root)
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_org_with_users_cannot_be_deleted() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;
    fixtures::seed_user(&app.state, None, "root", "password123", Role::Superadmin).await;

    let root = app.login("root", "password123").await;
    app.delete_auth(&format!("/api/v1/organizations/{}", org.id), &root)
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_superadmin_cross_tenant_user_management() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, None, "root", "password123", Role::Superadmin).await;
    let root = app.login("root", "password123").await;

    // Tenant user requires an organization
    app.post_json_auth(
        "/api/v1/superadmin/users",
        serde_json::json!({ "username": "stray", "password": "password123", "role": "admin" }),
        &root,
    )
    .await
    .assert_bad_request();

    // With an organization it works
    let created = app
        .post_json_auth(
            "/api/v1/superadmin/users",
            serde_json::json!({
                "username": "ana",
                "password": "password123",
                "role": "admin",
                "organization_id": org.id,
            }),
            &root,
        )
        .await;
    created.assert_created();

    // Duplicate username is a conflict
    app.post_json_auth(
        "/api/v1/superadmin/users",
        serde_json::json!({
            "username": "ana",
            "password": "password123",
            "role": "user",
            "organization_id": org.id,
        }),
        &root,
    )
    .await
    .assert_bad_request();

    // The new admin can log in and sees their tenant
    let ana = app.login("ana", "password123").await;
    app.get_auth("/api/v1/employees", &ana).await.assert_ok();
}
