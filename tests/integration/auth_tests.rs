//! Authentication and authorization tests

use salon_admin::models::Role;

use crate::common::{fixtures, TestApp};

#[tokio::test]
async fn test_protected_route_without_token_returns_401() {
    let app = TestApp::new().await;
    app.get("/api/v1/employees").await.assert_unauthorized();
}

#[tokio::test]
async fn test_garbage_token_returns_401() {
    let app = TestApp::new().await;
    app.get_auth("/api/v1/employees", "not-a-jwt")
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_login_wrong_password_is_401_and_sets_no_cookie() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;

    let response = app
        .post_json(
            "/api/v1/auth/login",
            serde_json::json!({ "username": "ana", "password": "wrong" }),
        )
        .await;

    response.assert_unauthorized();
    assert!(response.session_cookie().is_none());

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "invalid username or password");
}

#[tokio::test]
async fn test_login_unknown_user_is_401() {
    let app = TestApp::new().await;
    app.post_json(
        "/api/v1/auth/login",
        serde_json::json!({ "username": "ghost", "password": "password123" }),
    )
    .await
    .assert_unauthorized();
}

#[tokio::test]
async fn test_login_sets_httponly_cookie_and_me_works() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;

    let response = app
        .post_json(
            "/api/v1/auth/login",
            serde_json::json!({ "username": "ana", "password": "password123" }),
        )
        .await;
    response.assert_ok();

    let raw_cookie = response
        .headers
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("missing set-cookie");
    assert!(raw_cookie.contains("HttpOnly"));

    let session = response.session_cookie().unwrap();
    let me = app.get_auth("/api/v1/auth/me", &session).await;
    me.assert_ok();
    let body: serde_json::Value = me.json();
    assert_eq!(body["username"], "ana");
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn test_session_endpoint_reports_user() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::User).await;

    let session = app.login("ana", "password123").await;
    let response = app.get_auth("/api/v1/auth/session", &session).await;
    response.assert_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["username"], "ana");
}

#[tokio::test]
async fn test_sliding_session_reissues_cookie() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;

    let session = app.login("ana", "password123").await;
    let response = app.get_auth("/api/v1/employees", &session).await;
    response.assert_ok();

    // Every authenticated response refreshes the cookie expiry
    let reissued = response.session_cookie().expect("no reissued cookie");
    assert!(!reissued.is_empty());
}

#[tokio::test]
async fn test_deleted_user_token_is_rejected() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    let user =
        fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;

    let session = app.login("ana", "password123").await;

    salon_admin::db::UserRepository::new(&app.state.db)
        .delete(user.id)
        .await
        .unwrap();

    app.get_auth("/api/v1/employees", &session)
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_disabled_organization_blocks_login_and_session() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana", "password123", Role::Admin).await;

    let session = app.login("ana", "password123").await;

    // Deactivate the tenant
    salon_admin::db::OrganizationRepository::new(&app.state.db)
        .update(
            org.id,
            &salon_admin::models::UpdateOrganizationRequest {
                name: None,
                slug: None,
                timezone: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();

    // Existing session is rejected
    app.get_auth("/api/v1/employees", &session)
        .await
        .assert_forbidden();

    // Fresh login is rejected too
    app.post_json(
        "/api/v1/auth/login",
        serde_json::json!({ "username": "ana", "password": "password123" }),
    )
    .await
    .assert_forbidden();
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new().await;
    let response = app.post_json("/api/v1/auth/logout", serde_json::json!({})).await;
    response.assert_ok();

    let raw_cookie = response
        .headers
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("missing set-cookie");
    assert!(raw_cookie.starts_with("token="));
    assert!(raw_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_role_gates() {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "plain", "password123", Role::User).await;
    fixtures::seed_user(&app.state, Some(org.id), "admin", "password123", Role::Admin).await;

    let plain = app.login("plain", "password123").await;
    let admin = app.login("admin", "password123").await;

    // Non-admin against /users
    app.get_auth("/api/v1/users", &plain).await.assert_forbidden();
    app.get_auth("/api/v1/users", &admin).await.assert_ok();

    // Non-superadmin against /organizations and /superadmin/*
    app.get_auth("/api/v1/organizations", &admin)
        .await
        .assert_forbidden();
    app.get_auth("/api/v1/superadmin/users", &admin)
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn test_superadmin_reaches_cross_tenant_routes() {
    let app = TestApp::new().await;
    fixtures::seed_user(&app.state, None, "root", "password123", Role::Superadmin).await;

    let root = app.login("root", "password123").await;
    app.get_auth("/api/v1/organizations", &root).await.assert_ok();
    app.get_auth("/api/v1/superadmin/users", &root).await.assert_ok();

    // But superadmins have no tenant scope for business data
    app.get_auth("/api/v1/employees", &root).await.assert_forbidden();
}
