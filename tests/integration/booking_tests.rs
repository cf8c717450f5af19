//! Booking overlap and calendar tests

use salon_admin::models::Role;

use crate::common::{fixtures, TestApp};

struct BookingFixture {
    app: TestApp,
    session: String,
    org_id: uuid::Uuid,
    employee_id: uuid::Uuid,
    client_id: uuid::Uuid,
    service_id: uuid::Uuid,
}

/// Org with an admin session, one employee, one 30-minute service, one client
async fn setup() -> BookingFixture {
    let app = TestApp::new().await;
    let org = fixtures::seed_org(&app.state, "Salon A", "salon-a").await;
    fixtures::seed_user(&app.state, Some(org.id), "ana-admin", "password123", Role::Admin).await;
    let employee = fixtures::seed_employee(&app.state, org.id, "Ana").await;
    let service = fixtures::seed_service(&app.state, org.id, "Haircut", 30, 2000).await;
    let client = fixtures::seed_client(&app.state, org.id, "Marta Lopes", "+351 912 000 111").await;

    let session = app.login("ana-admin", "password123").await;
    BookingFixture {
        app,
        session,
        org_id: org.id,
        employee_id: employee.id,
        client_id: client.id,
        service_id: service.id,
    }
}

fn booking_body(
    f: &BookingFixture,
    start: &str,
    end: &str,
) -> serde_json::Value {
    serde_json::json!({
        "employee_id": f.employee_id,
        "client_id": f.client_id,
        "service_ids": [f.service_id],
        "start_time": start,
        "end_time": end,
    })
}

#[tokio::test]
async fn test_overlap_scenario_from_the_calendar() {
    let f = setup().await;

    // 10:00-10:30 books fine
    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z"),
            &f.session,
        )
        .await
        .assert_created();

    // 10:15-10:45 intersects and is rejected
    let conflict = f
        .app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:15:00Z", "2024-01-01T10:45:00Z"),
            &f.session,
        )
        .await;
    conflict.assert_bad_request();
    let body: serde_json::Value = conflict.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("already booked"));

    // 10:30-11:00 only touches the boundary and is allowed
    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:30:00Z", "2024-01-01T11:00:00Z"),
            &f.session,
        )
        .await
        .assert_created();
}

#[tokio::test]
async fn test_containing_interval_is_rejected_both_ways() {
    let f = setup().await;

    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z"),
            &f.session,
        )
        .await
        .assert_created();

    // Inside the existing interval
    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:15:00Z", "2024-01-01T10:30:00Z"),
            &f.session,
        )
        .await
        .assert_bad_request();

    // Containing the existing interval
    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T09:00:00Z", "2024-01-01T12:00:00Z"),
            &f.session,
        )
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_other_employee_same_slot_is_fine() {
    let f = setup().await;
    let other = fixtures::seed_employee(&f.app.state, f.org_id, "Bea").await;

    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z"),
            &f.session,
        )
        .await
        .assert_created();

    let mut body = booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z");
    body["employee_id"] = serde_json::json!(other.id);
    f.app
        .post_json_auth("/api/v1/bookings", body, &f.session)
        .await
        .assert_created();
}

#[tokio::test]
async fn test_zero_duration_booking_rejected() {
    let f = setup().await;

    let response = f
        .app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:00:00Z"),
            &f.session,
        )
        .await;
    response.assert_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "start_time must be before end_time");
}

#[tokio::test]
async fn test_empty_service_ids_rejected() {
    let f = setup().await;

    let mut body = booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z");
    body["service_ids"] = serde_json::json!([]);
    let response = f
        .app
        .post_json_auth("/api/v1/bookings", body, &f.session)
        .await;
    response.assert_bad_request();
    let parsed: serde_json::Value = response.json();
    assert_eq!(parsed["error"], "service_ids must not be empty");
}

#[tokio::test]
async fn test_price_defaults_to_service_sum() {
    let f = setup().await;

    let response = f
        .app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z"),
            &f.session,
        )
        .await;
    response.assert_created();
    let body: serde_json::Value = response.json();
    assert_eq!(body["price_cents"], 2000);
}

#[tokio::test]
async fn test_update_into_overlap_is_rejected_but_own_slot_is_not() {
    let f = setup().await;

    let first = f
        .app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z"),
            &f.session,
        )
        .await;
    first.assert_created();
    let first_id = first.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T11:00:00Z", "2024-01-01T11:30:00Z"),
            &f.session,
        )
        .await
        .assert_created();

    // Moving the first booking onto the second conflicts
    f.app
        .put_json_auth(
            &format!("/api/v1/bookings/{}", first_id),
            serde_json::json!({
                "start_time": "2024-01-01T11:15:00Z",
                "end_time": "2024-01-01T11:45:00Z",
            }),
            &f.session,
        )
        .await
        .assert_bad_request();

    // Re-saving a booking over its own interval is not a conflict
    f.app
        .put_json_auth(
            &format!("/api/v1/bookings/{}", first_id),
            serde_json::json!({ "notes": "trim only" }),
            &f.session,
        )
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_month_filter() {
    let f = setup().await;

    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-15T10:00:00Z", "2024-01-15T10:30:00Z"),
            &f.session,
        )
        .await
        .assert_created();
    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-02-15T10:00:00Z", "2024-02-15T10:30:00Z"),
            &f.session,
        )
        .await
        .assert_created();

    let january = f
        .app
        .get_auth("/api/v1/bookings?month=1&year=2024", &f.session)
        .await;
    january.assert_ok();
    let items: Vec<serde_json::Value> = january.json();
    assert_eq!(items.len(), 1);

    // Month without year is a client error
    f.app
        .get_auth("/api/v1/bookings?month=1", &f.session)
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_booking_hard_delete() {
    let f = setup().await;

    let created = f
        .app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z"),
            &f.session,
        )
        .await;
    created.assert_created();
    let id = created.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    f.app
        .delete_auth(&format!("/api/v1/bookings/{}", id), &f.session)
        .await
        .assert_ok();
    f.app
        .get_auth(&format!("/api/v1/bookings/{}", id), &f.session)
        .await
        .assert_not_found();

    // The slot is free again
    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z"),
            &f.session,
        )
        .await
        .assert_created();
}

#[tokio::test]
async fn test_availability_excludes_booked_slots() {
    let f = setup().await;

    f.app
        .post_json_auth(
            "/api/v1/bookings",
            booking_body(&f, "2030-06-01T10:00:00Z", "2030-06-01T10:30:00Z"),
            &f.session,
        )
        .await
        .assert_created();

    let response = f
        .app
        .get_auth(
            &format!(
                "/api/v1/bookings/availability?employee_id={}&date=2030-06-01",
                f.employee_id
            ),
            &f.session,
        )
        .await;
    response.assert_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["interval_minutes"], 30);
    let slots: Vec<String> = body["free_slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();

    assert!(!slots.iter().any(|s| s.starts_with("2030-06-01T10:00:00")));
    assert!(slots.iter().any(|s| s.starts_with("2030-06-01T10:30:00")));
    // Working day defaults to 08:00-20:00
    assert!(slots.iter().any(|s| s.starts_with("2030-06-01T08:00:00")));
    assert!(!slots.iter().any(|s| s.starts_with("2030-06-01T20:00:00")));
}

#[tokio::test]
async fn test_booking_with_unknown_references_rejected() {
    let f = setup().await;

    let mut body = booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z");
    body["employee_id"] = serde_json::json!(uuid::Uuid::new_v4());
    f.app
        .post_json_auth("/api/v1/bookings", body, &f.session)
        .await
        .assert_bad_request();

    let mut body = booking_body(&f, "2024-01-01T10:00:00Z", "2024-01-01T10:30:00Z");
    body["service_ids"] = serde_json::json!([uuid::Uuid::new_v4()]);
    f.app
        .post_json_auth("/api/v1/bookings", body, &f.session)
        .await
        .assert_bad_request();
}
