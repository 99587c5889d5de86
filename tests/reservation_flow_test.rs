//! Booking flow over HTTP: availability, session hold, confirmation,
//! and what customers and staff can do with the result.

mod common;

use axum::http::Method;
use common::{next_week, TestApp};
use serde_json::json;

#[tokio::test]
async fn availability_lists_tables_of_the_party_seat_class() {
    let app = TestApp::new().await;
    let two_top = app.seed_table(1, 2).await;
    app.seed_table(2, 4).await;

    let res = app
        .post(
            "/api/v1/reservations/availability",
            json!({ "date": next_week(), "time": "19:00", "party_size": 2 }),
            None,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.body);
    let tables = res.data()["tables"].as_array().expect("tables");
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0]["id"], two_top.id);
    assert_eq!(res.data()["seats"], 2);
}

#[tokio::test]
async fn availability_alias_route_answers_the_same() {
    let app = TestApp::new().await;
    app.seed_table(1, 4).await;

    let res = app
        .post(
            "/api/v1/reservations/available",
            json!({ "date": next_week(), "time": "18:30", "party_size": 4 }),
            None,
        )
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.data()["tables"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn requests_outside_service_hours_are_rejected() {
    let app = TestApp::new().await;
    app.seed_table(1, 2).await;

    for time in ["14:45", "23:00", "23:15", "19:07"] {
        let res = app
            .post(
                "/api/v1/reservations/availability",
                json!({ "date": next_week(), "time": time, "party_size": 2 }),
                None,
            )
            .await;
        assert_eq!(res.status, 400, "time {time} should be rejected");
    }
}

#[tokio::test]
async fn every_aligned_time_before_closing_is_bookable() {
    let app = TestApp::new().await;
    app.seed_table(1, 2).await;

    for time in ["15:00", "22:00", "22:15", "22:45"] {
        let res = app
            .post(
                "/api/v1/reservations/availability",
                json!({ "date": next_week(), "time": time, "party_size": 2 }),
                None,
            )
            .await;
        assert_eq!(res.status, 200, "time {time}: {}", res.body);
    }
}

#[tokio::test]
async fn party_with_no_table_of_its_class_is_rejected() {
    let app = TestApp::new().await;
    app.seed_table(1, 2).await;

    let res = app
        .post(
            "/api/v1/reservations/availability",
            json!({ "date": next_week(), "time": "19:00", "party_size": 4 }),
            None,
        )
        .await;

    assert_eq!(res.status, 400, "{}", res.body);
    let message = res.body["message"].as_str().unwrap_or_default();
    assert!(message.contains("No 4-seat table is free"), "{message}");
}

#[tokio::test]
async fn oversized_party_names_the_maximum() {
    let app = TestApp::new().await;
    app.seed_table(1, 4).await;

    let res = app
        .post(
            "/api/v1/reservations/availability",
            json!({ "date": next_week(), "time": "19:00", "party_size": 21 }),
            None,
        )
        .await;

    assert_eq!(res.status, 400);
    let message = res.body["message"].as_str().unwrap_or_default();
    assert!(message.contains("maximum party size"), "{message}");
    assert!(!message.contains("seat table"));
}

#[tokio::test]
async fn hold_then_confirm_books_the_table_and_blocks_overlaps() {
    let app = TestApp::new().await;
    let table = app.seed_table(1, 2).await;
    let date = next_week();

    let hold = app
        .send(
            Method::POST,
            "/api/v1/reservations/hold",
            Some(json!({ "date": date, "time": "19:00", "party_size": 2, "table_id": table.id })),
            None,
            None,
        )
        .await;
    assert_eq!(hold.status, 200, "{}", hold.body);
    let session = hold.session.clone().expect("session id issued");

    let current = app
        .send(
            Method::GET,
            "/api/v1/reservations/hold",
            None,
            None,
            Some(&session),
        )
        .await;
    assert_eq!(current.data()["table_id"], table.id);

    let confirm = app
        .send(
            Method::POST,
            "/api/v1/reservations/confirm",
            Some(json!({
                "full_name": "Ada Lovelace",
                "phone": "57123456",
                "email": "ada@gmail.com",
            })),
            None,
            Some(&session),
        )
        .await;
    assert_eq!(confirm.status, 201, "{}", confirm.body);
    assert_eq!(confirm.data()["status"], "confirmed");

    // The hold is consumed
    let after = app
        .send(
            Method::GET,
            "/api/v1/reservations/hold",
            None,
            None,
            Some(&session),
        )
        .await;
    assert!(after.data().is_null());

    // 20:30 overlaps the 19:00 booking's two-hour window; 21:00 does not
    let overlapping = app
        .post(
            "/api/v1/reservations/availability",
            json!({ "date": date, "time": "20:30", "party_size": 2 }),
            None,
        )
        .await;
    assert_eq!(overlapping.status, 400, "{}", overlapping.body);
    assert!(overlapping.body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("No 2-seat table is free"));

    let later = app
        .post(
            "/api/v1/reservations/availability",
            json!({ "date": date, "time": "21:00", "party_size": 2 }),
            None,
        )
        .await;
    assert_eq!(later.data()["tables"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn confirming_a_taken_slot_is_a_conflict() {
    let app = TestApp::new().await;
    let table = app.seed_table(1, 2).await;
    let slot = json!({
        "full_name": "Guest",
        "phone": "57123456",
        "email": "guest@gmail.com",
        "date": next_week(),
        "time": "19:00",
        "party_size": 2,
        "table_id": table.id,
    });

    let first = app.post("/api/v1/reservations/confirm", slot.clone(), None).await;
    assert_eq!(first.status, 201, "{}", first.body);

    let second = app.post("/api/v1/reservations/confirm", slot, None).await;
    assert_eq!(second.status, 409);
}

#[tokio::test]
async fn confirm_without_hold_or_slot_is_rejected() {
    let app = TestApp::new().await;

    let res = app
        .post(
            "/api/v1/reservations/confirm",
            json!({ "full_name": "Guest", "phone": "57123456", "email": "guest@gmail.com" }),
            None,
        )
        .await;

    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn customers_see_and_cancel_only_their_own_reservations() {
    let app = TestApp::new().await;
    let table = app.seed_table(1, 2).await;
    let owner = app.customer_token("owner@gmail.com").await;
    let other = app.customer_token("other@gmail.com").await;

    let booked = app
        .post(
            "/api/v1/reservations/confirm",
            json!({
                "full_name": "Owner",
                "phone": "57123456",
                "email": "owner@gmail.com",
                "date": next_week(),
                "time": "19:00",
                "party_size": 2,
                "table_id": table.id,
            }),
            Some(&owner),
        )
        .await;
    assert_eq!(booked.status, 201, "{}", booked.body);
    let id = booked.data()["id"].as_i64().expect("reservation id");

    let mine = app.get("/api/v1/me/reservations", Some(&owner)).await;
    assert_eq!(mine.data().as_array().map(Vec::len), Some(1));

    let theirs = app.get("/api/v1/me/reservations", Some(&other)).await;
    assert_eq!(theirs.data().as_array().map(Vec::len), Some(0));

    let foreign_cancel = app
        .post(
            &format!("/api/v1/me/reservations/{id}/cancel"),
            json!({}),
            Some(&other),
        )
        .await;
    assert_eq!(foreign_cancel.status, 404);

    let cancel = app
        .post(
            &format!("/api/v1/me/reservations/{id}/cancel"),
            json!({}),
            Some(&owner),
        )
        .await;
    assert_eq!(cancel.status, 200, "{}", cancel.body);
    assert_eq!(cancel.data()["status"], "cancelled");
}

#[tokio::test]
async fn staff_walk_a_reservation_through_its_lifecycle() {
    let app = TestApp::new().await;
    let table = app.seed_table(1, 4).await;
    let staff = app.staff_token().await;

    let booked = app
        .post(
            "/api/v1/reservations/confirm",
            json!({
                "full_name": "Party of four",
                "phone": "57123456",
                "email": "four@gmail.com",
                "date": next_week(),
                "time": "20:00",
                "party_size": 4,
                "table_id": table.id,
            }),
            None,
        )
        .await;
    let id = booked.data()["id"].as_i64().expect("reservation id");
    let uri = format!("/api/v1/staff/reservations/{id}/status");

    let seated = app.put(&uri, json!({ "status": "seated" }), Some(&staff)).await;
    assert_eq!(seated.status, 200, "{}", seated.body);

    let completed = app
        .put(&uri, json!({ "status": "completed" }), Some(&staff))
        .await;
    assert_eq!(completed.status, 200);

    // Completed is terminal
    let reopened = app
        .put(&uri, json!({ "status": "confirmed" }), Some(&staff))
        .await;
    assert_eq!(reopened.status, 400);
}

#[tokio::test]
async fn staff_routes_require_a_staff_role() {
    let app = TestApp::new().await;
    let customer = app.customer_token("diner@gmail.com").await;

    let anonymous = app.get("/api/v1/staff/overview", None).await;
    assert_eq!(anonymous.status, 401);

    let forbidden = app.get("/api/v1/staff/overview", Some(&customer)).await;
    assert_eq!(forbidden.status, 403);

    let admin = app.admin_token().await;
    let allowed = app.get("/api/v1/staff/overview", Some(&admin)).await;
    assert_eq!(allowed.status, 200, "{}", allowed.body);
}
