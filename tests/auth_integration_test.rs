//! Registration, login, token refresh and revocation over HTTP.

mod common;

use axum::http::Method;
use common::TestApp;
use serde_json::json;

fn registration(email: &str, phone: &str) -> serde_json::Value {
    json!({
        "first_name": "Ana",
        "last_name": "Lee",
        "email": email,
        "phone": phone,
        "password": "correct-horse",
    })
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let app = TestApp::new().await;

    let created = app
        .post("/api/v1/auth/register", registration("Ana.Lee@Gmail.com", "+23057123456"), None)
        .await;
    assert_eq!(created.status, 201, "{}", created.body);
    assert_eq!(created.data()["email"], "ana.lee@gmail.com");
    assert_eq!(created.data()["role"], "customer");
    assert!(created.data().get("password_hash").is_none());

    let duplicate = app
        .post("/api/v1/auth/register", registration("ana.lee@gmail.com", "57123456"), None)
        .await;
    assert_eq!(duplicate.status, 409);

    let bad_domain = app
        .post("/api/v1/auth/register", registration("ana@yahoo.com", "57123456"), None)
        .await;
    assert_eq!(bad_domain.status, 400);

    let bad_phone = app
        .post("/api/v1/auth/register", registration("ana2@gmail.com", "47123456"), None)
        .await;
    assert_eq!(bad_phone.status, 400);
}

#[tokio::test]
async fn login_rejects_a_wrong_password() {
    let app = TestApp::new().await;
    app.customer_token("ana@hotmail.com").await;

    let res = app
        .post(
            "/api/v1/auth/login",
            json!({ "email": "ana@hotmail.com", "password": "wrong-horse" }),
            None,
        )
        .await;
    assert_eq!(res.status, 401);

    let unknown = app
        .post(
            "/api/v1/auth/login",
            json!({ "email": "nobody@gmail.com", "password": "correct-horse" }),
            None,
        )
        .await;
    assert_eq!(unknown.status, 401);
}

#[tokio::test]
async fn profile_can_be_read_and_updated() {
    let app = TestApp::new().await;
    let token = app.customer_token("profile@gmail.com").await;

    let me = app.get("/api/v1/me", Some(&token)).await;
    assert_eq!(me.status, 200, "{}", me.body);
    assert_eq!(me.data()["email"], "profile@gmail.com");

    let updated = app
        .put("/api/v1/me", json!({ "first_name": "Renamed" }), Some(&token))
        .await;
    assert_eq!(updated.status, 200, "{}", updated.body);
    assert_eq!(updated.data()["first_name"], "Renamed");

    let bad = app
        .put("/api/v1/me", json!({ "phone": "12" }), Some(&token))
        .await;
    assert_eq!(bad.status, 400);

    let anonymous = app.get("/api/v1/me", None).await;
    assert_eq!(anonymous.status, 401);
}

#[tokio::test]
async fn refresh_issues_a_new_pair() {
    let app = TestApp::new().await;
    app.customer_token("refresh@gmail.com").await;
    let login = app
        .post(
            "/api/v1/auth/login",
            json!({ "email": "refresh@gmail.com", "password": "correct-horse" }),
            None,
        )
        .await;
    let refresh_token = login.data()["tokens"]["refresh_token"]
        .as_str()
        .expect("refresh token")
        .to_string();

    let refreshed = app
        .post(
            "/api/v1/auth/refresh",
            json!({ "refresh_token": refresh_token }),
            None,
        )
        .await;
    assert_eq!(refreshed.status, 200, "{}", refreshed.body);
    let access = refreshed.data()["access_token"].as_str().expect("access token");
    assert_eq!(app.get("/api/v1/me", Some(access)).await.status, 200);

    // The old refresh token was spent
    let replay = app
        .post(
            "/api/v1/auth/refresh",
            json!({ "refresh_token": refresh_token }),
            None,
        )
        .await;
    assert_eq!(replay.status, 401);
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let app = TestApp::new().await;
    let token = app.customer_token("logout@gmail.com").await;

    let out = app
        .send(Method::POST, "/api/v1/auth/logout", None, Some(&token), None)
        .await;
    assert_eq!(out.status, 204);

    let after = app.get("/api/v1/me", Some(&token)).await;
    assert_eq!(after.status, 401);
}

#[tokio::test]
async fn status_and_health_are_public() {
    let app = TestApp::new().await;

    let status = app.get("/api/v1/status", None).await;
    assert_eq!(status.status, 200);
    assert_eq!(status.data()["environment"], "test");

    let health = app.get("/api/v1/health", None).await;
    assert_eq!(health.status, 200, "{}", health.body);

    let garbage = app.get("/api/v1/me", Some("not-a-jwt")).await;
    assert_eq!(garbage.status, 401);
}
