// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;

async fn register_expecting_400(app: axum::Router, body: serde_json::Value) {
    let response = app
        .oneshot(common::json_request("POST", "/api/auth/register", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_malformed_email() {
    let (app, _) = common::create_test_app();
    register_expecting_400(
        app,
        json!({
            "email": "not-an-email",
            "displayName": "Alice",
            "username": "alice01",
            "password": "secret-password-1",
            "dateOfBirth": "2000-01-01"
        }),
    )
    .await;
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let (app, _) = common::create_test_app();
    register_expecting_400(
        app,
        json!({
            "email": "a@b.com",
            "displayName": "Alice",
            "username": "alice01",
            "password": "short",
            "dateOfBirth": "2000-01-01"
        }),
    )
    .await;
}

#[tokio::test]
async fn test_register_rejects_missing_password_for_local_account() {
    let (app, _) = common::create_test_app();
    register_expecting_400(
        app,
        json!({
            "email": "a@b.com",
            "displayName": "Alice",
            "username": "alice01",
            "dateOfBirth": "2000-01-01"
        }),
    )
    .await;
}

#[tokio::test]
async fn test_register_rejects_bad_date_of_birth() {
    let (app, _) = common::create_test_app();
    for dob in ["2000-02-30", "01-01-2000", "yesterday"] {
        register_expecting_400(
            app.clone(),
            json!({
                "email": "a@b.com",
                "displayName": "Alice",
                "username": "alice01",
                "password": "secret-password-1",
                "dateOfBirth": dob
            }),
        )
        .await;
    }
}

#[tokio::test]
async fn test_register_rejects_overlong_username() {
    let (app, _) = common::create_test_app();
    register_expecting_400(
        app,
        json!({
            "email": "a@b.com",
            "displayName": "Alice",
            "username": "a".repeat(33),
            "password": "secret-password-1",
            "dateOfBirth": "2000-01-01"
        }),
    )
    .await;
}

#[tokio::test]
async fn test_check_existing_credentials() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "alice01", "a@b.com", "secret-password-1").await;

    let response = app
        .clone()
        .oneshot(common::json_request(
            "POST",
            "/api/auth/check-existing-credentials",
            json!({ "email": "a@b.com", "username": "someone-else" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["emailExists"], true);
    assert_eq!(body["usernameExists"], false);

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/check-existing-credentials",
            json!({ "email": "free@b.com", "username": "alice01" }),
        ))
        .await
        .unwrap();

    let body = common::body_json(response).await;
    assert_eq!(body["emailExists"], false);
    assert_eq!(body["usernameExists"], true);
}

#[tokio::test]
async fn test_health_endpoint_is_public() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .method("GET")
                .uri("/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["status"], "ok");
}
