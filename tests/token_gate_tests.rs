// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization gate tests: token extraction, expiry and status codes.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tower::ServiceExt;

mod common;

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

fn now_unix() -> usize {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// Sign arbitrary claims with the app's key (mirrors the issuer's format).
fn sign_claims(key: &[u8], claims: &Claims) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(key),
    )
    .unwrap()
}

#[tokio::test]
async fn test_missing_token_is_401() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(common::body_json(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_is_403() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/profile")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(common::body_json(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_expired_token_is_403_regardless_of_prior_validity() {
    let (app, state) = common::create_test_app();
    let user = common::seed_user(&state, "alice01", "a@b.com", "secret-password-1").await;

    // Issued 4 days ago with the 3-day lifetime: now a day past expiry.
    let now = now_unix();
    let expired = sign_claims(
        &state.config.token_key,
        &Claims {
            sub: user.id.to_hex(),
            iat: now - 4 * 24 * 60 * 60,
            exp: now - 24 * 60 * 60,
        },
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/profile")
                .header(header::AUTHORIZATION, format!("Bearer {}", expired))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unexpired_token_is_accepted() {
    let (app, state) = common::create_test_app();
    let user = common::seed_user(&state, "alice01", "a@b.com", "secret-password-1").await;

    // Two days into the 3-day lifetime.
    let now = now_unix();
    let token = sign_claims(
        &state.config.token_key,
        &Claims {
            sub: user.id.to_hex(),
            iat: now - 2 * 24 * 60 * 60,
            exp: now + 24 * 60 * 60,
        },
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/profile")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_signed_with_wrong_key_is_403() {
    let (app, state) = common::create_test_app();
    let user = common::seed_user(&state, "alice01", "a@b.com", "secret-password-1").await;

    let now = now_unix();
    let forged = sign_claims(
        b"some_other_signing_key_material!",
        &Claims {
            sub: user.id.to_hex(),
            iat: now,
            exp: now + 3600,
        },
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/profile")
                .header(header::AUTHORIZATION, format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cookie_token_is_accepted() {
    let (app, state) = common::create_test_app();
    let user = common::seed_user(&state, "alice01", "a@b.com", "secret-password-1").await;
    let token = common::session_token(&state, &user);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/profile")
                .header(header::COOKIE, format!("token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["username"], "alice01");
}
