// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for the integration test suites.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use strife_api::config::Config;
use strife_api::db::UserStore;
use strife_api::models::User;
use strife_api::routes::create_router;
use strife_api::services::google::GoogleProfile;
use strife_api::services::totp::TotpSecret;
use strife_api::services::{AvatarService, GoogleVerifier, ObjectStorage, TokenIssuer};
use strife_api::AppState;

/// Low bcrypt cost keeps the suite fast; production uses the default cost.
pub const TEST_BCRYPT_COST: u32 = 4;

pub const TEST_GOOGLE_SUB: &str = "108437560192837465001";
pub const TEST_GOOGLE_EMAIL: &str = "gina@gmail.com";

/// The profile the stubbed Google verifier resolves every token to.
#[allow(dead_code)]
pub fn test_google_profile() -> GoogleProfile {
    GoogleProfile {
        sub: TEST_GOOGLE_SUB.to_string(),
        email: TEST_GOOGLE_EMAIL.to_string(),
        name: Some("Gina Google".to_string()),
        picture: None,
    }
}

/// Create a test app with in-memory backends and a stubbed Google verifier.
/// Returns the router and the shared state.
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = UserStore::new_memory();
    let storage = ObjectStorage::new_memory(&config);
    let avatars = AvatarService::new(storage);
    let tokens = TokenIssuer::new(&config.token_key);
    let google = GoogleVerifier::new_with_static_profile(test_google_profile());

    let state = Arc::new(AppState {
        config,
        db,
        tokens,
        google,
        avatars,
    });

    (create_router(state.clone()), state)
}

/// Insert a password account directly into the store.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, username: &str, email: &str, password: &str) -> User {
    let hash = bcrypt::hash(password, TEST_BCRYPT_COST).unwrap();
    let user = User::new_local(
        email.to_string(),
        format!("{} display", username),
        username.to_string(),
        hash,
        "2000-01-01".to_string(),
        state.config.default_avatar_url(),
    );
    state.db.insert(&user).await.unwrap();
    user
}

/// Insert a password account with 2FA enabled; returns the user and secret.
#[allow(dead_code)]
pub async fn seed_two_fa_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> (User, TotpSecret) {
    let mut user = seed_user(state, username, email, password).await;
    let secret = TotpSecret::generate();
    user.two_fa_secret = Some(secret.as_base32().to_string());
    user.is_two_fa_enabled = true;
    state.db.update(&user).await.unwrap();
    (user, secret)
}

/// Mint a session token for a seeded user.
#[allow(dead_code)]
pub fn session_token(state: &AppState, user: &User) -> String {
    state.tokens.issue_session(&user.id).unwrap()
}

/// Build a JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build an authenticated JSON request (bearer header).
#[allow(dead_code)]
pub fn authed_json_request(
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All Set-Cookie header values of a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}
