// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google federated login tests (against the stubbed verifier).

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use strife_api::models::User;

mod common;

fn seeded_federated_user(state: &strife_api::AppState) -> User {
    User::new_federated(
        common::TEST_GOOGLE_EMAIL.to_string(),
        "Gina Google".to_string(),
        "gina".to_string(),
        "1995-05-05".to_string(),
        state.config.default_avatar_url(),
        common::TEST_GOOGLE_SUB.to_string(),
        Some("old-access-token".to_string()),
    )
}

#[tokio::test]
async fn test_first_google_login_needs_completion() {
    let (app, state) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(common::json_request(
            "POST",
            "/api/auth/google",
            json!({ "accessToken": "fresh-access-token" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["needsCompletion"], true);
    assert!(body.get("token").is_none());
    let register_token = body["registerToken"].as_str().unwrap().to_string();

    // Nothing persisted yet.
    assert!(state
        .db
        .find_by_google_id(common::TEST_GOOGLE_SUB)
        .await
        .unwrap()
        .is_none());

    // Completing with a date of birth creates the account and a session.
    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/complete-registration",
            json!({ "registerToken": register_token, "dateOfBirth": "1995-05-05" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookies = common::set_cookie_headers(&response);
    assert!(cookies.iter().any(|c| c.starts_with("token=")));

    let user = state
        .db
        .find_by_google_id(common::TEST_GOOGLE_SUB)
        .await
        .unwrap()
        .expect("federated user created");
    assert_eq!(user.email, common::TEST_GOOGLE_EMAIL);
    // Username suggested from the email local part.
    assert_eq!(user.username, "gina");
    assert_eq!(user.date_of_birth, "1995-05-05");
    assert!(user.password_hash.is_none());
    assert!(user.google_id.is_some());
}

#[tokio::test]
async fn test_known_google_user_logs_in_and_token_is_refreshed() {
    let (app, state) = common::create_test_app();
    let user = seeded_federated_user(&state);
    state.db.insert(&user).await.unwrap();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/google",
            json!({ "accessToken": "fresh-access-token" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["needsCompletion"], false);
    assert_eq!(body["twoFARequired"], false);
    assert!(body["token"].as_str().is_some());

    // The latest access token was persisted (last write wins).
    let stored = state.db.find_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(
        stored.google_access_token.as_deref(),
        Some("fresh-access-token")
    );
}

#[tokio::test]
async fn test_google_login_matches_existing_account_by_email() {
    let (app, state) = common::create_test_app();
    // Password account created before Google linking, same email.
    common::seed_user(
        &state,
        "gina",
        common::TEST_GOOGLE_EMAIL,
        "secret-password-1",
    )
    .await;

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/google",
            json!({ "accessToken": "fresh-access-token" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["needsCompletion"], false);
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn test_google_login_with_two_fa_goes_through_step() {
    let (app, state) = common::create_test_app();
    let mut user = seeded_federated_user(&state);
    let secret = strife_api::services::totp::TotpSecret::generate();
    user.two_fa_secret = Some(secret.as_base32().to_string());
    user.is_two_fa_enabled = true;
    state.db.insert(&user).await.unwrap();

    let response = app
        .clone()
        .oneshot(common::json_request(
            "POST",
            "/api/auth/google",
            json!({ "accessToken": "fresh-access-token" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["twoFARequired"], true);
    assert!(body.get("token").is_none());
    let step_token = body["stepToken"].as_str().unwrap().to_string();

    let code = secret.current_code(&user.email).unwrap();
    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/verify-2fa-login",
            json!({ "stepToken": step_token, "code": code }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(common::body_json(response).await["token"].as_str().is_some());
}

#[tokio::test]
async fn test_complete_registration_rejects_duplicates() {
    let (app, state) = common::create_test_app();

    let register_token = {
        let response = app
            .clone()
            .oneshot(common::json_request(
                "POST",
                "/api/auth/google",
                json!({ "accessToken": "fresh-access-token" }),
            ))
            .await
            .unwrap();
        common::body_json(response).await["registerToken"]
            .as_str()
            .unwrap()
            .to_string()
    };

    // Someone registers the email in the meantime.
    common::seed_user(
        &state,
        "squatter",
        common::TEST_GOOGLE_EMAIL,
        "secret-password-9",
    )
    .await;

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/complete-registration",
            json!({ "registerToken": register_token, "dateOfBirth": "1995-05-05" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        common::body_json(response).await["error"],
        "credentials_in_use"
    );
}

#[tokio::test]
async fn test_complete_registration_rejects_tampered_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/complete-registration",
            json!({ "registerToken": "not-a-real-token", "dateOfBirth": "1995-05-05" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(common::body_json(response).await["error"], "invalid_token");
}
