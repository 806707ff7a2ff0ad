// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: registration, login, the 2FA login leg, Google
//! federated login and logout.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::SESSION_COOKIE;
use crate::models::user::is_valid_date_of_birth;
use crate::models::User;
use crate::services::google::{resolve_google_login, GoogleLoginOutcome};
use crate::services::tokens::SESSION_TTL_SECS;
use crate::services::totp::TotpSecret;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify-2fa-login", post(verify_two_fa_login))
        .route("/api/auth/google", post(google_login))
        .route("/api/auth/complete-registration", post(complete_registration))
        .route("/api/auth/logout", post(logout))
        .route(
            "/api/auth/check-existing-credentials",
            post(check_existing_credentials),
        )
}

/// Session cookie mirroring the token also returned in the body.
fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}

fn session_removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

// ─── Register ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub display_name: String,
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    pub date_of_birth: String,
    /// Set together with `avatar_url` when completing a Google signup that
    /// already carries processed profile data.
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub access_token: Option<String>,
}

/// Body carrying a freshly minted session token.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a new account.
///
/// Password accounts get the default avatar; Google-backed registrations may
/// carry a pre-processed avatar URL and skip the password entirely.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<TokenResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !is_valid_date_of_birth(&payload.date_of_birth) {
        return Err(AppError::BadRequest("Invalid date of birth".to_string()));
    }

    if state.db.email_exists(&payload.email).await?
        || state.db.username_exists(&payload.username).await?
    {
        return Err(AppError::CredentialsInUse);
    }

    let user = match (&payload.google_id, &payload.avatar_url) {
        (Some(google_id), Some(avatar_url)) => User::new_federated(
            payload.email.clone(),
            payload.display_name.clone(),
            payload.username.clone(),
            payload.date_of_birth.clone(),
            avatar_url.clone(),
            google_id.clone(),
            payload.access_token.clone(),
        ),
        _ => {
            let password = payload
                .password
                .as_deref()
                .ok_or_else(|| AppError::BadRequest("Missing password".to_string()))?;
            let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

            User::new_local(
                payload.email.clone(),
                payload.display_name.clone(),
                payload.username.clone(),
                password_hash,
                payload.date_of_birth.clone(),
                state.config.default_avatar_url(),
            )
        }
    };

    state.db.insert(&user).await?;

    let token = state.tokens.issue_session(&user.id)?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(&token)),
        Json(TokenResponse { token }),
    ))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login outcome: either a session token or a pending 2FA step.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    #[serde(rename = "twoFARequired")]
    pub two_fa_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_token: Option<String>,
}

/// First login leg: verify credentials.
///
/// Unknown usernames and wrong passwords are indistinguishable to the
/// caller. Accounts with 2FA enabled receive a short-lived step token
/// instead of a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let user = state
        .db
        .find_by_username(&payload.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // Federated-only accounts have no password to check against.
    let password_hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredentials)?;

    let password_valid = bcrypt::verify(&payload.password, password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password verification failed: {}", e)))?;
    if !password_valid {
        return Err(AppError::InvalidCredentials);
    }

    if user.is_two_fa_enabled {
        let step_token = state.tokens.issue_two_fa_login(&user.id)?;
        return Ok((
            jar,
            Json(LoginResponse {
                two_fa_required: true,
                token: None,
                step_token: Some(step_token),
            }),
        ));
    }

    let token = state.tokens.issue_session(&user.id)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(session_cookie(&token)),
        Json(LoginResponse {
            two_fa_required: false,
            token: Some(token),
            step_token: None,
        }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTwoFaLoginRequest {
    pub step_token: String,
    pub code: String,
}

/// Second login leg: redeem the step token with a TOTP code.
///
/// A wrong code leaves the step token usable until it expires, so the user
/// retries the code without re-entering credentials.
async fn verify_two_fa_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<VerifyTwoFaLoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>)> {
    let user_id = state.tokens.verify_two_fa_login(&payload.step_token)?;

    let user = state
        .db
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let secret = user
        .two_fa_secret
        .as_deref()
        .filter(|_| user.is_two_fa_enabled)
        .ok_or_else(|| AppError::BadRequest("2FA not configured".to_string()))?;

    let verified = TotpSecret::from_base32(secret)?.verify(&payload.code, &user.email)?;
    if !verified {
        return Err(AppError::InvalidTwoFactorCode);
    }

    let token = state.tokens.issue_session(&user.id)?;

    tracing::info!(user_id = %user.id, "User completed 2FA login");

    Ok((
        jar.add(session_cookie(&token)),
        Json(TokenResponse { token }),
    ))
}

// ─── Google ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub access_token: String,
}

/// Google login outcome for the client to branch on.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GoogleLoginResponse {
    pub needs_completion: bool,
    #[serde(rename = "twoFARequired")]
    pub two_fa_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Federated login with a Google access token.
async fn google_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<(CookieJar, Json<GoogleLoginResponse>)> {
    if payload.access_token.is_empty() {
        return Err(AppError::BadRequest("Missing access token".to_string()));
    }

    let profile = state.google.fetch_userinfo(&payload.access_token).await?;

    let outcome = resolve_google_login(
        &state.db,
        &state.avatars,
        &state.google,
        &state.config.default_avatar_url(),
        profile,
        &payload.access_token,
    )
    .await?;

    match outcome {
        GoogleLoginOutcome::Success { user } => {
            let token = state.tokens.issue_session(&user.id)?;
            tracing::info!(user_id = %user.id, "Google login");
            Ok((
                jar.add(session_cookie(&token)),
                Json(GoogleLoginResponse {
                    needs_completion: false,
                    two_fa_required: false,
                    register_token: None,
                    step_token: None,
                    token: Some(token),
                }),
            ))
        }
        GoogleLoginOutcome::NeedsTwoFactor { user } => {
            let step_token = state.tokens.issue_two_fa_login(&user.id)?;
            Ok((
                jar,
                Json(GoogleLoginResponse {
                    needs_completion: false,
                    two_fa_required: true,
                    register_token: None,
                    step_token: Some(step_token),
                    token: None,
                }),
            ))
        }
        GoogleLoginOutcome::NeedsRegistration { pending } => {
            let register_token = state.tokens.issue_registration(pending)?;
            Ok((
                jar,
                Json(GoogleLoginResponse {
                    needs_completion: true,
                    two_fa_required: false,
                    register_token: Some(register_token),
                    step_token: None,
                    token: None,
                }),
            ))
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistrationRequest {
    pub register_token: String,
    pub date_of_birth: String,
}

/// Finish a Google signup started at `/api/auth/google`.
async fn complete_registration(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<CompleteRegistrationRequest>,
) -> Result<(StatusCode, CookieJar, Json<TokenResponse>)> {
    if !is_valid_date_of_birth(&payload.date_of_birth) {
        return Err(AppError::BadRequest("Invalid date of birth".to_string()));
    }

    let pending = state.tokens.verify_registration(&payload.register_token)?;

    if state.db.email_exists(&pending.email).await?
        || state.db.find_by_google_id(&pending.google_id).await?.is_some()
    {
        return Err(AppError::CredentialsInUse);
    }

    // The suggested username may have been taken since the token was minted.
    if state.db.username_exists(&pending.username).await? {
        return Err(AppError::UsernameTaken);
    }

    let user = User::new_federated(
        pending.email,
        pending.display_name,
        pending.username,
        payload.date_of_birth,
        pending.avatar_url,
        pending.google_id,
        Some(pending.google_access_token),
    );

    state.db.insert(&user).await?;

    let token = state.tokens.issue_session(&user.id)?;

    tracing::info!(user_id = %user.id, "Google registration completed");

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(&token)),
        Json(TokenResponse { token }),
    ))
}

// ─── Logout / availability ───────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub message: String,
}

/// Clear the session cookie. Tokens are stateless, so this is all logout
/// can do; an already-issued token stays valid until expiry.
async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(session_removal_cookie()),
        Json(MessageResponse {
            message: "Logged out successfully.".to_string(),
        }),
    )
}

#[derive(Deserialize)]
pub struct CheckCredentialsRequest {
    pub email: String,
    pub username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckCredentialsResponse {
    pub email_exists: bool,
    pub username_exists: bool,
}

/// Availability probe used live during signup.
async fn check_existing_credentials(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckCredentialsRequest>,
) -> Result<Json<CheckCredentialsResponse>> {
    let email_exists = state.db.email_exists(&payload.email).await?;
    let username_exists = state.db.username_exists(&payload.username).await?;

    Ok(Json(CheckCredentialsResponse {
        email_exists,
        username_exists,
    }))
}
