// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Two-factor authentication routes.
//!
//! Enrollment is a two-leg flow: `/setup` hands out a fresh secret inside a
//! short-lived step token (nothing persisted), `/verify-setup` proves the
//! authenticator works and only then stores the secret and flips the flag.
//! Removal demands both the account password and a currently valid code.

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::user::{check_password, load_user};
use crate::services::totp::TotpSecret;
use crate::AppState;

/// 2FA routes (require authentication; the gate is applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/2fa/setup", post(setup))
        .route("/api/2fa/verify-setup", post(verify_setup))
        .route("/api/2fa/verify", post(verify))
        .route("/api/2fa/remove", post(remove))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SetupResponse {
    /// Provisioning QR code, base64-encoded PNG
    pub qr_code: String,
    /// Base32 secret for manual authenticator entry
    pub secret: String,
    /// otpauth:// URI behind the QR code
    pub otpauth_url: String,
    /// Step token carrying the pending secret; redeem at verify-setup
    pub pending_token: String,
}

/// Begin enrollment: generate a secret and return it with its QR code.
///
/// The secret lives only in the returned step token until verified.
async fn setup(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SetupResponse>> {
    let user = load_user(&state, &auth.user_id).await?;

    if user.is_two_fa_enabled {
        return Err(AppError::BadRequest(
            "2FA is already enabled for this account".to_string(),
        ));
    }

    let secret = TotpSecret::generate();
    let qr_code = secret.qr_code_base64(&user.email)?;
    let otpauth_url = secret.otpauth_url(&user.email)?;
    let pending_token = state
        .tokens
        .issue_two_fa_setup(&user.id, secret.as_base32())?;

    tracing::info!(user_id = %user.id, "2FA enrollment started");

    Ok(Json(SetupResponse {
        qr_code,
        secret: secret.as_base32().to_string(),
        otpauth_url,
        pending_token,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySetupRequest {
    pub pending_token: String,
    pub code: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TwoFaMessageResponse {
    pub message: String,
}

/// Complete enrollment: prove a code from the pending secret, then persist.
async fn verify_setup(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<VerifySetupRequest>,
) -> Result<Json<TwoFaMessageResponse>> {
    let (token_user_id, pending_secret) =
        state.tokens.verify_two_fa_setup(&payload.pending_token)?;

    // A setup token is only redeemable by the session that requested it.
    if token_user_id != auth.user_id {
        return Err(AppError::InvalidToken);
    }

    let mut user = load_user(&state, &auth.user_id).await?;

    if user.is_two_fa_enabled {
        return Err(AppError::BadRequest(
            "2FA is already enabled for this account".to_string(),
        ));
    }

    let secret = TotpSecret::from_base32(&pending_secret)?;
    if !secret.verify(&payload.code, &user.email)? {
        return Err(AppError::InvalidTwoFactorCode);
    }

    user.two_fa_secret = Some(pending_secret);
    user.is_two_fa_enabled = true;
    state.db.update(&user).await?;

    tracing::info!(user_id = %user.id, "2FA enabled");

    Ok(Json(TwoFaMessageResponse {
        message: "2FA enabled.".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

/// Validate a code against the enabled secret.
async fn verify(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<TwoFaMessageResponse>> {
    let user = load_user(&state, &auth.user_id).await?;

    let secret = user
        .two_fa_secret
        .as_deref()
        .filter(|_| user.is_two_fa_enabled)
        .ok_or_else(|| AppError::BadRequest("2FA not setup for this user".to_string()))?;

    if !TotpSecret::from_base32(secret)?.verify(&payload.code, &user.email)? {
        return Err(AppError::InvalidTwoFactorCode);
    }

    Ok(Json(TwoFaMessageResponse {
        message: "Code verified.".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct RemoveRequest {
    pub password: String,
    pub code: String,
}

/// Disable 2FA. Both the account password and a currently valid code are
/// required; failing either leaves the account untouched.
async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<RemoveRequest>,
) -> Result<Json<TwoFaMessageResponse>> {
    let mut user = load_user(&state, &auth.user_id).await?;

    if !user.is_two_fa_enabled {
        return Err(AppError::BadRequest(
            "2FA is not enabled for this account".to_string(),
        ));
    }

    check_password(&user, &payload.password)?;

    let secret = user
        .two_fa_secret
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("2FA not setup for this user".to_string()))?;

    if !TotpSecret::from_base32(secret)?.verify(&payload.code, &user.email)? {
        return Err(AppError::InvalidTwoFactorCode);
    }

    user.two_fa_secret = None;
    user.is_two_fa_enabled = false;
    state.db.update(&user).await?;

    tracing::info!(user_id = %user.id, "2FA removed");

    Ok(Json(TwoFaMessageResponse {
        message: "2FA removed.".to_string(),
    }))
}
