// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for authenticated users: profile read, avatar management
//! and field-level account updates.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, put},
    Extension, Json, Router,
};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::user::is_valid_date_of_birth;
use crate::models::{User, UserProfile};
use crate::services::avatar::MAX_UPLOAD_BYTES;
use crate::AppState;

/// User routes (require authentication; the gate is applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/profile", get(get_profile))
        .route(
            "/api/user/avatar",
            axum::routing::post(upload_avatar).delete(delete_avatar),
        )
        .route("/api/user/display-name", put(update_display_name))
        .route("/api/user/email", put(update_email))
        .route("/api/user/date-of-birth", put(update_date_of_birth))
        .route("/api/user/username", put(update_username))
        .route("/api/user/password", put(update_password))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 16 * 1024))
}

pub(crate) async fn load_user(state: &AppState, user_id: &ObjectId) -> Result<User> {
    state
        .db
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Verify the account password before a sensitive change.
pub(crate) fn check_password(user: &User, password: &str) -> Result<()> {
    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Account has no password".to_string()))?;

    let valid = bcrypt::verify(password, hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password verification failed: {}", e)))?;
    if !valid {
        return Err(AppError::InvalidPassword);
    }
    Ok(())
}

// ─── Profile ─────────────────────────────────────────────────

/// Current user profile, without password hash or TOTP secret.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let user = load_user(&state, &auth.user_id).await?;
    Ok(Json(user.profile()))
}

// ─── Avatar ──────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AvatarResponse {
    pub message: String,
    pub avatar_url: String,
}

/// Accept a multipart avatar upload, process it and persist the new URL.
async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        if field.name() == Some("avatar") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Malformed upload: {}", e)))?;
            upload = Some(bytes.to_vec());
            break;
        }
    }

    let bytes = upload.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let mut user = load_user(&state, &auth.user_id).await?;

    let avatar_url = state
        .avatars
        .process_and_store(&user.id.to_hex(), &bytes)
        .await?;

    user.avatar_url = avatar_url.clone();
    state.db.update(&user).await?;

    tracing::info!(user_id = %user.id, "Avatar updated");

    Ok(Json(AvatarResponse {
        message: "Avatar uploaded successfully.".to_string(),
        avatar_url,
    }))
}

/// Reset the avatar to the default and drop the stored object.
async fn delete_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AvatarResponse>> {
    let mut user = load_user(&state, &auth.user_id).await?;

    let default_url = state.config.default_avatar_url();
    if user.avatar_url != default_url {
        state.avatars.remove(&user.id.to_hex()).await?;
    }

    user.avatar_url = default_url.clone();
    state.db.update(&user).await?;

    Ok(Json(AvatarResponse {
        message: "Avatar deleted successfully.".to_string(),
        avatar_url: default_url,
    }))
}

// ─── Field updates ───────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateResponse {
    pub message: String,
}

fn updated(what: &str) -> Json<UpdateResponse> {
    Json(UpdateResponse {
        message: format!("{} updated successfully.", what),
    })
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDisplayNameRequest {
    #[validate(length(min = 1, max = 64))]
    pub display_name: String,
}

async fn update_display_name(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdateDisplayNameRequest>,
) -> Result<Json<UpdateResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut user = load_user(&state, &auth.user_id).await?;
    user.display_name = payload.display_name;
    state.db.update(&user).await?;

    Ok(updated("Display name"))
}

#[derive(Deserialize, Validate)]
pub struct UpdateEmailRequest {
    #[validate(email)]
    pub email: String,
}

async fn update_email(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdateEmailRequest>,
) -> Result<Json<UpdateResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut user = load_user(&state, &auth.user_id).await?;

    if payload.email != user.email && state.db.email_exists(&payload.email).await? {
        return Err(AppError::CredentialsInUse);
    }

    user.email = payload.email;
    state.db.update(&user).await?;

    Ok(updated("Email"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDateOfBirthRequest {
    pub date_of_birth: String,
}

async fn update_date_of_birth(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdateDateOfBirthRequest>,
) -> Result<Json<UpdateResponse>> {
    if !is_valid_date_of_birth(&payload.date_of_birth) {
        return Err(AppError::BadRequest("Invalid date of birth".to_string()));
    }

    let mut user = load_user(&state, &auth.user_id).await?;
    user.date_of_birth = payload.date_of_birth;
    state.db.update(&user).await?;

    Ok(updated("Date of birth"))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsernameRequest {
    pub current_password: String,
    #[validate(length(min = 3, max = 32))]
    pub new_username: String,
}

/// Change the login handle; requires the current password.
async fn update_username(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdateUsernameRequest>,
) -> Result<Json<UpdateResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut user = load_user(&state, &auth.user_id).await?;
    check_password(&user, &payload.current_password)?;

    if payload.new_username != user.username
        && state.db.username_exists(&payload.new_username).await?
    {
        return Err(AppError::UsernameTaken);
    }

    user.username = payload.new_username;
    state.db.update(&user).await?;

    Ok(updated("Username"))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Rotate the account password; requires the current one.
async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<UpdateResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut user = load_user(&state, &auth.user_id).await?;
    check_password(&user, &payload.current_password)?;

    let new_hash = bcrypt::hash(&payload.new_password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;
    user.password_hash = Some(new_hash);
    state.db.update(&user).await?;

    Ok(updated("Password"))
}
