// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Authenticated user extracted from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: ObjectId,
}

/// Middleware gating a route on a valid session token.
///
/// The token is taken from the `token` cookie first, then from a bearer
/// `Authorization` header. A missing token is 401; a present but invalid or
/// expired one is 403.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].to_string(),
            _ => return Err(AppError::Unauthorized),
        }
    };

    let user_id = state.tokens.verify_session(&token)?;

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}
