// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google federated identity.
//!
//! The client obtains an OAuth access token in the browser and posts it to
//! `/api/auth/google`; this module resolves it against Google's userinfo
//! endpoint and decides what the login means for us. The decision is a typed
//! outcome returned from one function, not a callback with overloaded
//! argument meanings.

use std::time::Duration;

use serde::Deserialize;

use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::avatar::AvatarService;
use crate::services::tokens::PendingRegistration;

const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Profile fields we consume from Google's userinfo response.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Google subject id
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// What a Google login resolves to.
pub enum GoogleLoginOutcome {
    /// Known account, no second factor required.
    Success { user: User },
    /// Known account with TOTP enabled; a step token must be issued.
    NeedsTwoFactor { user: User },
    /// Unknown identity; registration must be completed first.
    NeedsRegistration { pending: PendingRegistration },
}

#[derive(Clone)]
enum Mode {
    Live {
        http: reqwest::Client,
        userinfo_url: String,
    },
    /// Deterministic profile for tests; no network access.
    Static { profile: GoogleProfile },
}

/// Resolves Google access tokens to profiles.
#[derive(Clone)]
pub struct GoogleVerifier {
    mode: Mode,
}

impl GoogleVerifier {
    /// Production verifier against Google's userinfo endpoint.
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            mode: Mode::Live {
                http,
                userinfo_url: USERINFO_URL.to_string(),
            },
        })
    }

    /// Verifier that always resolves to the given profile (tests).
    pub fn new_with_static_profile(profile: GoogleProfile) -> Self {
        Self {
            mode: Mode::Static { profile },
        }
    }

    /// Exchange an access token for the user's Google profile.
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleProfile> {
        match &self.mode {
            Mode::Static { profile } => Ok(profile.clone()),
            Mode::Live { http, userinfo_url } => {
                let response = http
                    .get(userinfo_url)
                    .bearer_auth(access_token)
                    .send()
                    .await
                    .map_err(|e| AppError::GoogleAuth(format!("userinfo request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(AppError::GoogleAuth(
                        "Failed to fetch user info from Google".to_string(),
                    ));
                }

                let profile: GoogleProfile = response.json().await.map_err(|_| {
                    AppError::GoogleAuth("Incomplete user info from Google".to_string())
                })?;

                if profile.sub.is_empty() || profile.email.is_empty() {
                    return Err(AppError::GoogleAuth(
                        "Incomplete user info from Google".to_string(),
                    ));
                }

                Ok(profile)
            }
        }
    }

    /// Fetch the profile photo bytes, asking Google for the 800px rendition.
    ///
    /// Avatar import is best-effort: any failure reports `None` and the
    /// caller falls back to the default avatar.
    pub async fn fetch_avatar(&self, picture_url: &str) -> Option<Vec<u8>> {
        let Mode::Live { http, .. } = &self.mode else {
            return None;
        };

        let url = upscale_photo_url(picture_url);
        let response = match http.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = %r.status(), "Google avatar fetch failed");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Google avatar fetch failed");
                return None;
            }
        };

        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                tracing::warn!(error = %e, "Google avatar read failed");
                None
            }
        }
    }
}

/// Resolve a verified Google profile into a login outcome.
///
/// Known identities (by Google id, or by email for accounts created before
/// linking) get their latest access token persisted; unknown identities are
/// prepared for registration with a unique suggested username and, when
/// possible, their imported Google avatar.
pub async fn resolve_google_login(
    db: &UserStore,
    avatars: &AvatarService,
    verifier: &GoogleVerifier,
    default_avatar_url: &str,
    profile: GoogleProfile,
    access_token: &str,
) -> Result<GoogleLoginOutcome> {
    let existing = match db.find_by_google_id(&profile.sub).await? {
        Some(user) => Some(user),
        None => db.find_by_email(&profile.email).await?,
    };

    if let Some(mut user) = existing {
        user.google_access_token = Some(access_token.to_string());
        db.update(&user).await?;

        if user.is_two_fa_enabled {
            return Ok(GoogleLoginOutcome::NeedsTwoFactor { user });
        }
        return Ok(GoogleLoginOutcome::Success { user });
    }

    let username = suggest_username(db, &profile.email).await?;

    let mut avatar_url = default_avatar_url.to_string();
    if let Some(picture) = &profile.picture {
        if let Some(bytes) = verifier.fetch_avatar(picture).await {
            match avatars.process_and_store(&profile.sub, &bytes).await {
                Ok(url) => avatar_url = url,
                Err(e) => tracing::warn!(error = %e, "Failed to process Google avatar"),
            }
        }
    }

    let display_name = profile.name.unwrap_or_else(|| username.clone());

    Ok(GoogleLoginOutcome::NeedsRegistration {
        pending: PendingRegistration {
            google_id: profile.sub,
            google_access_token: access_token.to_string(),
            email: profile.email,
            display_name,
            username,
            avatar_url,
        },
    })
}

/// Derive a free username from the email local part, suffixing a counter
/// until it is unique.
async fn suggest_username(db: &UserStore, email: &str) -> Result<String> {
    let base = email.split('@').next().unwrap_or(email).to_string();
    let mut candidate = base.clone();
    let mut counter = 1u32;

    while db.username_exists(&candidate).await? {
        candidate = format!("{}_{}", base, counter);
        counter += 1;
    }

    Ok(candidate)
}

/// Ask for the 800px rendition of a Google profile photo URL.
fn upscale_photo_url(url: &str) -> String {
    if let Some(idx) = url.rfind("=s") {
        let tail = &url[idx + 2..];
        if let Some(rest) = tail.strip_suffix("-c") {
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return format!("{}=s800-c", &url[..idx]);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upscale_photo_url() {
        assert_eq!(
            upscale_photo_url("https://lh3.googleusercontent.com/a/pic=s96-c"),
            "https://lh3.googleusercontent.com/a/pic=s800-c"
        );
        // URLs without the size suffix pass through untouched.
        assert_eq!(
            upscale_photo_url("https://lh3.googleusercontent.com/a/pic"),
            "https://lh3.googleusercontent.com/a/pic"
        );
        assert_eq!(upscale_photo_url("pic=sabc-c"), "pic=sabc-c");
    }

    #[tokio::test]
    async fn test_suggest_username_counters_past_collisions() {
        let db = UserStore::new_memory();
        for name in ["alice", "alice_1"] {
            db.insert(&User::new_local(
                format!("{}@example.com", name),
                name.to_string(),
                name.to_string(),
                "hash".to_string(),
                "2000-01-01".to_string(),
                "url".to_string(),
            ))
            .await
            .unwrap();
        }

        let suggested = suggest_username(&db, "alice@gmail.com").await.unwrap();
        assert_eq!(suggested, "alice_2");
    }
}
