// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and step token issuance.
//!
//! All tokens are stateless HS256 JWTs signed with the configured key.
//! Session tokens live 3 days; step tokens carry transient claims between
//! two legs of a multi-step flow and expire within minutes. Each step-token
//! kind embeds a `step` discriminator so one kind can never be replayed as
//! another.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};

/// Session token lifetime: 3 days.
pub const SESSION_TTL_SECS: u64 = 3 * 24 * 60 * 60;
/// Pending-registration token lifetime: 10 minutes.
pub const REGISTRATION_TTL_SECS: u64 = 10 * 60;
/// 2FA login step token lifetime: 5 minutes.
pub const TWO_FA_LOGIN_TTL_SECS: u64 = 5 * 60;
/// 2FA enrollment step token lifetime: 10 minutes.
pub const TWO_FA_SETUP_TTL_SECS: u64 = 10 * 60;

const STEP_REGISTRATION: &str = "register";
const STEP_TWO_FA_LOGIN: &str = "2fa-login";
const STEP_TWO_FA_SETUP: &str = "2fa-setup";

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user document id, hex)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Pending Google registration carried between `/google` and
/// `/complete-registration`. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRegistration {
    pub google_id: String,
    pub google_access_token: String,
    pub email: String,
    pub display_name: String,
    pub username: String,
    pub avatar_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistrationClaims {
    step: String,
    #[serde(flatten)]
    pending: PendingRegistration,
    exp: usize,
    iat: usize,
}

#[derive(Debug, Deserialize)]
struct SessionCheckClaims {
    sub: String,
    #[serde(default)]
    step: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TwoFaLoginClaims {
    step: String,
    sub: String,
    exp: usize,
    iat: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct TwoFaSetupClaims {
    step: String,
    sub: String,
    /// Base32 secret pending enrollment; persisted only after verification
    secret: String,
    exp: usize,
    iat: usize,
}

/// Mints and verifies every token kind the API uses.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(signing_key: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(signing_key),
            decoding: DecodingKey::from_secret(signing_key),
        }
    }

    /// Mint a 3-day session token for a user.
    pub fn issue_session(&self, user_id: &ObjectId) -> Result<String> {
        let now = now_unix_secs();
        let claims = SessionClaims {
            sub: user_id.to_hex(),
            iat: now,
            exp: now + SESSION_TTL_SECS as usize,
        };
        self.sign(&claims)
    }

    /// Verify a session token and return its subject.
    ///
    /// Step tokens carry a `step` claim and are refused here outright, so a
    /// short-lived step token can never stand in for a full session.
    pub fn verify_session(&self, token: &str) -> Result<ObjectId> {
        let claims: SessionCheckClaims = self.parse(token)?;
        if claims.step.is_some() {
            return Err(AppError::InvalidToken);
        }
        ObjectId::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)
    }

    /// Mint a 10-minute pending-registration token for a new Google identity.
    pub fn issue_registration(&self, pending: PendingRegistration) -> Result<String> {
        let now = now_unix_secs();
        let claims = RegistrationClaims {
            step: STEP_REGISTRATION.to_string(),
            pending,
            iat: now,
            exp: now + REGISTRATION_TTL_SECS as usize,
        };
        self.sign(&claims)
    }

    /// Verify a pending-registration token.
    pub fn verify_registration(&self, token: &str) -> Result<PendingRegistration> {
        let claims: RegistrationClaims = self.parse(token)?;
        if claims.step != STEP_REGISTRATION {
            return Err(AppError::InvalidToken);
        }
        Ok(claims.pending)
    }

    /// Mint a 5-minute 2FA login step token after the credential check.
    pub fn issue_two_fa_login(&self, user_id: &ObjectId) -> Result<String> {
        let now = now_unix_secs();
        let claims = TwoFaLoginClaims {
            step: STEP_TWO_FA_LOGIN.to_string(),
            sub: user_id.to_hex(),
            iat: now,
            exp: now + TWO_FA_LOGIN_TTL_SECS as usize,
        };
        self.sign(&claims)
    }

    /// Verify a 2FA login step token and return the pending user id.
    pub fn verify_two_fa_login(&self, token: &str) -> Result<ObjectId> {
        let claims: TwoFaLoginClaims = self.parse(token)?;
        if claims.step != STEP_TWO_FA_LOGIN {
            return Err(AppError::InvalidToken);
        }
        ObjectId::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)
    }

    /// Mint a 10-minute enrollment token carrying a freshly generated TOTP
    /// secret that has not been persisted.
    pub fn issue_two_fa_setup(&self, user_id: &ObjectId, secret: &str) -> Result<String> {
        let now = now_unix_secs();
        let claims = TwoFaSetupClaims {
            step: STEP_TWO_FA_SETUP.to_string(),
            sub: user_id.to_hex(),
            secret: secret.to_string(),
            iat: now,
            exp: now + TWO_FA_SETUP_TTL_SECS as usize,
        };
        self.sign(&claims)
    }

    /// Verify an enrollment token; returns the user id and pending secret.
    pub fn verify_two_fa_setup(&self, token: &str) -> Result<(ObjectId, String)> {
        let claims: TwoFaSetupClaims = self.parse(token)?;
        if claims.step != STEP_TWO_FA_SETUP {
            return Err(AppError::InvalidToken);
        }
        let user_id = ObjectId::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
        Ok((user_id, claims.secret))
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT encoding failed: {}", e)))
    }

    fn parse<T: for<'de> Deserialize<'de>>(&self, token: &str) -> Result<T> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<T>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::InvalidToken)
    }
}

fn now_unix_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}
