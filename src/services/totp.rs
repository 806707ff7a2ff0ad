// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TOTP enrollment and verification (RFC 6238).
//!
//! Google Authenticator compatible settings: SHA-1, 6 digits, 30-second
//! step, one step of skew either side. The account label shown in
//! authenticator apps is the user's email under the "Strife" issuer.

use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::{AppError, Result};

const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
const TOTP_SKEW: u8 = 1;
const TOTP_ISSUER: &str = "Strife";

/// A base32-encoded TOTP secret bound to this service's parameters.
#[derive(Debug, Clone)]
pub struct TotpSecret {
    secret_base32: String,
}

impl TotpSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        Self {
            secret_base32: Secret::generate_secret().to_encoded().to_string(),
        }
    }

    /// Restore a secret from its stored base32 form.
    pub fn from_base32(secret: impl Into<String>) -> Result<Self> {
        let secret_base32 = secret.into();
        Secret::Encoded(secret_base32.clone())
            .to_bytes()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid TOTP secret: {:?}", e)))?;

        Ok(Self { secret_base32 })
    }

    /// The base32 form for storage or manual authenticator entry.
    pub fn as_base32(&self) -> &str {
        &self.secret_base32
    }

    /// Verify a 6-digit code against the current time.
    pub fn verify(&self, code: &str, account_email: &str) -> Result<bool> {
        let totp = self.to_totp(account_email)?;
        Ok(totp.check_current(code).unwrap_or(false))
    }

    /// Verify a code at an explicit Unix timestamp.
    ///
    /// Accepted iff the code matches the step containing `time` or one step
    /// either side (a 90-second sliding window).
    pub fn verify_at(&self, code: &str, account_email: &str, time: u64) -> Result<bool> {
        let totp = self.to_totp(account_email)?;
        Ok(totp.check(code, time))
    }

    /// Generate the code for an explicit Unix timestamp.
    pub fn code_at(&self, account_email: &str, time: u64) -> Result<String> {
        let totp = self.to_totp(account_email)?;
        Ok(totp.generate(time))
    }

    /// Generate the code for the current time (the client side of the flow,
    /// used by tests).
    pub fn current_code(&self, account_email: &str) -> Result<String> {
        let totp = self.to_totp(account_email)?;
        totp.generate_current()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("TOTP generation failed: {}", e)))
    }

    /// The otpauth:// provisioning URI for manual entry.
    pub fn otpauth_url(&self, account_email: &str) -> Result<String> {
        Ok(self.to_totp(account_email)?.get_url())
    }

    /// Provisioning QR code as a base64-encoded PNG.
    pub fn qr_code_base64(&self, account_email: &str) -> Result<String> {
        self.to_totp(account_email)?
            .get_qr_base64()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("QR generation failed: {}", e)))
    }

    fn to_totp(&self, account_email: &str) -> Result<TOTP> {
        let secret_bytes = Secret::Encoded(self.secret_base32.clone())
            .to_bytes()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid TOTP secret: {:?}", e)))?;

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret_bytes,
            Some(TOTP_ISSUER.to_string()),
            account_email.to_string(),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("TOTP construction failed: {}", e)))
    }
}
