//! User model for storage and API.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User account stored in the `users` collection.
///
/// Either `password_hash` or `google_id` is always present; accounts are
/// never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document id
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Email address (unique)
    pub email: String,
    /// Display name shown in the app
    pub display_name: String,
    /// Login handle (unique)
    pub username: String,
    /// Bcrypt hash; absent for federated-only accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Date of birth, ISO `YYYY-MM-DD`
    pub date_of_birth: String,
    /// Public URL of the current avatar
    pub avatar_url: String,
    /// Base32 TOTP secret, present only while 2FA is enabled
    #[serde(
        rename = "twoFASecret",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub two_fa_secret: Option<String>,
    /// Whether TOTP is required at login
    #[serde(rename = "isTwoFAEnabled", default)]
    pub is_two_fa_enabled: bool,
    /// Google subject id for federated accounts (unique when present)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    /// Latest Google access token seen at federated login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_access_token: Option<String>,
}

impl User {
    /// Create a password account.
    pub fn new_local(
        email: String,
        display_name: String,
        username: String,
        password_hash: String,
        date_of_birth: String,
        avatar_url: String,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            email,
            display_name,
            username,
            password_hash: Some(password_hash),
            date_of_birth,
            avatar_url,
            two_fa_secret: None,
            is_two_fa_enabled: false,
            google_id: None,
            google_access_token: None,
        }
    }

    /// Create a Google-federated account.
    pub fn new_federated(
        email: String,
        display_name: String,
        username: String,
        date_of_birth: String,
        avatar_url: String,
        google_id: String,
        google_access_token: Option<String>,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            email,
            display_name,
            username,
            password_hash: None,
            date_of_birth,
            avatar_url,
            two_fa_secret: None,
            is_two_fa_enabled: false,
            google_id: Some(google_id),
            google_access_token,
        }
    }

    /// Whether this account can be verified by password.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// API projection of this user.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.to_hex(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            username: self.username.clone(),
            date_of_birth: self.date_of_birth.clone(),
            avatar_url: self.avatar_url.clone(),
            is_two_fa_enabled: self.is_two_fa_enabled,
            has_google: self.google_id.is_some(),
        }
    }
}

/// User as exposed over the API.
///
/// Never carries the password hash or the TOTP secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub username: String,
    pub date_of_birth: String,
    pub avatar_url: String,
    #[serde(rename = "isTwoFAEnabled")]
    pub is_two_fa_enabled: bool,
    pub has_google: bool,
}

/// Whether a date of birth is a real calendar date in `YYYY-MM-DD` form.
pub fn is_valid_date_of_birth(value: &str) -> bool {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}
