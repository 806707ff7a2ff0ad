//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; request handlers only ever see the
//! cached `Config` inside the shared state.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS and redirects
    pub frontend_url: String,
    /// MongoDB connection string
    pub mongo_uri: String,
    /// MongoDB database name
    pub mongo_db: String,
    /// JWT signing key for session and step tokens (raw bytes)
    pub token_key: Vec<u8>,
    /// S3-compatible endpoint (MinIO in dev)
    pub s3_endpoint: String,
    /// S3 access key
    pub s3_access_key: String,
    /// S3 secret key
    pub s3_secret_key: String,
    /// Public base URL for stored objects; defaults to the S3 endpoint
    pub s3_public_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let s3_endpoint =
            env::var("S3_ENDPOINT").map_err(|_| ConfigError::Missing("S3_ENDPOINT"))?;
        let s3_public_url = env::var("S3_PUBLIC_URL")
            .unwrap_or_else(|_| s3_endpoint.clone())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            mongo_uri: env::var("MONGO_URI").map_err(|_| ConfigError::Missing("MONGO_URI"))?,
            mongo_db: env::var("MONGO_DB").unwrap_or_else(|_| "strife".to_string()),
            token_key: env::var("TOKEN_KEY")
                .map_err(|_| ConfigError::Missing("TOKEN_KEY"))?
                .into_bytes(),
            s3_endpoint,
            s3_access_key: env::var("S3_ACCESS_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("S3_ACCESS_KEY"))?,
            s3_secret_key: env::var("S3_SECRET_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("S3_SECRET_KEY"))?,
            s3_public_url,
        })
    }

    /// Configuration for tests; no external services are reachable.
    pub fn test_default() -> Self {
        Self {
            port: 3000,
            frontend_url: "http://localhost:5173".to_string(),
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_db: "strife-test".to_string(),
            token_key: b"test_token_key_32_bytes_minimum!".to_vec(),
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_access_key: "test_access_key".to_string(),
            s3_secret_key: "test_secret_key".to_string(),
            s3_public_url: "http://localhost:9000".to_string(),
        }
    }

    /// Public URL of the default avatar served to accounts without an upload.
    pub fn default_avatar_url(&self) -> String {
        format!("{}/avatars/avatar-default.jpg", self.s3_public_url)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
