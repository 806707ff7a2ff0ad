// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object storage for user-uploaded assets.
//!
//! Talks to any S3-compatible endpoint (MinIO in development) with static
//! credentials and path-style addressing. Tests run against an in-memory
//! backend instead.

use std::sync::Arc;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use dashmap::DashMap;

use crate::config::Config;
use crate::error::AppError;

/// Bucket holding processed avatars.
pub const AVATARS_BUCKET: &str = "avatars";

/// Storage handle, cheap to clone.
#[derive(Clone)]
pub struct ObjectStorage {
    backend: Backend,
    public_base: String,
}

#[derive(Clone)]
enum Backend {
    S3(aws_sdk_s3::Client),
    Memory(Arc<DashMap<String, Vec<u8>>>),
}

impl ObjectStorage {
    /// Build an S3 client against the configured endpoint.
    pub fn connect(config: &Config) -> Self {
        let credentials = Credentials::new(
            config.s3_access_key.clone(),
            config.s3_secret_key.clone(),
            None,
            None,
            "env",
        );

        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(&config.s3_endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        tracing::info!(endpoint = %config.s3_endpoint, "Object storage client initialized");

        Self {
            backend: Backend::S3(aws_sdk_s3::Client::from_conf(s3_config)),
            public_base: config.s3_public_url.clone(),
        }
    }

    /// Create an in-memory store for tests.
    pub fn new_memory(config: &Config) -> Self {
        Self {
            backend: Backend::Memory(Arc::new(DashMap::new())),
            public_base: config.s3_public_url.clone(),
        }
    }

    /// Store an object and return its public URL.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        match &self.backend {
            Backend::S3(client) => {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(bytes))
                    .content_type(content_type)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))?;
            }
            Backend::Memory(map) => {
                map.insert(format!("{}/{}", bucket, key), bytes);
            }
        }

        Ok(self.public_url(bucket, key))
    }

    /// Delete an object; missing objects are not an error.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::S3(client) => {
                client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))?;
            }
            Backend::Memory(map) => {
                map.remove(&format!("{}/{}", bucket, key));
            }
        }

        Ok(())
    }

    /// Public URL for an object under the configured base.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, key)
    }

    /// Read back an object from the in-memory backend (tests only).
    pub fn memory_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        match &self.backend {
            Backend::S3(_) => None,
            Backend::Memory(map) => map
                .get(&format!("{}/{}", bucket, key))
                .map(|entry| entry.value().clone()),
        }
    }
}
