// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Avatar processing and storage.
//!
//! Uploaded bytes are sniffed (the client's declared content type is never
//! trusted), center-crop resized to 512x512 and re-encoded as JPEG before
//! landing in the avatars bucket under a name derived from the owner.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, ImageFormat};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::services::storage::{ObjectStorage, AVATARS_BUCKET};

const AVATAR_SIZE: u32 = 512;
const JPEG_QUALITY: u8 = 85;
/// Upload size cap, enforced as the request body limit on the avatar route.
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

const ALLOWED_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Avatar pipeline bound to object storage.
#[derive(Clone)]
pub struct AvatarService {
    storage: ObjectStorage,
}

impl AvatarService {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }

    /// The underlying storage handle.
    pub fn storage(&self) -> &ObjectStorage {
        &self.storage
    }

    /// Validate, normalize and store an avatar; returns its public URL.
    pub async fn process_and_store(&self, owner_key: &str, bytes: &[u8]) -> Result<String> {
        let processed = process_image(bytes)?;
        self.storage
            .put_object(
                AVATARS_BUCKET,
                &object_key(owner_key),
                processed,
                "image/jpeg",
            )
            .await
    }

    /// Delete the stored avatar object for an owner.
    pub async fn remove(&self, owner_key: &str) -> Result<()> {
        self.storage
            .delete_object(AVATARS_BUCKET, &object_key(owner_key))
            .await
    }
}

/// Sniff, decode, center-crop to 512x512 and re-encode as JPEG.
fn process_image(bytes: &[u8]) -> Result<Vec<u8>> {
    let format = image::guess_format(bytes).map_err(|_| invalid_format())?;
    if !ALLOWED_FORMATS.contains(&format) {
        return Err(invalid_format());
    }

    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(|_| invalid_format())?;

    let resized = decoded
        .resize_to_fill(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3)
        .to_rgb8();

    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    resized
        .write_with_encoder(encoder)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Avatar encoding failed: {}", e)))?;

    Ok(out.into_inner())
}

/// Stable object name for an owner: `avatar-<sha256(owner)[..12]>.jpg`.
pub fn object_key(owner_key: &str) -> String {
    let digest = hex::encode(Sha256::digest(owner_key.as_bytes()));
    format!("avatar-{}.jpg", &digest[..12])
}

fn invalid_format() -> AppError {
    AppError::BadRequest(
        "Invalid image format. Please upload a valid image (JPEG, PNG, WebP).".to_string(),
    )
}
