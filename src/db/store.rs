// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! MongoDB client wrapper with typed operations on the `users` collection.
//!
//! Carries two backends: the real MongoDB collection and a dashmap-backed
//! in-memory store used by the test suite, so integration tests can drive
//! complete flows without a running database.

use std::sync::Arc;

use dashmap::DashMap;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Client, Collection};

use crate::db::collections;
use crate::error::AppError;
use crate::models::User;

/// User persistence handle, cheap to clone.
#[derive(Clone)]
pub struct UserStore {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Mongo(Collection<User>),
    Memory(Arc<DashMap<ObjectId, User>>),
}

impl UserStore {
    /// Connect to MongoDB and bind the `users` collection.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, AppError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        let collection = client.database(db_name).collection(collections::USERS);

        tracing::info!(db = db_name, "Connected to MongoDB");

        Ok(Self {
            backend: Backend::Mongo(collection),
        })
    }

    /// Create an in-memory store for tests.
    pub fn new_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(DashMap::new())),
        }
    }

    /// Get a user by document id.
    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Mongo(coll) => coll
                .find_one(doc! { "_id": *id })
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(map) => Ok(map.get(id).map(|entry| entry.value().clone())),
        }
    }

    /// Get a user by login handle.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Mongo(coll) => coll
                .find_one(doc! { "username": username })
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(map) => Ok(map
                .iter()
                .find(|entry| entry.value().username == username)
                .map(|entry| entry.value().clone())),
        }
    }

    /// Get a user by email address.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Mongo(coll) => coll
                .find_one(doc! { "email": email })
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(map) => Ok(map
                .iter()
                .find(|entry| entry.value().email == email)
                .map(|entry| entry.value().clone())),
        }
    }

    /// Get a user by Google subject id.
    pub async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Mongo(coll) => coll
                .find_one(doc! { "googleId": google_id })
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(map) => Ok(map
                .iter()
                .find(|entry| entry.value().google_id.as_deref() == Some(google_id))
                .map(|entry| entry.value().clone())),
        }
    }

    /// Whether an email address is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    /// Whether a username is already taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    /// Insert a new user.
    pub async fn insert(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(coll) => {
                coll.insert_one(user)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(map) => {
                map.insert(user.id, user.clone());
                Ok(())
            }
        }
    }

    /// Persist the full user document (fetch-modify-write; last write wins).
    pub async fn update(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(coll) => {
                coll.replace_one(doc! { "_id": user.id }, user)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(map) => {
                map.insert(user.id, user.clone());
                Ok(())
            }
        }
    }
}
