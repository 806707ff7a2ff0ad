// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strife account service
//!
//! This crate provides the backend API for Strife user accounts:
//! registration, login, two-factor authentication, Google federated login,
//! avatar processing and profile management.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::UserStore;
use services::{AvatarService, GoogleVerifier, TokenIssuer};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: UserStore,
    pub tokens: TokenIssuer,
    pub google: GoogleVerifier,
    pub avatars: AvatarService,
}
