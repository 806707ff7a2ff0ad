// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strife API Server
//!
//! Backend for Strife account management: registration, login, two-factor
//! authentication, Google federated login and profile editing.

use std::sync::Arc;

use strife_api::{
    config::Config,
    db::UserStore,
    services::{AvatarService, GoogleVerifier, ObjectStorage, TokenIssuer},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Strife API");

    // Connect to MongoDB
    let db = UserStore::connect(&config.mongo_uri, &config.mongo_db)
        .await
        .expect("Failed to connect to MongoDB");

    // Object storage for avatars
    let storage = ObjectStorage::connect(&config);
    let avatars = AvatarService::new(storage);

    // Stateless token issuer for sessions and step tokens
    let tokens = TokenIssuer::new(&config.token_key);

    // Google userinfo verifier
    let google = GoogleVerifier::new().expect("Failed to initialize Google verifier");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        tokens,
        google,
        avatars,
    });

    // Build router
    let app = strife_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strife_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
