// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Althea API Server
//!
//! Stores per-user health profiles and turns uploaded PDF lab reports into
//! plain-language summaries using a medical language model.

use althea::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb, ProfileStore},
    services::{FirebaseTokenVerifier, OfflineGenerator, OllamaGenerator, TextGenerator},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Althea API");

    let store: Arc<dyn ProfileStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(
            FirestoreDb::new(&config.firebase_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let token_verifier = Arc::new(
        FirebaseTokenVerifier::new(&config).expect("Failed to initialize token verifier"),
    );

    let generator = load_generator(&config).await;

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        token_verifier,
        generator,
    });

    // Build router
    let app = althea::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Connect to the model endpoint, falling back to offline mode.
///
/// A missing or unreachable model never stops the server.
async fn load_generator(config: &Config) -> Arc<dyn TextGenerator> {
    let Some(endpoint) = &config.model_endpoint else {
        tracing::warn!("MODEL_ENDPOINT not set, AI features are offline");
        return Arc::new(OfflineGenerator);
    };

    let generator = match OllamaGenerator::new(
        endpoint.as_str(),
        config.model_name.as_str(),
        config.model_max_concurrency,
    ) {
        Ok(generator) => generator,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build model client, AI features are offline");
            return Arc::new(OfflineGenerator);
        }
    };

    match generator.probe().await {
        Ok(()) => {
            tracing::info!(endpoint = %endpoint, model = %generator.model(), "AI model ready");
            Arc::new(generator)
        }
        Err(e) => {
            tracing::error!(error = %e, endpoint = %endpoint, "Model load failed, AI features are offline");
            Arc::new(OfflineGenerator)
        }
    }
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("althea=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
