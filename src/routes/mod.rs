// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod analysis;
pub mod profiles;
pub mod ui;

use crate::error::AppError;
use crate::middleware::auth::{require_auth, TOKEN_HEADER};
use crate::AppState;
use axum::extract::FromRequest;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// JSON body extractor whose rejections use the `{detail}` error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub build_id: String,
}

/// Health check response
async fn health_check(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    let model = if state.generator.is_online() {
        "online"
    } else {
        "offline"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        model: model.to_string(),
        build_id,
    })
}

fn cors_layer(frontend_url: Option<String>) -> CorsLayer {
    let origin = match frontend_url {
        // Allow the configured frontend and localhost (for dev)
        Some(frontend_url) => AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(TOKEN_HEADER),
            HeaderName::from_static(analysis::PROFILE_ID_HEADER),
        ])
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.frontend_url.clone());

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(ui::routes(&state.config.static_dir));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .merge(profiles::routes())
        .merge(analysis::routes(state.config.max_upload_bytes))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
