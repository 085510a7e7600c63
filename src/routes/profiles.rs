// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile management and report retrieval.

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{NewProfile, Profile};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use std::sync::Arc;
use validator::Validate;

/// Profile routes (require authentication).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profiles", get(list_profiles).post(create_profile))
        .route("/profiles/{pid}/latest", get(latest_report))
}

/// List the caller's profiles, seeding the default one on first access.
async fn list_profiles(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Profile>>> {
    let profiles = state.store.list_or_seed_profiles(&user.uid).await?;
    Ok(Json(profiles))
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<NewProfile>,
) -> Result<Json<Profile>> {
    let body = body.trimmed();
    body.validate()
        .map_err(|e| AppError::BadRequest(format!("Invalid profile: {e}")))?;

    let profile = state.store.create_profile(&user.uid, body).await?;
    Ok(Json(profile))
}

/// Latest report for a profile, or `{}` when there is none.
async fn latest_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(pid): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let body = match state.store.latest_report(&user.uid, &pid).await? {
        Some(report) => serde_json::to_value(report).map_err(anyhow::Error::from)?,
        None => serde_json::json!({}),
    };

    Ok(Json(body))
}
