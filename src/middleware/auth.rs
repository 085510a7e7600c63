// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ID token authentication middleware.

use crate::error::AppError;
use crate::services::AuthError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub use crate::services::AuthUser;

/// Header carrying the ID token, as sent by the web UI.
pub const TOKEN_HEADER: &str = "token";

/// Raw credential from the `token` header, falling back to `Authorization`.
fn raw_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TOKEN_HEADER)
        .or_else(|| headers.get(header::AUTHORIZATION))
        .and_then(|h| h.to_str().ok())
}

/// Middleware that requires a valid ID token.
///
/// Runs before any handler, so a rejected request never touches the store
/// or the model.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(raw) = raw_token(request.headers()) else {
        tracing::debug!("Rejected request without token");
        return Err(AppError::Unauthorized);
    };

    let user = state.token_verifier.verify(raw).await.map_err(|err| {
        match &err {
            AuthError::Rejected(reason) => {
                tracing::debug!(reason = %reason, "Rejected invalid token")
            }
            AuthError::Unavailable(reason) => {
                tracing::error!(reason = %reason, "Token verification unavailable")
            }
        }
        AppError::Unauthorized
    })?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
