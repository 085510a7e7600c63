// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report analysis and the term/chat assistants.

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Report;
use crate::services::{extractor, generator, prompts, report_parser};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::HeaderMap,
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Header naming the profile an uploaded report belongs to.
pub const PROFILE_ID_HEADER: &str = "profile-id";
/// Multipart field holding the PDF.
const FILE_FIELD: &str = "file";

/// Analysis routes (require authentication).
pub fn routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/analyze",
            post(analyze_report).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/define", post(define_term))
        .route("/chat", post(chat))
}

fn profile_id(headers: &HeaderMap) -> Result<String> {
    headers
        .get(PROFILE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("Missing {PROFILE_ID_HEADER} header")))
}

/// Pull the PDF bytes out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Bytes> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return Ok(field.bytes().await?);
        }
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

/// Analyze an uploaded PDF and store the result under the profile.
///
/// The report is persisted before responding, so a following
/// `/profiles/{pid}/latest` sees it.
async fn analyze_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Report>> {
    let pid = profile_id(&headers)?;
    let pdf = read_upload(multipart?).await?;
    tracing::info!(uid = %user.uid, profile_id = %pid, bytes = pdf.len(), "Analyzing report");

    let text = extractor::extract_text_blocking(pdf).await?;
    let prompt = prompts::analysis_prompt(&text);
    let raw = generator::respond(
        state.generator.as_ref(),
        &prompt,
        generator::DEFAULT_MAX_NEW_TOKENS,
    )
    .await;
    let report = report_parser::parse_report(&raw);

    state.store.append_report(&user.uid, &pid, &report).await?;

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct TermRequest {
    pub term: String,
}

#[derive(Debug, Serialize)]
pub struct DefinitionResponse {
    pub definition: String,
}

/// Plain-language definition of a medical term.
async fn define_term(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<TermRequest>,
) -> Json<DefinitionResponse> {
    let prompt = prompts::definition_prompt(&body.term);
    let definition = generator::respond(
        state.generator.as_ref(),
        &prompt,
        generator::DEFAULT_MAX_NEW_TOKENS,
    )
    .await;

    Json(DefinitionResponse { definition })
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ChatRequest>,
) -> Json<ChatResponse> {
    let prompt = prompts::chat_prompt(&body.message);
    let response = generator::respond(
        state.generator.as_ref(),
        &prompt,
        generator::DEFAULT_MAX_NEW_TOKENS,
    )
    .await;

    Json(ChatResponse { response })
}
