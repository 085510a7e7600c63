// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Text generation backed by a pretrained causal language model.
//!
//! The model runs behind an Ollama-compatible HTTP endpoint. When no model is
//! reachable every call degrades to [`OFFLINE_RESPONSE`] instead of failing
//! the request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Returned in place of generated text when the model is unavailable.
pub const OFFLINE_RESPONSE: &str = "AI Offline.";
/// Upper bound on generated tokens per call.
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 512;
/// Context window requested from the model; prompts are bounded to fit.
pub const CONTEXT_TOKENS: u32 = 2048;
const TEMPERATURE: f64 = 0.4;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Generation failures. None of these reach the client.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("no language model is loaded")]
    Offline,

    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model {0} is not available on the endpoint")]
    ModelMissing(String),
}

/// Prompt-in, continuation-out text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a continuation of `prompt`, without the prompt itself.
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, GeneratorError>;

    /// Whether a model is loaded at all.
    fn is_online(&self) -> bool {
        true
    }
}

/// Generate a response, falling back to [`OFFLINE_RESPONSE`] on any failure.
pub async fn respond(generator: &dyn TextGenerator, prompt: &str, max_new_tokens: u32) -> String {
    match generator.generate(prompt, max_new_tokens).await {
        Ok(text) => text,
        Err(GeneratorError::Offline) => OFFLINE_RESPONSE.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Text generation failed, answering offline");
            OFFLINE_RESPONSE.to_string()
        }
    }
}

/// Generator used when no model could be loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
    async fn generate(&self, _prompt: &str, _max_new_tokens: u32) -> Result<String, GeneratorError> {
        Err(GeneratorError::Offline)
    }

    fn is_online(&self) -> bool {
        false
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    /// Skip the chat template; the prompt is sent verbatim.
    raw: bool,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaGenerator {
    http: reqwest::Client,
    base_url: String,
    model: String,
    /// Bounds in-flight inference calls; the runtime is not assumed reentrant.
    permits: Semaphore,
}

impl OllamaGenerator {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_concurrency: usize,
    ) -> Result<Self, GeneratorError> {
        // No overall timeout: a slow generation holds its request open.
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            permits: Semaphore::new(max_concurrency.max(1)),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check that the endpoint is up and serves the configured model.
    pub async fn probe(&self) -> Result<(), GeneratorError> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        let tags: TagsResponse = check_status(response).await?.json().await?;

        let found = tags
            .models
            .iter()
            .any(|m| model_name_matches(&m.name, &self.model));
        if !found {
            return Err(GeneratorError::ModelMissing(self.model.clone()));
        }

        Ok(())
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, GeneratorError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| GeneratorError::Offline)?;

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            raw: true,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                num_predict: max_new_tokens,
                num_ctx: CONTEXT_TOKENS,
            },
        };

        let started = std::time::Instant::now();
        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;
        let body: GenerateResponse = check_status(response).await?.json().await?;

        tracing::debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = body.response.len(),
            "Generated text"
        );

        Ok(strip_prompt_echo(prompt, &body.response).to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GeneratorError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(GeneratorError::Api { status, body })
}

/// `apollo2-2b` matches the `apollo2-2b:latest` tag.
fn model_name_matches(tag: &str, model: &str) -> bool {
    tag == model
        || tag
            .strip_prefix(model)
            .is_some_and(|rest| rest.starts_with(':'))
}

/// Return only the continuation past the prompt, trimmed.
pub fn strip_prompt_echo<'a>(prompt: &str, output: &'a str) -> &'a str {
    output.strip_prefix(prompt).unwrap_or(output).trim()
}
