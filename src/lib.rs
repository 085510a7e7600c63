// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Althea: AI-assisted reading of medical reports.
//!
//! This crate provides the backend API that stores per-user health profiles,
//! extracts text from uploaded PDF reports and asks a language model to
//! summarize them.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::ProfileStore;
use services::{TextGenerator, TokenVerifier};
use std::sync::Arc;

/// Shared application state.
///
/// Every external collaborator is held behind a trait object so tests can
/// swap in fakes.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ProfileStore>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub generator: Arc<dyn TextGenerator>,
}
