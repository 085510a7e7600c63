// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - wrappers around the external collaborators.

pub mod extractor;
pub mod firebase_auth;
pub mod generator;
pub mod prompts;
pub mod report_parser;

pub use extractor::ExtractionError;
pub use firebase_auth::{AuthError, AuthUser, FirebaseTokenVerifier, TokenVerifier};
pub use generator::{OfflineGenerator, OllamaGenerator, TextGenerator, OFFLINE_RESPONSE};
pub use report_parser::parse_report;
