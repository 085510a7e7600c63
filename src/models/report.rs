// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Analysis report model.

use serde::{Deserialize, Serialize};

/// One AI-generated analysis of an uploaded report.
///
/// This is the externally visible shape. The stored document also carries a
/// creation timestamp, which never leaves the store layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub summary: String,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
}
