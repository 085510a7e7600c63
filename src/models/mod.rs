// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod profile;
pub mod report;

pub use profile::{NewProfile, Profile};
pub use report::Report;
