//! Database layer (Firestore, with an in-memory stand-in).
//!
//! Layout: `users/{uid}/profiles/{profile_id}/reports/{report_id}`. Every
//! operation takes the owning user's ID so no path crosses user namespaces.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{NewProfile, Profile, Report};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PROFILES: &str = "profiles";
    /// Nested under each profile document
    pub const REPORTS: &str = "reports";
}

/// Document ID of the profile seeded on first access.
///
/// A fixed ID turns seeding into a create-if-absent write, so concurrent
/// first requests cannot seed twice.
pub const DEFAULT_PROFILE_ID: &str = "default";

/// Document store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Backend(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Per-user profile and report storage.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// All profiles for a user, oldest first.
    async fn list_profiles(&self, uid: &str) -> Result<Vec<Profile>, StoreError>;

    /// Create the default profile unless it already exists; returns it either way.
    async fn ensure_default_profile(&self, uid: &str) -> Result<Profile, StoreError>;

    /// Create a profile with a store-assigned ID.
    async fn create_profile(&self, uid: &str, profile: NewProfile)
        -> Result<Profile, StoreError>;

    /// Most recently created report for a profile, without its timestamp.
    ///
    /// Unknown profiles are not an error; they simply have no reports.
    async fn latest_report(
        &self,
        uid: &str,
        profile_id: &str,
    ) -> Result<Option<Report>, StoreError>;

    /// Persist a new report stamped with the current time.
    async fn append_report(
        &self,
        uid: &str,
        profile_id: &str,
        report: &Report,
    ) -> Result<(), StoreError>;

    /// List profiles, seeding the default one for a user who has none.
    async fn list_or_seed_profiles(&self, uid: &str) -> Result<Vec<Profile>, StoreError> {
        let profiles = self.list_profiles(uid).await?;
        if !profiles.is_empty() {
            return Ok(profiles);
        }

        let profile = self.ensure_default_profile(uid).await?;
        tracing::info!(uid, profile_id = %profile.id, "Seeded default profile");
        Ok(vec![profile])
    }
}
