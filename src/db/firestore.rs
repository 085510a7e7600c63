// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (`users/{uid}/profiles`)
//! - Reports (`users/{uid}/profiles/{profile_id}/reports`)

use super::{collections, ProfileStore, StoreError, DEFAULT_PROFILE_ID};
use crate::models::{NewProfile, Profile, Report};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::{FirestoreQueryDirection, ParentPathBuilder};
use std::cmp::Ordering;
use serde::{Deserialize, Serialize};

/// Stored profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileDocument {
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    id: Option<String>,
    name: String,
    relation: String,
    /// Orders listings by insertion. Absent on documents written before the
    /// field existed.
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    created_at: Option<DateTime<Utc>>,
}

impl ProfileDocument {
    fn new(profile: NewProfile) -> Self {
        Self {
            id: None,
            name: profile.name,
            relation: profile.relation,
            created_at: Some(Utc::now()),
        }
    }

    fn into_profile(self, fallback_id: Option<&str>) -> Result<Profile, StoreError> {
        let id = self
            .id
            .or_else(|| fallback_id.map(str::to_string))
            .ok_or_else(|| StoreError::Backend("Profile document without ID".to_string()))?;
        Ok(Profile {
            id,
            name: self.name,
            relation: self.relation,
        })
    }
}

/// Stored report document. `timestamp` never leaves this module.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReportDocument {
    summary: String,
    #[serde(default)]
    risks: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    timestamp: DateTime<Utc>,
}

impl From<ReportDocument> for Report {
    fn from(doc: ReportDocument) -> Self {
        Report {
            summary: doc.summary,
            risks: doc.risks,
            recommendations: doc.recommendations,
        }
    }
}

/// Oldest first. Documents without `created_at` come before all others and
/// keep the order the query returned them in.
fn sort_by_creation(docs: &mut [ProfileDocument]) {
    docs.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

fn db_error(e: FirestoreError) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// `users/{uid}`
    fn user_path(&self, uid: &str) -> Result<ParentPathBuilder, StoreError> {
        self.client
            .parent_path(collections::USERS, uid)
            .map_err(|e| StoreError::InvalidPath(e.to_string()))
    }

    /// `users/{uid}/profiles/{profile_id}`
    fn profile_path(&self, uid: &str, profile_id: &str) -> Result<ParentPathBuilder, StoreError> {
        self.user_path(uid)?
            .at(collections::PROFILES, profile_id)
            .map_err(|e| StoreError::InvalidPath(e.to_string()))
    }

    async fn get_profile(&self, uid: &str, profile_id: &str) -> Result<Option<Profile>, StoreError> {
        let parent = self.user_path(uid)?;
        let doc: Option<ProfileDocument> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .parent(&parent)
            .obj()
            .one(profile_id)
            .await
            .map_err(db_error)?;

        doc.map(|d| d.into_profile(Some(profile_id))).transpose()
    }
}

#[async_trait]
impl ProfileStore for FirestoreDb {
    async fn list_profiles(&self, uid: &str) -> Result<Vec<Profile>, StoreError> {
        let parent = self.user_path(uid)?;
        // No server-side order_by: Firestore drops documents missing the
        // ordered field, which would hide legacy profiles.
        let mut docs: Vec<ProfileDocument> = self
            .client
            .fluent()
            .select()
            .from(collections::PROFILES)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(db_error)?;
        sort_by_creation(&mut docs);

        docs.into_iter().map(|d| d.into_profile(None)).collect()
    }

    async fn ensure_default_profile(&self, uid: &str) -> Result<Profile, StoreError> {
        let parent = self.user_path(uid)?;
        let doc = ProfileDocument::new(NewProfile::default_profile());

        // Insert fails with a conflict if the document already exists.
        let result: Result<ProfileDocument, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::PROFILES)
            .document_id(DEFAULT_PROFILE_ID)
            .parent(&parent)
            .object(&doc)
            .execute()
            .await;

        match result {
            Ok(created) => created.into_profile(Some(DEFAULT_PROFILE_ID)),
            Err(FirestoreError::DataConflictError(_)) => {
                tracing::debug!(uid, "Default profile already exists");
                self.get_profile(uid, DEFAULT_PROFILE_ID)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Backend("Default profile vanished after conflict".to_string())
                    })
            }
            Err(e) => Err(db_error(e)),
        }
    }

    async fn create_profile(
        &self,
        uid: &str,
        profile: NewProfile,
    ) -> Result<Profile, StoreError> {
        let parent = self.user_path(uid)?;
        let created: ProfileDocument = self
            .client
            .fluent()
            .insert()
            .into(collections::PROFILES)
            .generate_document_id()
            .parent(&parent)
            .object(&ProfileDocument::new(profile))
            .execute()
            .await
            .map_err(db_error)?;

        let profile = created.into_profile(None)?;
        tracing::info!(uid, profile_id = %profile.id, "Created profile");
        Ok(profile)
    }

    async fn latest_report(
        &self,
        uid: &str,
        profile_id: &str,
    ) -> Result<Option<Report>, StoreError> {
        let parent = self.profile_path(uid, profile_id)?;
        let docs: Vec<ReportDocument> = self
            .client
            .fluent()
            .select()
            .from(collections::REPORTS)
            .parent(&parent)
            .order_by([("timestamp", FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(db_error)?;

        Ok(docs.into_iter().next().map(Report::from))
    }

    async fn append_report(
        &self,
        uid: &str,
        profile_id: &str,
        report: &Report,
    ) -> Result<(), StoreError> {
        let parent = self.profile_path(uid, profile_id)?;
        let doc = ReportDocument {
            summary: report.summary.clone(),
            risks: report.risks.clone(),
            recommendations: report.recommendations.clone(),
            timestamp: Utc::now(),
        };

        let _: ReportDocument = self
            .client
            .fluent()
            .insert()
            .into(collections::REPORTS)
            .generate_document_id()
            .parent(&parent)
            .object(&doc)
            .execute()
            .await
            .map_err(db_error)?;

        tracing::info!(uid, profile_id, "Stored report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc(id: &str, created_at: Option<DateTime<Utc>>) -> ProfileDocument {
        ProfileDocument {
            id: Some(id.to_string()),
            name: id.to_string(),
            relation: "Self".to_string(),
            created_at,
        }
    }

    fn ids(docs: &[ProfileDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_deref().unwrap()).collect()
    }

    #[test]
    fn test_legacy_profiles_without_created_at_are_listed_first() {
        let t = |secs| Some(Utc.timestamp_opt(secs, 0).unwrap());
        let mut docs = vec![
            doc("newer", t(2_000)),
            doc("legacy-a", None),
            doc("older", t(1_000)),
            doc("legacy-b", None),
        ];

        sort_by_creation(&mut docs);

        assert_eq!(ids(&docs), ["legacy-a", "legacy-b", "older", "newer"]);
    }

    #[test]
    fn test_profile_document_without_created_at_deserializes() {
        let legacy: ProfileDocument =
            serde_json::from_value(serde_json::json!({"name": "Dad", "relation": "Parent"}))
                .unwrap();
        assert!(legacy.created_at.is_none());

        let profile = legacy.into_profile(Some("dad")).unwrap();
        assert_eq!(profile.id, "dad");
        assert_eq!(profile.name, "Dad");
    }
}
