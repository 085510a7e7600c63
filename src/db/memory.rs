//! In-memory profile store for local development and tests.

use super::{ProfileStore, StoreError, DEFAULT_PROFILE_ID};
use crate::models::{NewProfile, Profile, Report};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct StoredReport {
    report: Report,
    timestamp: DateTime<Utc>,
}

/// Process-local store mirroring the Firestore layout.
///
/// Reports are keyed by `(uid, profile_id)` independently of the profile
/// list, matching Firestore where a subcollection can exist under a
/// document that was never written.
#[derive(Debug, Default)]
pub struct MemoryDb {
    profiles: DashMap<String, Vec<Profile>>,
    reports: DashMap<(String, String), Vec<StoredReport>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reports for a profile.
    pub fn report_count(&self, uid: &str, profile_id: &str) -> usize {
        self.reports
            .get(&(uid.to_string(), profile_id.to_string()))
            .map(|r| r.len())
            .unwrap_or(0)
    }

    /// True when no user has profiles or reports.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.reports.is_empty()
    }
}

#[async_trait]
impl ProfileStore for MemoryDb {
    async fn list_profiles(&self, uid: &str) -> Result<Vec<Profile>, StoreError> {
        Ok(self
            .profiles
            .get(uid)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    async fn ensure_default_profile(&self, uid: &str) -> Result<Profile, StoreError> {
        // The entry guard holds the shard lock for the check and the insert.
        let mut profiles = self.profiles.entry(uid.to_string()).or_default();

        if let Some(existing) = profiles.iter().find(|p| p.id == DEFAULT_PROFILE_ID) {
            return Ok(existing.clone());
        }

        let profile = NewProfile::default_profile().with_id(DEFAULT_PROFILE_ID);
        profiles.push(profile.clone());
        Ok(profile)
    }

    async fn create_profile(
        &self,
        uid: &str,
        profile: NewProfile,
    ) -> Result<Profile, StoreError> {
        let profile = profile.with_id(uuid::Uuid::new_v4().simple().to_string());
        self.profiles
            .entry(uid.to_string())
            .or_default()
            .push(profile.clone());
        Ok(profile)
    }

    async fn latest_report(
        &self,
        uid: &str,
        profile_id: &str,
    ) -> Result<Option<Report>, StoreError> {
        let Some(reports) = self.reports.get(&(uid.to_string(), profile_id.to_string())) else {
            return Ok(None);
        };

        // Ties on timestamp resolve to the later insertion.
        Ok(reports
            .iter()
            .enumerate()
            .max_by_key(|(i, r)| (r.timestamp, *i))
            .map(|(_, r)| r.report.clone()))
    }

    async fn append_report(
        &self,
        uid: &str,
        profile_id: &str,
        report: &Report,
    ) -> Result<(), StoreError> {
        self.reports
            .entry((uid.to_string(), profile_id.to_string()))
            .or_default()
            .push(StoredReport {
                report: report.clone(),
                timestamp: Utc::now(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn report(summary: &str) -> Report {
        Report {
            summary: summary.to_string(),
            risks: vec!["High cholesterol".to_string()],
            recommendations: vec![],
        }
    }

    #[tokio::test]
    async fn test_is_empty_tracks_profiles_and_reports() {
        let db = MemoryDb::new();
        assert!(db.is_empty());
        db.ensure_default_profile("user-1").await.unwrap();
        assert!(!db.is_empty());

        let db = MemoryDb::new();
        db.append_report("user-1", "p1", &report("Fine."))
            .await
            .unwrap();
        assert!(!db.is_empty());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = MemoryDb::new();

        let first = db.list_or_seed_profiles("u1").await.unwrap();
        let second = db.list_or_seed_profiles("u1").await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(first[0].name, "My Health");
        assert_eq!(first[0].relation, "Self");
    }

    #[tokio::test]
    async fn test_concurrent_seeding_creates_one_profile() {
        let db = Arc::new(MemoryDb::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { db.list_or_seed_profiles("u1").await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(db.list_profiles("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_profiles_keep_insertion_order_and_user_scope() {
        let db = MemoryDb::new();
        db.list_or_seed_profiles("u1").await.unwrap();
        let mom = db
            .create_profile(
                "u1",
                NewProfile {
                    name: "Mom".to_string(),
                    relation: "Parent".to_string(),
                },
            )
            .await
            .unwrap();

        let names: Vec<_> = db
            .list_profiles("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["My Health", "Mom"]);
        assert!(!mom.id.is_empty());
        assert!(db.list_profiles("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_report_is_most_recent() {
        let db = MemoryDb::new();
        assert_eq!(db.latest_report("u1", "p1").await.unwrap(), None);

        db.append_report("u1", "p1", &report("first")).await.unwrap();
        db.append_report("u1", "p1", &report("second")).await.unwrap();

        let latest = db.latest_report("u1", "p1").await.unwrap().unwrap();
        assert_eq!(latest.summary, "second");
        assert_eq!(db.report_count("u1", "p1"), 2);
        assert_eq!(db.latest_report("u2", "p1").await.unwrap(), None);
    }
}
