//! Health profile model for storage and API.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Name of the profile seeded for a user with no profiles.
pub const DEFAULT_PROFILE_NAME: &str = "My Health";
/// Relation of the seeded profile.
pub const DEFAULT_PROFILE_RELATION: &str = "Self";

/// A named health subject (the user or a dependent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Store-assigned document ID
    pub id: String,
    /// Display name ("My Health", "Mom", ...)
    pub name: String,
    /// Relation to the account owner ("Self", "Parent", ...)
    pub relation: String,
}

/// Request body for creating a profile.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProfile {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub relation: String,
}

impl NewProfile {
    /// The profile created on first access.
    pub fn default_profile() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            relation: DEFAULT_PROFILE_RELATION.to_string(),
        }
    }

    /// Trim surrounding whitespace from both fields.
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            relation: self.relation.trim().to_string(),
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Profile {
        Profile {
            id: id.into(),
            name: self.name,
            relation: self.relation,
        }
    }
}
