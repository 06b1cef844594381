//! Profile source trait and test implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::profile::{Profile, Tenant};

/// Trait for fetching identity-provider profiles.
///
/// Abstracted to support different backends (HTTP provider, tests).
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the profile for a tenant-scoped account uuid.
    ///
    /// An unknown account is `Ok(None)`, not an error.
    async fn get_profile(&self, account_uuid: &str, tenant: &Tenant) -> Result<Option<Profile>>;
}

/// An in-memory profile source for tests, keyed by account uuid.
#[derive(Debug, Default)]
pub struct StaticProfiles {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl StaticProfiles {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile under its account uuid.
    pub async fn insert(&self, account_uuid: &str, profile: Profile) {
        self.profiles
            .write()
            .await
            .insert(account_uuid.to_string(), profile);
    }
}

#[async_trait]
impl ProfileSource for StaticProfiles {
    async fn get_profile(&self, account_uuid: &str, _tenant: &Tenant) -> Result<Option<Profile>> {
        Ok(self.profiles.read().await.get(account_uuid).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_profiles() {
        let source = StaticProfiles::new();
        source
            .insert("u1", Profile::from_body("u1", json!({"email": "a@b.c"})))
            .await;

        let tenant = Tenant::new("CM", "NA");
        let found = source.get_profile("u1", &tenant).await.unwrap();
        assert_eq!(found.unwrap().get_str("email"), Some("a@b.c"));

        let missing = source.get_profile("u2", &tenant).await.unwrap();
        assert!(missing.is_none());
    }
}
