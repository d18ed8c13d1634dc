//! Shard Connection Provider
//!
//! Each entity family lives in its own independently provisioned database.
//! This module resolves, per family, a pooled connection to that family's
//! shard from the explicit `DbSettings` handed in at startup. Pools are
//! built lazily exactly once per family and cached for the process
//! lifetime; repositories clone the cached pool.

use log::info;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::DbSettings;
use crate::shared::error::StoreError;
use crate::shared::utils::{build_pool, DbPool};

/// One entity family per shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityFamily {
    Users,
    Organizations,
    Collections,
    Resources,
    Files,
    Meetings,
    Websites,
    Chats,
}

impl EntityFamily {
    pub const ALL: [EntityFamily; 8] = [
        EntityFamily::Users,
        EntityFamily::Organizations,
        EntityFamily::Collections,
        EntityFamily::Resources,
        EntityFamily::Files,
        EntityFamily::Meetings,
        EntityFamily::Websites,
        EntityFamily::Chats,
    ];

    /// Environment variable holding this family's connection string.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Users => "USERS_DB_URL",
            Self::Organizations => "ORGANIZATIONS_DB_URL",
            Self::Collections => "COLLECTIONS_DB_URL",
            Self::Resources => "RESOURCES_DB_URL",
            Self::Files => "FILES_DB_URL",
            Self::Meetings => "MEETINGS_DB_URL",
            Self::Websites => "WEBSITES_DB_URL",
            Self::Chats => "CHATS_DB_URL",
        }
    }

    fn url<'a>(&self, settings: &'a DbSettings) -> &'a str {
        match self {
            Self::Users => &settings.users_url,
            Self::Organizations => &settings.organizations_url,
            Self::Collections => &settings.collections_url,
            Self::Resources => &settings.resources_url,
            Self::Files => &settings.files_url,
            Self::Meetings => &settings.meetings_url,
            Self::Websites => &settings.websites_url,
            Self::Chats => &settings.chats_url,
        }
    }
}

/// Owns the per-family connection pools.
pub struct ShardSet {
    settings: DbSettings,
    pools: RwLock<HashMap<EntityFamily, DbPool>>,
}

impl ShardSet {
    /// Fails fast if any family's connection string is missing; there is
    /// no default shard to fall back to.
    pub fn new(settings: DbSettings) -> Result<Self, StoreError> {
        for family in EntityFamily::ALL {
            if family.url(&settings).trim().is_empty() {
                return Err(StoreError::Configuration(format!(
                    "{} is not configured",
                    family.env_var()
                )));
            }
        }

        Ok(Self {
            settings,
            pools: RwLock::new(HashMap::new()),
        })
    }

    /// Get the pool for a family, building it on first use.
    pub fn pool(&self, family: EntityFamily) -> Result<DbPool, StoreError> {
        {
            let pools = self
                .pools
                .read()
                .map_err(|_| StoreError::Pool("shard pool lock poisoned".to_string()))?;
            if let Some(pool) = pools.get(&family) {
                return Ok(pool.clone());
            }
        }

        let pool = build_pool(family.url(&self.settings))?;

        let mut pools = self
            .pools
            .write()
            .map_err(|_| StoreError::Pool("shard pool lock poisoned".to_string()))?;
        // Another caller may have raced us here; the first pool in wins.
        let pool = pools.entry(family).or_insert(pool).clone();
        info!("Shard pool ready for {:?} family", family);

        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_util;

    fn settings_with_all_urls() -> DbSettings {
        DbSettings {
            users_url: "postgres://svc:pw@users-db:5432/users".to_string(),
            organizations_url: "postgres://svc:pw@orgs-db:5432/organizations".to_string(),
            collections_url: "postgres://svc:pw@collections-db:5432/collections".to_string(),
            resources_url: "postgres://svc:pw@resources-db:5432/resources".to_string(),
            files_url: "postgres://svc:pw@files-db:5432/files".to_string(),
            meetings_url: "postgres://svc:pw@meetings-db:5432/meetings".to_string(),
            websites_url: "postgres://svc:pw@websites-db:5432/websites".to_string(),
            chats_url: "postgres://svc:pw@chats-db:5432/chats".to_string(),
        }
    }

    #[test]
    fn test_every_family_has_a_distinct_env_var() {
        test_util::setup();
        let mut seen = std::collections::HashSet::new();
        for family in EntityFamily::ALL {
            assert!(seen.insert(family.env_var()), "duplicate env var for {family:?}");
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_missing_url_fails_construction() {
        let mut settings = settings_with_all_urls();
        settings.resources_url = String::new();

        let err = ShardSet::new(settings).err().expect("expected failure");
        match err {
            StoreError::Configuration(msg) => assert!(msg.contains("RESOURCES_DB_URL")),
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_complete_settings_construct() {
        assert!(ShardSet::new(settings_with_all_urls()).is_ok());
    }
}
