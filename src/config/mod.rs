use std::env;

use crate::secrets::SecretsManager;
use crate::shared::error::StoreError;

/// Vault KV path holding the per-family connection strings.
pub const SHARD_SECRET_PATH: &str = "aistore/shards";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployEnv {
    Production,
    Staging,
    Local,
}

impl DeployEnv {
    pub fn from_env() -> Self {
        match env::var("AISTORE_ENV").ok().as_deref() {
            Some("production") => Self::Production,
            Some("staging") => Self::Staging,
            _ => Self::Local,
        }
    }

    pub fn uses_vault(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Connection strings for every entity family, one shard each.
///
/// Constructed once at process start and handed to `ShardSet`; nothing in
/// this crate reads configuration ambiently after that.
#[derive(Debug, Clone)]
pub struct DbSettings {
    pub users_url: String,
    pub organizations_url: String,
    pub collections_url: String,
    pub resources_url: String,
    pub files_url: String,
    pub meetings_url: String,
    pub websites_url: String,
    pub chats_url: String,
}

impl DbSettings {
    /// Read the eight `*_DB_URL` variables, loading `.env` first.
    pub fn from_env() -> Result<Self, StoreError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            users_url: require_env("USERS_DB_URL")?,
            organizations_url: require_env("ORGANIZATIONS_DB_URL")?,
            collections_url: require_env("COLLECTIONS_DB_URL")?,
            resources_url: require_env("RESOURCES_DB_URL")?,
            files_url: require_env("FILES_DB_URL")?,
            meetings_url: require_env("MEETINGS_DB_URL")?,
            websites_url: require_env("WEBSITES_DB_URL")?,
            chats_url: require_env("CHATS_DB_URL")?,
        })
    }

    /// Read the same values from the Vault secret at [`SHARD_SECRET_PATH`].
    pub async fn from_vault(secrets: &SecretsManager) -> Result<Self, StoreError> {
        let values = secrets
            .get_secret(SHARD_SECRET_PATH)
            .await
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        Ok(Self {
            users_url: require_key(&values, "users_db_url")?,
            organizations_url: require_key(&values, "organizations_db_url")?,
            collections_url: require_key(&values, "collections_db_url")?,
            resources_url: require_key(&values, "resources_db_url")?,
            files_url: require_key(&values, "files_db_url")?,
            meetings_url: require_key(&values, "meetings_db_url")?,
            websites_url: require_key(&values, "websites_db_url")?,
            chats_url: require_key(&values, "chats_db_url")?,
        })
    }

    /// Environment-aware load: Vault for production/staging, `.env` and
    /// process environment otherwise.
    pub async fn load() -> Result<Self, StoreError> {
        if DeployEnv::from_env().uses_vault() {
            let secrets = SecretsManager::from_env()
                .map_err(|e| StoreError::Configuration(e.to_string()))?;
            Self::from_vault(&secrets).await
        } else {
            Self::from_env()
        }
    }
}

fn require_env(name: &str) -> Result<String, StoreError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(StoreError::Configuration(format!("{name} is not set"))),
    }
}

fn require_key(
    values: &std::collections::HashMap<String, String>,
    key: &str,
) -> Result<String, StoreError> {
    match values.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.clone()),
        _ => Err(StoreError::Configuration(format!(
            "{key} missing from secret {SHARD_SECRET_PATH}"
        ))),
    }
}
