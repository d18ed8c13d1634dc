//! Secrets Management Module
//!
//! HashiCorp Vault integration via `vaultrs`. In production and staging the
//! per-shard connection strings live in Vault KV v2; locally everything
//! comes from `.env`. There is no env fallback once Vault is required.

use anyhow::{anyhow, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::env;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::kv2;

/// Vault KV v2 client built from `VAULT_ADDR` / `VAULT_TOKEN`.
pub struct SecretsManager {
    client: Option<VaultClient>,
    enabled: bool,
}

impl SecretsManager {
    pub fn from_env() -> Result<Self> {
        let addr = env::var("VAULT_ADDR").unwrap_or_default();
        let token = env::var("VAULT_TOKEN").unwrap_or_default();
        let enabled = !addr.is_empty() && !token.is_empty();

        if !enabled {
            warn!("Vault not configured; set VAULT_ADDR and VAULT_TOKEN");
            return Ok(Self {
                client: None,
                enabled: false,
            });
        }

        let settings = VaultClientSettingsBuilder::default()
            .address(&addr)
            .token(&token)
            .build()?;
        let client = VaultClient::new(settings)?;

        info!("Vault client initialized: {}", addr);

        Ok(Self {
            client: Some(client),
            enabled: true,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn get_secret(&self, path: &str) -> Result<HashMap<String, String>> {
        let client = self.client.as_ref().ok_or_else(|| {
            anyhow!("Vault not configured. Set VAULT_ADDR and VAULT_TOKEN in .env")
        })?;

        let data: HashMap<String, String> = kv2::read(client, "secret", path).await?;
        Ok(data)
    }

    pub async fn get_value(&self, path: &str, key: &str) -> Result<String> {
        self.get_secret(path)
            .await?
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("Key '{}' not found in '{}'", key, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_util;

    #[tokio::test]
    async fn test_unconfigured_manager_is_disabled_and_refuses_reads() {
        test_util::setup();
        env::remove_var("VAULT_ADDR");
        env::remove_var("VAULT_TOKEN");

        let manager = SecretsManager::from_env().expect("construction never needs Vault");
        assert!(!manager.is_enabled());
        assert!(manager.get_secret("aistore/shards").await.is_err());
    }
}
