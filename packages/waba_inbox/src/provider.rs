//! Provider credential resolution.
//!
//! Credentials live in two places: the `app_settings` table (editable through
//! the admin settings API) and the `[provider]` section of config.toml. The
//! database wins so an admin can rotate keys without a restart; the config
//! file only bootstraps a fresh install.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use waba_client::WabaClient;

use crate::config::ProviderFileConfig;
use crate::repository::InboxRepository;

/// Effective provider configuration with the API key redacted.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSettings {
    pub api_key_set: bool,
    pub api_base_url: String,
    pub phone_number_id: Option<String>,
    pub waba_id: Option<String>,
}

pub struct ProviderResolver {
    repository: Arc<InboxRepository>,
    bootstrap: ProviderFileConfig,
}

impl ProviderResolver {
    pub fn new(repository: Arc<InboxRepository>, bootstrap: ProviderFileConfig) -> Self {
        Self {
            repository,
            bootstrap,
        }
    }

    /// Build a client from the current credentials.
    pub async fn client(&self) -> Result<WabaClient> {
        let api_key = self
            .require("api_key", self.bootstrap.api_key.as_deref())
            .await?;
        let base_url = self
            .resolve("api_base_url", self.bootstrap.api_base_url.as_deref())
            .await?;

        Ok(match base_url {
            Some(url) => WabaClient::with_base_url(api_key, url),
            None => WabaClient::new(api_key),
        })
    }

    pub async fn phone_number_id(&self) -> Result<String> {
        self.require("phone_number_id", self.bootstrap.phone_number_id.as_deref())
            .await
    }

    pub async fn waba_id(&self) -> Result<String> {
        self.require("waba_id", self.bootstrap.waba_id.as_deref())
            .await
    }

    /// Snapshot for the settings screen. The API key itself never leaves the
    /// server, only whether one is stored.
    pub async fn settings(&self) -> Result<ProviderSettings> {
        let api_key = self
            .resolve("api_key", self.bootstrap.api_key.as_deref())
            .await?;
        let api_base_url = self
            .resolve("api_base_url", self.bootstrap.api_base_url.as_deref())
            .await?
            .unwrap_or_else(|| waba_client::DEFAULT_BASE_URL.to_string());
        let phone_number_id = self
            .resolve("phone_number_id", self.bootstrap.phone_number_id.as_deref())
            .await?;
        let waba_id = self.resolve("waba_id", self.bootstrap.waba_id.as_deref()).await?;

        Ok(ProviderSettings {
            api_key_set: api_key.is_some(),
            api_base_url,
            phone_number_id,
            waba_id,
        })
    }

    async fn resolve(&self, key: &str, fallback: Option<&str>) -> Result<Option<String>> {
        if let Some(value) = self.repository.get_setting(key).await? {
            if !value.is_empty() {
                return Ok(Some(value));
            }
        }
        Ok(fallback.map(str::to_string))
    }

    async fn require(&self, key: &str, fallback: Option<&str>) -> Result<String> {
        self.resolve(key, fallback).await?.with_context(|| {
            format!(
                "Missing provider credential '{}': set it in the admin settings or under [provider] in config.toml",
                key
            )
        })
    }
}
