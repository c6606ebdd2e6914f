use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

// =============================================================================
// Unified config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   config.toml:     [provider]
//                    api_key = "wk-..."
//
//   env var:         INBOX_PROVIDER__API_KEY=wk-...   (double underscore = nesting)
//
//   (single underscore stays within field names: INBOX_SERVER__POLL_INTERVAL_MS)

/// Named configuration presets.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// host=127.0.0.1
    Local,
    /// host=0.0.0.0
    Server,
}

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub provider: ProviderFileConfig,
}

/// Server tuning knobs (lives under `[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// WhatsApp provider credentials (lives under `[provider]` in config.toml).
///
/// These are the bootstrap values. Anything stored through the settings API
/// takes precedence at resolution time.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProviderFileConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
    #[serde(default)]
    pub waba_id: Option<String>,
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

/// Build a figment that layers: defaults → profile defaults → config.toml → INBOX_* env vars.
///
/// Profile defaults sit above struct defaults but below config.toml/env.
/// The CLI profile takes priority over the config file profile.
///
/// Env vars use double-underscore for nesting into sections:
///   `INBOX_SERVER__PORT=4000`  →  `server.port = 4000`
///   `INBOX_PROVIDER__API_KEY=wk-1`  →  `provider.api_key = "wk-1"`
pub fn load_config(data_dir: &Path, cli_profile: Option<&Profile>) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    // Pass 1: peek at profile from config.toml/env (CLI overrides file)
    let base = Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("INBOX_").split("__"));

    let profile: Option<Profile> = cli_profile
        .cloned()
        .or_else(|| base.extract_inner("profile").ok());

    // Pass 2: rebuild with profile defaults as a layer between defaults and config.toml
    let profile_layer = profile_to_file_config(profile.as_ref());

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Serialized::defaults(profile_layer))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("INBOX_").split("__"))
}

/// Convert a profile into a `FileConfig` with the profile's default values filled in.
/// Fields not set by the profile remain at their struct defaults so figment
/// does not override explicit user values from config.toml / env.
fn profile_to_file_config(profile: Option<&Profile>) -> FileConfig {
    match profile {
        Some(Profile::Local) => FileConfig {
            profile: Some(Profile::Local),
            server: ServerFileConfig {
                host: Some("127.0.0.1".to_string()),
                ..Default::default()
            },
            provider: Default::default(),
        },
        Some(Profile::Server) => FileConfig {
            profile: Some(Profile::Server),
            server: ServerFileConfig {
                host: Some("0.0.0.0".to_string()),
                ..Default::default()
            },
            provider: Default::default(),
        },
        None => FileConfig::default(),
    }
}

// =============================================================================
// Directory layout config (not tunable via figment — derived from --data-dir)
// =============================================================================

#[derive(Clone, Debug)]
pub struct InboxConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl InboxConfig {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = custom_dir.unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not find home directory")
                .join(".waba-inbox")
        });

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

        let db_path = data_dir.join("inbox.db");

        info!("Data directory: {}", data_dir.display());

        Ok(Self { data_dir, db_path })
    }

    pub fn db_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.db_path.display())
    }

    pub fn reset_database(&self) -> Result<()> {
        if self.db_path.exists() {
            std::fs::remove_file(&self.db_path)
                .with_context(|| format!("Failed to delete database: {:?}", self.db_path))?;
            info!("Database reset: {:?}", self.db_path);

            let wal_path = self.db_path.with_extension("db-wal");
            if wal_path.exists() {
                std::fs::remove_file(&wal_path)?;
            }
            let shm_path = self.db_path.with_extension("db-shm");
            if shm_path.exists() {
                std::fs::remove_file(&shm_path)?;
            }
        }
        Ok(())
    }

    pub fn config_toml_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}
