//! Configuration file handling.
//!
//! The configuration file is stored at `$PULSE_HOME/config.json` and holds
//! the infrastructure settings: the snapshot-vault endpoint, the sync
//! timing knobs and where the vault token lives. User-facing settings
//! (currency) are data, not configuration, and live in the key-value store
//! alongside the records.

use crate::sync::SyncTuning;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "pulse";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const DATA: &str = "data";
const CONFIG_JSON: &str = "config.json";
const VAULT_TOKEN_FILE: &str = "vault_token";

/// Environment variable that overrides the token file.
const VAULT_TOKEN_ENV: &str = "PULSE_VAULT_TOKEN";

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_DEBOUNCE_MS: u64 = 2000;

/// The `Config` object represents the configuration of the app. You
/// instantiate it by providing the path to `$PULSE_HOME` and from there it
/// loads `$PULSE_HOME/config.json`. It provides paths to the other items
/// expected inside the pulse home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    data_dir: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the pulse home directory, its subdirectories, and an initial
    /// `config.json` with default settings.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the data directory,
    ///   e.g. `$HOME/pulse`
    /// - `vault_url` - The base URL of the snapshot-vault service, if cloud
    ///   sync will be used.
    pub async fn create(dir: impl Into<PathBuf>, vault_url: Option<&str>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the pulse home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;
        let data_dir = root.join(DATA);
        utils::make_dir(&data_dir).await?;

        // Validate the vault URL up front so a typo fails at init time.
        if let Some(url) = vault_url {
            Url::parse(url).with_context(|| format!("Invalid vault url '{url}'"))?;
        }

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            vault_url: vault_url.unwrap_or_default().to_string(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            token_path: None,
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets,
            data_dir,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that the pulse home and the config file exist
    /// - load the config file
    /// - return the loaded configuration object
    pub async fn load(pulse_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = pulse_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Pulse home is missing, run 'pulse init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!(
                "The config file is missing '{}', run 'pulse init' first",
                config_path.display()
            )
        }
        let config_file = ConfigFile::load(&config_path).await?;

        Ok(Self {
            secrets: root.join(SECRETS),
            data_dir: root.join(DATA),
            root,
            config_path,
            config_file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    /// The parsed snapshot-vault base URL. Fails when none was configured.
    pub fn vault_url(&self) -> Result<Url> {
        if self.config_file.vault_url.is_empty() {
            bail!(
                "No vault url is configured, set 'vault_url' in '{}'",
                self.config_path.display()
            );
        }
        Url::parse(&self.config_file.vault_url)
            .with_context(|| format!("Invalid vault url '{}'", self.config_file.vault_url))
    }

    /// The vault bearer token: the `PULSE_VAULT_TOKEN` environment variable
    /// wins, otherwise the token file under the secrets directory is read.
    /// The token is deliberately never stored in `config.json` itself.
    pub fn vault_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(VAULT_TOKEN_ENV) {
            if !token.is_empty() {
                return Ok(token);
            }
        }
        let path = self.vault_token_path();
        let token = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Unable to read the vault token. Set {VAULT_TOKEN_ENV} or write the token to '{}'",
                path.display()
            )
        })?;
        let token = token.trim().to_string();
        if token.is_empty() {
            bail!("The vault token file '{}' is empty", path.display());
        }
        Ok(token)
    }

    /// Returns the stored `token_path` if it is absolute, otherwise
    /// resolves it relative to the pulse home.
    pub fn vault_token_path(&self) -> PathBuf {
        let p = self
            .config_file
            .token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(VAULT_TOKEN_FILE));
        if p.is_absolute() {
            p
        } else {
            self.root.join(p)
        }
    }

    /// Returns a copy with the periodic interval overridden, without
    /// touching the file on disk. Used by `pulse watch --interval`.
    pub fn with_sync_interval_secs(mut self, secs: u64) -> Self {
        self.config_file.sync_interval_secs = secs;
        self
    }

    /// The scheduler timing configured for this installation.
    pub fn sync_tuning(&self) -> SyncTuning {
        SyncTuning {
            interval: Duration::from_secs(self.config_file.sync_interval_secs),
            debounce: Duration::from_millis(self.config_file.debounce_ms),
        }
    }
}

/// Represents the serialization and deserialization format of the
/// configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "pulse",
///   "config_version": 1,
///   "vault_url": "https://vault.example.com/",
///   "sync_interval_secs": 300,
///   "debounce_ms": 2000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "pulse"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the snapshot-vault service; empty when cloud sync is
    /// unused
    #[serde(default)]
    vault_url: String,

    /// Seconds between periodic background reconciliations
    #[serde(default = "default_sync_interval")]
    sync_interval_secs: u64,

    /// Quiet window in milliseconds for the mutation-triggered push
    #[serde(default = "default_debounce")]
    debounce_ms: u64,

    /// Path to the vault token file (optional, relative to the pulse home
    /// or absolute). Defaults to $PULSE_HOME/.secrets/vault_token
    #[serde(skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

fn default_sync_interval() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

fn default_debounce() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path.as_ref(), data)
            .await
            .context("Unable to write config file")
    }
}
