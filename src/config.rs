use anyhow::{bail, Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable consulted when the config file carries no credentials
pub const CREDENTIALS_ENV: &str = "MIRRORKEEP_CREDENTIALS";

/// Main configuration structure for MirrorKeep
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Root directory of the mirror store
    pub mirror_root: String,

    /// Delimited account credentials: "username:secret,username:secret,..."
    /// Falls back to the MIRRORKEEP_CREDENTIALS environment variable when unset.
    pub credentials: Option<String>,

    /// Synchronization behavior settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Schedule settings for the recurring reconciliation pass
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Synchronization configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Maximum parallel git operations per pass
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

/// Schedule configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ScheduleConfig {
    /// Interval between reconciliation passes ("30m", "6h", "1d").
    /// When unset, passes run once per day at local midnight.
    pub interval: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"
}

// Default value functions
fn default_max_parallel() -> usize {
    4
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirror_root: "${HOME}/mirrors".to_string(),
            credentials: None,
            sync: SyncConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// One account identity: a username plus the bearer secret used for both the
/// API listing and the git transport. Immutable once loaded at process start.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub secret: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Secrets never reach logs
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from the default location or create a default config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let mut config = Self::default();

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            // The file keeps the unexpanded form so it stays portable; the
            // returned config is expanded exactly like a loaded one.
            config.save(&config_path)?;
            config.expand_paths()?;

            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("mirrorkeep").join("config.yml"))
    }

    /// Expand environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.mirror_root = shellexpand::full(&self.mirror_root)
            .context("Failed to expand mirror_root path")?
            .into_owned();

        Ok(())
    }

    /// Resolve the account set from the config file or the environment.
    ///
    /// Malformed or missing credentials are fatal: the process does not start
    /// without at least one well-formed account.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        let raw = match &self.credentials {
            Some(value) => value.clone(),
            None => env::var(CREDENTIALS_ENV).with_context(|| {
                format!(
                    "No credentials configured: set `credentials` in the config file \
                     or the {} environment variable",
                    CREDENTIALS_ENV
                )
            })?,
        };

        parse_credentials(&raw)
    }
}

/// Parse a delimited credential list ("username:secret,username:secret,...")
/// into an ordered account set.
pub fn parse_credentials(raw: &str) -> Result<Vec<Account>> {
    let mut accounts = Vec::new();

    for (index, entry) in raw.split(',').enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        // Entry contents never reach the error message: they may hold a secret
        let Some((username, secret)) = entry.split_once(':') else {
            bail!(
                "Malformed credential entry #{}: expected username:secret",
                index + 1
            );
        };

        if username.is_empty() || secret.is_empty() {
            bail!(
                "Malformed credential entry #{}: empty username or secret",
                index + 1
            );
        }

        accounts.push(Account {
            username: username.to_string(),
            secret: secret.to_string(),
        });
    }

    if accounts.is_empty() {
        bail!("Credential list is empty: at least one username:secret pair is required");
    }

    Ok(accounts)
}
