//! Configuration management
//!
//! The configuration file is TOML at `$RESYNC_CONFIG_DIR/config.toml`, or
//! `<platform config dir>/resync/config.toml` when the variable is unset.
//! It carries output defaults, session settings and the storage aliases
//! remote locators refer to.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::is_valid_alias_name;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Overrides the configuration directory
pub const CONFIG_DIR_ENV: &str = "RESYNC_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";
const SESSION_DIR: &str = "session";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version; files newer than this build are refused
    pub schema_version: u32,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub aliases: Vec<Alias>,
}

/// Default settings for CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto", "always", or "never"
    #[serde(default = "default_color")]
    pub color: String,

    /// Show progress while transferring
    #[serde(default = "default_true")]
    pub progress: bool,
}

/// Where sessions are kept and how eagerly they are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Session directory; `<config dir>/session` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Planned pairs buffered ahead of the transfer loop
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Extra attempts for a failed checkpoint write
    #[serde(default = "default_checkpoint_retries")]
    pub checkpoint_retries: u32,
}

/// A named S3-compatible endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket lookup style: "auto", "path", or "dns"
    #[serde(default = "default_bucket_lookup")]
    pub bucket_lookup: String,
}

fn default_output() -> String {
    "human".to_string()
}

fn default_color() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    crate::plan::DEFAULT_CAPACITY
}

fn default_checkpoint_retries() -> u32 {
    crate::session::DEFAULT_CHECKPOINT_RETRIES
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            progress: true,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            dir: None,
            queue_capacity: default_queue_capacity(),
            checkpoint_retries: default_checkpoint_retries(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            session: SessionSettings::default(),
            aliases: Vec::new(),
        }
    }
}

impl Alias {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: default_region(),
            bucket_lookup: default_bucket_lookup(),
        }
    }

    /// Check the name and endpoint before the alias is used
    pub fn validate(&self) -> Result<()> {
        if !is_valid_alias_name(&self.name) {
            return Err(Error::Config(format!("invalid alias name '{}'", self.name)));
        }
        let endpoint = url::Url::parse(&self.endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "alias '{}': endpoint must be http or https, got '{}'",
                self.name,
                endpoint.scheme()
            )));
        }
        if !matches!(self.bucket_lookup.as_str(), "auto" | "path" | "dns") {
            return Err(Error::Config(format!(
                "alias '{}': unknown bucket_lookup '{}'",
                self.name, self.bucket_lookup
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Look up a validated alias by name
    pub fn alias(&self, name: &str) -> Result<&Alias> {
        let alias = self
            .aliases
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::AliasNotFound(name.to_string()))?;
        alias.validate()?;
        Ok(alias)
    }
}

/// Loads and saves the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Use `$RESYNC_CONFIG_DIR`, or the platform config directory
    pub fn new() -> Result<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(Self::in_dir(PathBuf::from(dir)));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        Ok(Self::in_dir(config_dir.join("resync")))
    }

    /// Use an explicit configuration directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Session directory, relative settings resolved against the config dir
    pub fn session_dir(&self, config: &Config) -> PathBuf {
        match &config.session.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.config_dir.join(dir),
            None => self.config_dir.join(SESSION_DIR),
        }
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the default configuration.
    pub fn load(&self) -> Result<Config> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;

        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade resync.",
                config.schema_version, SCHEMA_VERSION
            )));
        }
        if config.session.queue_capacity == 0 {
            return Err(Error::Config("session.queue_capacity must be at least 1".into()));
        }

        tracing::debug!(path = %path.display(), aliases = config.aliases.len(), "configuration loaded");
        Ok(config)
    }

    /// Save configuration to disk, readable by the owner only
    pub fn save(&self, config: &Config) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let path = self.config_path();

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions)?;
        }

        Ok(())
    }
}
