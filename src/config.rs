//! Configuration loading.
//!
//! Loads `~/.eap8021x/config.toml` (or `$EAP8021X_CONFIG_PATH`). A missing
//! file yields defaults. Environment variables override file values; file
//! values override defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::access::{AccessPolicy, AIRPORT_GROUP, SYSTEM_TRUSTED_APPS};
use crate::credential::{DEFAULT_KIND, WLAN_SERVICE_PREFIX};

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "EAP8021X_CONFIG_PATH";
/// Environment variable overriding the log level.
pub const LOG_ENV: &str = "EAP8021X_LOG";
/// Environment variable overriding the store directory.
pub const STORE_DIR_ENV: &str = "EAP8021X_STORE_DIR";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the file-backed stores live.
    pub store: StoreConfig,
    /// Credential layout defaults.
    pub credential: CredentialConfig,
    /// Default access policy for saved passwords.
    pub access: AccessConfig,
    /// Log level and destination.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load with precedence env > file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = config_path_with(env)?;
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from `path` without env overrides. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::debug!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML or mistyped fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Apply environment overrides through `env`.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(level) = env(LOG_ENV).filter(|v| !v.trim().is_empty()) {
            self.logging.level = level;
        }
        if let Some(dir) = env(STORE_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.store.dir = Some(PathBuf::from(dir));
        }
    }
}

/// Resolve the default config directory (`~/.eap8021x/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".eap8021x"))
}

/// Config file path: `$EAP8021X_CONFIG_PATH`, else `config.toml` in [`config_dir`].
///
/// # Errors
///
/// Returns an error if the home directory is needed and cannot be determined.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(path) = env(CONFIG_PATH_ENV).filter(|v| !v.trim().is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join("config.toml"))
}

/// File-backed store locations.
///
/// Each path falls back to a fixed file name inside `dir`, and `dir` falls
/// back to the directory passed to the accessors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the store files.
    pub dir: Option<PathBuf>,
    /// User keychain document.
    pub user_keychain: Option<PathBuf>,
    /// System keychain document.
    pub system_keychain: Option<PathBuf>,
    /// Profile controller document.
    pub profiles: Option<PathBuf>,
}

impl StoreConfig {
    fn resolve(&self, explicit: Option<&PathBuf>, base: &Path, name: &str) -> PathBuf {
        explicit.cloned().unwrap_or_else(|| {
            self.dir
                .as_deref()
                .unwrap_or(base)
                .join(name)
        })
    }

    /// User keychain path.
    pub fn user_keychain_path(&self, base: &Path) -> PathBuf {
        self.resolve(self.user_keychain.as_ref(), base, "user-keychain.json")
    }

    /// System keychain path.
    pub fn system_keychain_path(&self, base: &Path) -> PathBuf {
        self.resolve(self.system_keychain.as_ref(), base, "system-keychain.json")
    }

    /// Profile document path.
    pub fn profiles_path(&self, base: &Path) -> PathBuf {
        self.resolve(self.profiles.as_ref(), base, "profiles.json")
    }
}

/// Defaults for credentials written by the CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Kind recorded when none is given.
    pub default_kind: String,
    /// Prefix of the service name derived from the ssid.
    pub service_prefix: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            default_kind: DEFAULT_KIND.to_owned(),
            service_prefix: WLAN_SERVICE_PREFIX.to_owned(),
        }
    }
}

/// Access policy attached to passwords saved by the CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Let any application decrypt. The lists below are then ignored.
    pub all_applications: bool,
    /// Trusted application paths.
    pub trusted_app_paths: Vec<String>,
    /// Trusted application groups.
    pub trusted_app_groups: Vec<String>,
    /// Whether the writing application is trusted.
    pub include_self: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            all_applications: false,
            trusted_app_paths: SYSTEM_TRUSTED_APPS.iter().map(|p| (*p).to_owned()).collect(),
            trusted_app_groups: vec![AIRPORT_GROUP.to_owned()],
            include_self: true,
        }
    }
}

impl AccessConfig {
    /// The configured policy.
    pub fn policy(&self) -> AccessPolicy {
        if self.all_applications {
            return AccessPolicy::AllApplications;
        }
        AccessPolicy::Specific {
            trusted_app_paths: self.trusted_app_paths.iter().cloned().collect(),
            trusted_app_groups: self.trusted_app_groups.iter().cloned().collect(),
            include_self: self.include_self,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily JSON log files. Console only when absent.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            dir: None,
        }
    }
}
