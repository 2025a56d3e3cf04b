//! Deployment configuration.
//!
//! Layers, lowest precedence first: built-in defaults, the TOML config file,
//! then the command line (which also reads `HOST`, `DEST_TEMP_DIR` and
//! `RENEWED_LINEAGE` from the environment).
//!
//! ```toml
//! host = "admin@bigip.example.com"
//! dest_temp_dir = "/var/tmp"
//! sync_group = "failover-group"
//! ssh_options = ["BatchMode=yes"]
//!
//! [profile]
//! name = "web_clientssl"
//! type = "client-ssl"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Staging directory used when nothing else is configured.
pub const DEFAULT_DEST_TEMP_DIR: &str = "/var/tmp";

const APP_DIR: &str = "bigip-deploy";
const CONFIG_FILE: &str = "config.toml";

// ============================================================================
// Settings layers
// ============================================================================

/// One configuration layer. Unset fields fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub host: Option<String>,
    pub dest_temp_dir: Option<String>,
    pub cert_name: Option<String>,
    pub sync_group: Option<String>,
    pub ssh_options: Option<Vec<String>>,
    pub profile: Option<ProfileSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileSettings {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl Settings {
    pub fn defaults() -> Self {
        Self {
            dest_temp_dir: Some(DEFAULT_DEST_TEMP_DIR.to_string()),
            ..Self::default()
        }
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the explicit config file, or the default one if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::debug!("Using config file {}", path.display());
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => {
                log::debug!("Using config file {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Overlay `over` on top of `self`.
    ///
    /// Scalars from `over` win. ssh options from `over` come first, since ssh
    /// keeps the first value it sees for each option.
    pub fn merge(self, over: Self) -> Self {
        let ssh_options = match (over.ssh_options, self.ssh_options) {
            (Some(mut high), Some(low)) => {
                high.extend(low);
                Some(high)
            }
            (high, low) => high.or(low),
        };

        let profile = match (over.profile, self.profile) {
            (Some(high), Some(low)) => Some(ProfileSettings {
                name: high.name.or(low.name),
                kind: high.kind.or(low.kind),
            }),
            (high, low) => high.or(low),
        };

        Self {
            host: over.host.or(self.host),
            dest_temp_dir: over.dest_temp_dir.or(self.dest_temp_dir),
            cert_name: over.cert_name.or(self.cert_name),
            sync_group: over.sync_group.or(self.sync_group),
            ssh_options,
            profile,
        }
    }
}

/// `$XDG_CONFIG_HOME/bigip-deploy/config.toml`, else `~/.config/...`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
    Some(base.join(APP_DIR).join(CONFIG_FILE))
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// A TLS profile to bind the certificate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    /// Profile type, e.g. `client-ssl`
    pub kind: String,
}

/// Fully merged and validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub host: String,
    pub dest_temp_dir: String,
    pub cert_name: Option<String>,
    pub sync_group: Option<String>,
    pub profile: Option<Profile>,
    pub ssh_options: Vec<String>,
}

impl DeployConfig {
    /// Merge defaults, file and command line, then validate.
    pub fn resolve(file: Settings, cli: Settings) -> Result<Self, ConfigError> {
        Self::from_settings(Settings::defaults().merge(file).merge(cli))
    }

    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let profile = match settings.profile {
            None => None,
            Some(ProfileSettings {
                name: None,
                kind: None,
            }) => None,
            Some(ProfileSettings {
                name: Some(name),
                kind: Some(kind),
            }) => Some(Profile { name, kind }),
            Some(_) => return Err(ConfigError::IncompleteProfile),
        };

        let config = Self {
            host: settings.host.ok_or(ConfigError::MissingHost)?,
            dest_temp_dir: settings
                .dest_temp_dir
                .unwrap_or_else(|| DEFAULT_DEST_TEMP_DIR.to_string()),
            cert_name: settings.cert_name,
            sync_group: settings.sync_group,
            profile,
            ssh_options: settings.ssh_options.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that must pass before anything touches the appliance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if !self.dest_temp_dir.starts_with('/') {
            return Err(ConfigError::RelativeStagingDir(self.dest_temp_dir.clone()));
        }
        Ok(())
    }
}
