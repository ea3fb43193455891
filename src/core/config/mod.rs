//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! The first existing file wins:
//! 1. An explicit path (the CLI's `--config`)
//! 2. `$CHANGESET_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/changeset/config.toml`
//! 4. `~/.changeset/config.toml`
//!
//! A missing file is not an error; defaults apply. An explicit path that
//! does not exist is an error.
//!
//! # Example
//!
//! ```no_run
//! use simple_changeset::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! let options = config.staging_options();
//! println!("identity: {:?}", options.relationship_identity);
//! ```

pub mod schema;

pub use schema::{ChangesetConfig, IdentityPolicy, StagingOptions};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file not found: {0}")]
    NotFound(PathBuf),
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ChangesetConfig,
    /// Path the configuration was read from (if any)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration, preferring `explicit` over the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed,
    /// or if `explicit` names a file that does not exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::from_path(path);
        }

        match Self::discover() {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Read and parse a config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    /// Find the first config file present in the standard locations.
    fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CHANGESET_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("changeset/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".changeset/config.toml"))
            .filter(|path| path.exists())
    }

    /// Path the configuration came from, or `None` for defaults.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn relationship_identity(&self) -> IdentityPolicy {
        self.file.relationship_identity.unwrap_or_default()
    }

    pub fn apply_transforms(&self) -> bool {
        self.file.apply_transforms.unwrap_or(true)
    }

    /// Options for a proxy, with defaults filled in.
    pub fn staging_options(&self) -> StagingOptions {
        StagingOptions {
            relationship_identity: self.relationship_identity(),
            apply_transforms: self.apply_transforms(),
        }
    }
}
