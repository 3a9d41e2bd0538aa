use crate::fs::WriteOptions;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Defaults for the `atomwrite` binary. Library callers pass
/// [`WriteOptions`] directly and never touch this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub write: WriteOptions,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Config {
    /// `<config_dir>/atomwrite/config.toml` on the current platform.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "atomwrite").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// An explicit path must exist. The platform default may be absent, in
    /// which case built-in defaults apply.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        match fs::metadata(&path) {
            Ok(_) => Self::load(&path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self {
                    config_path: path,
                    ..Self::default()
                })
            }
            Err(e) => Err(e).with_context(|| format!("Failed to stat config: {}", path.display())),
        }
    }
}
