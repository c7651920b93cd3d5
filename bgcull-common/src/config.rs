//! Configuration loading and root folder resolution
//!
//! Missing or unreadable configuration never stops a service: every loader
//! degrades to compiled defaults and logs a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "BGCULL_ROOT_FOLDER";

/// Name of the per-dataset cache directory under the root folder
pub const CACHE_DIR_NAME: &str = "cache";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info", "debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Catalog service section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog XML API
    #[serde(default)]
    pub base_url: Option<String>,
    /// Opaque session token sent as a bearer credential
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Contents of `bgcull-sync.toml`
///
/// Every field is optional so a partial file still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, falling back to defaults on any problem
    ///
    /// A missing file is normal on first run; an unparseable file is logged and
    /// ignored rather than aborting startup.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded TOML config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Config file unparseable, using defaults");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config file unreadable, using defaults");
                Self::default()
            }
        }
    }
}

/// Default config file path: `<config dir>/bgcull/<module>.toml`
pub fn default_config_path(module_name: &str) -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("bgcull").join(format!("{}.toml", module_name)))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("bgcull"))
        .unwrap_or_else(|| PathBuf::from("./bgcull_data"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `BGCULL_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_root: toml_config.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Prepares the directory layout under a resolved root folder
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Directory holding one JSON document per derived dataset
    pub fn cache_dir(&self) -> PathBuf {
        self.root_folder.join(CACHE_DIR_NAME)
    }

    /// Create root and cache directories if missing
    pub fn ensure_directories_exist(&self) -> Result<()> {
        let cache_dir = self.cache_dir();
        if !cache_dir.exists() {
            std::fs::create_dir_all(&cache_dir)?;
            info!(path = %cache_dir.display(), "Created cache directory");
        }
        Ok(())
    }
}
