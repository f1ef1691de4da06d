//! Configuration loading and management for the download manager.
//!
//! The configuration is stored in TOML format and defines:
//! - Where the catalog manifest, version files and packages are published
//! - Where applications are installed and how they are laid out on disk
//! - Which install strategy to use when replacing an existing install

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::catalog::ApplicationId;
use crate::catalog::platform::PackagePlatform;

/// File name searched for in the working and config directories.
pub const CONFIG_FILE_NAME: &str = "download-manager.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// How an existing install is replaced by a new version.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstallStrategy {
    /// Clear the install directory first, then download and extract into it.
    #[default]
    Replace,
    /// Download and extract into a staging directory, then swap it into place.
    Staged,
}

/// Remote catalog locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    /// URL of the plain-text manifest listing one application id per line.
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Base URL under which every application has its own folder.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path between the application folder and its published files.
    #[serde(default = "default_content_path")]
    pub content_path: String,

    /// Name of the per-application version file.
    #[serde(default = "default_version_file")]
    pub version_file: String,

    /// Name of the package archive. Defaults to `latest_<platform>.zip`.
    #[serde(default)]
    pub package_file: Option<String>,

    /// Request timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_manifest_url() -> String {
    "https://github.com/TrueOffice/apps/raw/refs/heads/main/apps.txt".to_string()
}

fn default_base_url() -> String {
    "https://github.com/TrueOffice".to_string()
}

fn default_content_path() -> String {
    "raw/refs/heads/main".to_string()
}

fn default_version_file() -> String {
    "version.txt".to_string()
}

fn default_user_agent() -> String {
    format!("download-manager/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            manifest_url: default_manifest_url(),
            base_url: default_base_url(),
            content_path: default_content_path(),
            version_file: default_version_file(),
            package_file: None,
            request_timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl CatalogConfig {
    /// URL of the version file for `id`.
    #[must_use]
    pub fn version_url(&self, id: &ApplicationId) -> String {
        self.file_url(id, &self.version_file)
    }

    /// URL of the package archive for `id`.
    #[must_use]
    pub fn package_url(&self, id: &ApplicationId) -> String {
        self.file_url(id, &self.package_file_name())
    }

    /// Name of the package archive, resolved against the current platform.
    #[must_use]
    pub fn package_file_name(&self) -> String {
        self.package_file
            .clone()
            .unwrap_or_else(|| PackagePlatform::detect().package_file_name())
    }

    /// Request timeout, if one is configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    fn file_url(&self, id: &ApplicationId, file: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let content = self.content_path.trim_matches('/');
        if content.is_empty() {
            format!("{base}/{id}/{file}")
        } else {
            format!("{base}/{id}/{content}/{file}")
        }
    }
}

/// Local install layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallConfig {
    /// Folder under the per-user data directory that holds every application.
    #[serde(default = "default_product_namespace")]
    pub product_namespace: String,

    /// Override for the per-user data directory.
    #[serde(default)]
    pub data_root: Option<PathBuf>,

    /// Name of the version marker file inside each install directory.
    #[serde(default = "default_version_marker")]
    pub version_marker: String,

    /// Relative path of the executable started by `launch`.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// Replacement strategy for existing installs.
    #[serde(default)]
    pub strategy: InstallStrategy,
}

fn default_product_namespace() -> String {
    "TrueOffice".to_string()
}

fn default_version_marker() -> String {
    "version.txt".to_string()
}

fn default_entry_point() -> String {
    "app.exe".to_string()
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            product_namespace: default_product_namespace(),
            data_root: None,
            version_marker: default_version_marker(),
            entry_point: default_entry_point(),
            strategy: InstallStrategy::default(),
        }
    }
}

impl InstallConfig {
    /// Resolve the namespace root given the system data directory (pure function).
    ///
    /// An explicit `data_root` wins over `system_data_dir`. Returns `None` when
    /// neither is available.
    #[must_use]
    pub fn resolve_install_root(&self, system_data_dir: Option<&Path>) -> Option<PathBuf> {
        self.data_root
            .as_deref()
            .or(system_data_dir)
            .map(|root| root.join(&self.product_namespace))
    }

    /// Get the namespace root using the per-user local data directory.
    #[must_use]
    pub fn install_root(&self) -> Option<PathBuf> {
        let data_dir = directories::BaseDirs::new().map(|dirs| dirs.data_local_dir().to_path_buf());
        self.resolve_install_root(data_dir.as_deref())
    }
}

/// Complete download manager configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManagerConfig {
    /// Remote catalog settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Local install settings.
    #[serde(default)]
    pub install: InstallConfig,
}

impl ManagerConfig {
    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load configuration from a file, falling back to defaults if it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ManagerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate URLs and file names (pure function).
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("catalog.manifest_url", &self.catalog.manifest_url)?;
        check_url("catalog.base_url", &self.catalog.base_url)?;
        check_file_name("catalog.version_file", &self.catalog.version_file)?;
        if let Some(package_file) = &self.catalog.package_file {
            check_file_name("catalog.package_file", package_file)?;
        }
        check_file_name("install.product_namespace", &self.install.product_namespace)?;
        check_file_name("install.version_marker", &self.install.version_marker)?;
        check_relative_path("install.entry_point", &self.install.entry_point)?;
        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigError> {
    reqwest::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::ValidationError(format!("{field} '{value}' is not a URL: {e}")))
}

/// A single path segment: non-empty, no separators, not `.` or `..`.
fn check_file_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be a single file name, got '{value}'"
        )));
    }
    Ok(())
}

/// A relative path that stays inside the install directory.
fn check_relative_path(field: &str, value: &str) -> Result<(), ConfigError> {
    let path = Path::new(value);
    let escapes = path
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)));
    if value.is_empty() || escapes {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be a relative path inside the install directory, got '{value}'"
        )));
    }
    Ok(())
}
