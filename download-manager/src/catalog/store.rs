//! On-disk install state for catalog applications.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::app_id::ApplicationId;
use super::error::{ManagerError, Result};
use crate::config::InstallConfig;

/// Directory under the namespace root holding in-progress staged installs.
const STAGING_DIR: &str = ".staging";

/// Directory under the namespace root holding installs being swapped out.
const RETIRED_DIR: &str = ".retired";

/// Installed state of one application, read from its version marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallRecord {
    pub id: ApplicationId,
    pub installed_version: String,
    pub install_dir: PathBuf,
}

/// Manages the per-application install directories.
///
/// Layout: `<root>/<id>/` holds the expanded package and a version marker.
/// `<root>` is the per-user local data directory joined with the product
/// namespace. Application ids never start with `.`, so the hidden staging
/// and retired folders cannot collide with an install directory.
#[derive(Debug, Clone)]
pub struct InstallStore {
    root: PathBuf,
    version_marker: String,
}

impl InstallStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, version_marker: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            version_marker: version_marker.into(),
        }
    }

    /// Create a store from the install configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no per-user data directory can be determined.
    pub fn from_config(config: &InstallConfig) -> Result<Self> {
        let root = config
            .install_root()
            .ok_or_else(|| ManagerError::DataDirectory {
                message: "Could not determine the local application data directory".to_string(),
            })?;
        Ok(Self::new(root, config.version_marker.clone()))
    }

    /// Namespace root holding every install directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Install directory for `id`. Pure path derivation.
    pub fn install_dir_for(&self, id: &ApplicationId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Staging directory used while building a new install of `id`.
    pub fn staging_dir_for(&self, id: &ApplicationId) -> PathBuf {
        self.root.join(STAGING_DIR).join(id.as_str())
    }

    fn retired_dir_for(&self, id: &ApplicationId) -> PathBuf {
        self.root.join(RETIRED_DIR).join(id.as_str())
    }

    fn marker_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.version_marker)
    }

    /// Read the install record for `id`.
    ///
    /// Returns `Ok(None)` when the install directory or its version marker is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker exists but cannot be read.
    pub fn read_install_record(&self, id: &ApplicationId) -> Result<Option<InstallRecord>> {
        let install_dir = self.install_dir_for(id);
        let marker = self.marker_in(&install_dir);
        if !install_dir.is_dir() || !marker.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&marker).map_err(|e| ManagerError::fs(&marker, e))?;
        Ok(Some(InstallRecord {
            id: id.clone(),
            installed_version: content.trim().to_string(),
            install_dir,
        }))
    }

    /// Overwrite the version marker for `id` with the trimmed `version`.
    ///
    /// The install directory must already exist.
    pub fn write_install_record(&self, id: &ApplicationId, version: &str) -> Result<()> {
        self.write_marker(&self.install_dir_for(id), version)
    }

    /// Write a trimmed version marker into `dir`.
    pub fn write_marker(&self, dir: &Path, version: &str) -> Result<()> {
        let marker = self.marker_in(dir);
        std::fs::write(&marker, version.trim()).map_err(|e| ManagerError::fs(&marker, e))
    }

    /// Delete the install directory for `id` if present, then recreate it empty.
    ///
    /// Returns `true` if a previous directory was deleted. Irreversible.
    ///
    /// # Errors
    ///
    /// A failure once a previous directory existed may leave it partly
    /// deleted and is returned as [`ManagerError::InstallInterrupted`].
    pub fn replace_install_dir(&self, id: &ApplicationId) -> Result<bool> {
        let dir = self.install_dir_for(id);
        let existed = dir.exists();
        let prepared = remove_dir_if_exists(&dir).and_then(|_| {
            std::fs::create_dir_all(&dir).map_err(|e| ManagerError::fs(&dir, e))
        });

        match prepared {
            Ok(()) => {
                debug!("Prepared empty install directory {}", dir.display());
                Ok(existed)
            }
            Err(source) if existed => Err(ManagerError::interrupted(id, source)),
            Err(source) => Err(source),
        }
    }

    /// Delete the install directory for `id`.
    ///
    /// Returns `false` if nothing was installed.
    pub fn remove(&self, id: &ApplicationId) -> Result<bool> {
        remove_dir_if_exists(&self.install_dir_for(id))
    }

    /// Clear and recreate the staging directory for `id`.
    pub fn prepare_staging_dir(&self, id: &ApplicationId) -> Result<PathBuf> {
        let dir = self.staging_dir_for(id);
        remove_dir_if_exists(&dir)?;
        std::fs::create_dir_all(&dir).map_err(|e| ManagerError::fs(&dir, e))?;
        Ok(dir)
    }

    /// Best-effort removal of the staging directory for `id`.
    pub fn discard_staging(&self, id: &ApplicationId) {
        let dir = self.staging_dir_for(id);
        if let Err(e) = remove_dir_if_exists(&dir) {
            warn!("Failed to clean up staging directory: {e}");
        }
    }

    /// Swap the staged install of `id` into place.
    ///
    /// The current install is first moved aside and only deleted after the
    /// staged directory has been renamed into its place. If that rename fails
    /// the previous install is moved back.
    ///
    /// Returns `true` if a previous install was replaced. If the previous
    /// install cannot be moved back the error is
    /// [`ManagerError::InstallInterrupted`].
    pub fn commit_staged(&self, id: &ApplicationId) -> Result<bool> {
        let staged = self.staging_dir_for(id);
        let target = self.install_dir_for(id);
        let retired = self.retired_dir_for(id);

        let had_previous = target.exists();
        if had_previous {
            remove_dir_if_exists(&retired)?;
            create_parent(&retired)?;
            std::fs::rename(&target, &retired).map_err(|e| ManagerError::fs(&target, e))?;
        }

        if let Err(e) = std::fs::rename(&staged, &target) {
            let source = ManagerError::fs(&staged, e);
            if had_previous && let Err(restore) = std::fs::rename(&retired, &target) {
                warn!(
                    "Failed to restore previous install of {id} from {}: {restore}",
                    retired.display()
                );
                return Err(ManagerError::interrupted(id, source));
            }
            return Err(source);
        }

        if had_previous && let Err(e) = remove_dir_if_exists(&retired) {
            warn!("Failed to delete retired install of {id}: {e}");
        }
        Ok(had_previous)
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(dir).map_err(|e| ManagerError::fs(dir, e))?;
    Ok(true)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ManagerError::fs(parent, e))?;
    }
    Ok(())
}
