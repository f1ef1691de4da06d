//! Package download, extraction, and install-directory replacement.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::app_id::ApplicationId;
use super::error::{ManagerError, Result};
use super::reconcile::versions_match;
use super::remote::CatalogSource;
use super::store::InstallStore;
use crate::config::{InstallConfig, InstallStrategy};

/// Name of the temporary archive written inside the target directory.
const TEMP_ARCHIVE: &str = ".download.zip";

/// Result of a successful `install_or_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The installed version already matched the catalog. Nothing was touched.
    AlreadyUpToDate { version: String },
    /// A new version was installed.
    Installed {
        version: String,
        previous_version: Option<String>,
        install_dir: PathBuf,
    },
}

impl InstallOutcome {
    /// The version now installed.
    pub fn version(&self) -> &str {
        match self {
            Self::AlreadyUpToDate { version } | Self::Installed { version, .. } => version,
        }
    }
}

/// Single-flight guard keyed by application id.
///
/// At most one install per application may run at a time. Cloned guards share
/// the same set of in-flight ids.
#[derive(Debug, Clone, Default)]
pub struct InstallGuard {
    in_flight: Arc<Mutex<HashSet<ApplicationId>>>,
}

/// Proof that an install of one application is running. Released on drop.
#[derive(Debug)]
pub struct InstallPermit {
    guard: InstallGuard,
    id: ApplicationId,
}

impl InstallGuard {
    /// Claim `id`, failing if an install for it is already running.
    pub fn acquire(&self, id: &ApplicationId) -> Result<InstallPermit> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(id.clone()) {
            return Err(ManagerError::InstallInProgress {
                id: id.to_string(),
            });
        }
        Ok(InstallPermit {
            guard: self.clone(),
            id: id.clone(),
        })
    }

    /// Whether an install of `id` is currently running.
    pub fn is_busy(&self, id: &ApplicationId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}

impl Drop for InstallPermit {
    fn drop(&mut self) {
        self.guard
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Installer for catalog applications.
pub struct Installer<C> {
    catalog: Arc<C>,
    store: InstallStore,
    guard: InstallGuard,
    strategy: InstallStrategy,
    entry_point: String,
}

impl<C: CatalogSource> Installer<C> {
    /// Create a new installer.
    pub fn new(catalog: Arc<C>, store: InstallStore, config: &InstallConfig) -> Self {
        Self {
            catalog,
            store,
            guard: InstallGuard::default(),
            strategy: config.strategy,
            entry_point: config.entry_point.clone(),
        }
    }

    /// The single-flight guard used by this installer.
    pub fn guard(&self) -> &InstallGuard {
        &self.guard
    }

    /// Install or update an application.
    ///
    /// # Process
    ///
    /// 1. Fetch the latest version. If the installed version matches after
    ///    trimming, return without touching the filesystem.
    /// 2. Replace the install directory, download the package, write it to a
    ///    temporary archive, extract it, write the version marker, and delete
    ///    the temporary archive. With the staged strategy the download comes
    ///    first and the work happens in a staging directory that is swapped in
    ///    at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another install of `id` is running
    /// - The version check or package download fails
    /// - Any filesystem step or the extraction fails
    ///
    /// A failure after an existing install was destroyed is wrapped in
    /// [`ManagerError::InstallInterrupted`].
    pub async fn install_or_update(&self, id: &ApplicationId) -> Result<InstallOutcome> {
        let _permit = self.guard.acquire(id)?;

        let latest = self.catalog.fetch_latest_version(id).await?;
        let latest = latest.trim().to_string();
        let current = self.store.read_install_record(id)?;

        if let Some(record) = &current
            && versions_match(&record.installed_version, &latest)
        {
            info!("{id} is already up to date ({latest})");
            return Ok(InstallOutcome::AlreadyUpToDate { version: latest });
        }

        let previous_version = current.map(|r| r.installed_version);
        match &previous_version {
            Some(previous) => info!("Updating {id} from {previous} to {latest}"),
            None => info!("Installing {id} {latest}"),
        }

        let install_dir = match self.strategy {
            InstallStrategy::Replace => self.replace_in_place(id, &latest).await?,
            InstallStrategy::Staged => self.install_staged(id, &latest).await?,
        };

        info!("Installed {id} {latest} into {}", install_dir.display());
        Ok(InstallOutcome::Installed {
            version: latest,
            previous_version,
            install_dir,
        })
    }

    async fn replace_in_place(&self, id: &ApplicationId, version: &str) -> Result<PathBuf> {
        let removed_previous = self.store.replace_install_dir(id)?;
        let dir = self.store.install_dir_for(id);

        let result = match self.catalog.fetch_package(id).await {
            Ok(bytes) => self.unpack(id, &bytes, &dir, version),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(dir),
            Err(source) if removed_previous => {
                warn!("Install of {id} failed after the previous version was removed");
                Err(ManagerError::interrupted(id, source))
            }
            Err(source) => Err(source),
        }
    }

    async fn install_staged(&self, id: &ApplicationId, version: &str) -> Result<PathBuf> {
        let bytes = self.catalog.fetch_package(id).await?;
        let staging = self.store.prepare_staging_dir(id)?;

        let committed = self
            .unpack(id, &bytes, &staging, version)
            .and_then(|()| self.store.commit_staged(id));
        if let Err(e) = committed {
            self.store.discard_staging(id);
            return Err(e);
        }
        Ok(self.store.install_dir_for(id))
    }

    /// Write `bytes` to a temporary archive in `dir`, expand it there, write
    /// the version marker, then remove the archive.
    fn unpack(&self, id: &ApplicationId, bytes: &[u8], dir: &Path, version: &str) -> Result<()> {
        let archive = dir.join(TEMP_ARCHIVE);
        std::fs::write(&archive, bytes).map_err(|e| ManagerError::fs(&archive, e))?;
        debug!("Wrote {} bytes to {}", bytes.len(), archive.display());

        let result = extract_archive(&archive, dir)
            .and_then(|()| self.prepare_entry_point(id, dir))
            .and_then(|()| self.store.write_marker(dir, version));

        if let Err(e) = std::fs::remove_file(&archive) {
            warn!("Failed to delete temporary archive {}: {e}", archive.display());
        }
        result
    }

    fn prepare_entry_point(&self, id: &ApplicationId, dir: &Path) -> Result<()> {
        let entry = dir.join(&self.entry_point);
        if !entry.is_file() {
            warn!("Package for {id} has no {} entry point", self.entry_point);
            return Ok(());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&entry)
                .map_err(|e| ManagerError::fs(&entry, e))?
                .permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&entry, perms).map_err(|e| ManagerError::fs(&entry, e))?;
        }
        Ok(())
    }
}

fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive).map_err(|e| ManagerError::fs(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| ManagerError::Extraction {
        path: archive.to_path_buf(),
        source: e,
    })?;
    zip.extract(dest).map_err(|e| ManagerError::Extraction {
        path: archive.to_path_buf(),
        source: e,
    })?;
    debug!("Extracted {} entries into {}", zip.len(), dest.display());
    Ok(())
}
