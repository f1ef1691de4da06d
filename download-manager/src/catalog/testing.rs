//! In-memory catalog and fixtures shared by the catalog tests.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use super::app_id::ApplicationId;
use super::error::{ManagerError, Result};
use super::remote::CatalogSource;
use super::store::InstallStore;

pub(crate) fn app(id: &str) -> ApplicationId {
    match ApplicationId::new(id) {
        Ok(id) => id,
        Err(e) => panic!("invalid test id: {e}"),
    }
}

pub(crate) fn create_temp_store() -> (TempDir, InstallStore) {
    let temp_dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(e) => panic!("Failed to create temp dir: {e}"),
    };
    let store = InstallStore::new(temp_dir.path().join("TrueOffice"), "version.txt");
    (temp_dir, store)
}

/// Build a stored (uncompressed) zip archive in memory.
pub(crate) fn zip_package(entries: &[(&str, &str)]) -> Vec<u8> {
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        if let Err(e) = writer.start_file(*name, options) {
            panic!("Failed to start zip entry {name}: {e}");
        }
        if let Err(e) = writer.write_all(data.as_bytes()) {
            panic!("Failed to write zip entry {name}: {e}");
        }
    }
    match writer.finish() {
        Ok(cursor) => cursor.into_inner(),
        Err(e) => panic!("Failed to finish zip: {e}"),
    }
}

/// Catalog served from memory, counting every fetch.
#[derive(Debug, Default)]
pub(crate) struct FakeCatalog {
    ids: Vec<ApplicationId>,
    versions: Mutex<HashMap<ApplicationId, String>>,
    packages: HashMap<ApplicationId, Vec<u8>>,
    fail_packages: bool,
    fail_manifest: bool,
    delay: Option<Duration>,
    version_fetches: AtomicUsize,
    package_fetches: AtomicUsize,
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_app(mut self, id: &ApplicationId, version: &str, package: Vec<u8>) -> Self {
        self.ids.push(id.clone());
        self.set_version(id, version);
        self.packages.insert(id.clone(), package);
        self
    }

    /// List `id` in the manifest without publishing a version for it.
    pub(crate) fn with_unpublished(mut self, id: &ApplicationId) -> Self {
        self.ids.push(id.clone());
        self
    }

    pub(crate) fn failing_packages(mut self) -> Self {
        self.fail_packages = true;
        self
    }

    pub(crate) fn failing_manifest(mut self) -> Self {
        self.fail_manifest = true;
        self
    }

    /// Delay every version fetch by `delay`.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn set_version(&self, id: &ApplicationId, version: &str) {
        self.versions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id.clone(), version.to_string());
    }

    pub(crate) fn package_fetches(&self) -> usize {
        self.package_fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn version_fetches(&self) -> usize {
        self.version_fetches.load(Ordering::SeqCst)
    }

    fn url(id: &ApplicationId, file: &str) -> String {
        format!("memory://{id}/{file}")
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch_catalog_ids(&self) -> Result<Vec<ApplicationId>> {
        if self.fail_manifest {
            return Err(ManagerError::Network {
                url: "memory://apps.txt".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self.ids.clone())
    }

    async fn fetch_latest_version(&self, id: &ApplicationId) -> Result<String> {
        self.version_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let version = self
            .versions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned();
        version.ok_or_else(|| ManagerError::HttpStatus {
            url: Self::url(id, "version.txt"),
            status: 404,
        })
    }

    async fn fetch_package(&self, id: &ApplicationId) -> Result<Vec<u8>> {
        self.package_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_packages {
            return Err(ManagerError::Network {
                url: self.package_location(id),
                message: "connection reset".to_string(),
            });
        }
        self.packages
            .get(id)
            .cloned()
            .ok_or_else(|| ManagerError::HttpStatus {
                url: self.package_location(id),
                status: 404,
            })
    }

    fn package_location(&self, id: &ApplicationId) -> String {
        Self::url(id, "latest_win.zip")
    }
}
