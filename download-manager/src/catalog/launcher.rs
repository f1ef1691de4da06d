//! Starting installed applications.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use super::app_id::ApplicationId;
use super::error::{ManagerError, Result};
use super::store::InstallStore;

/// A process started by the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedProcess {
    pub pid: u32,
    pub executable: PathBuf,
}

/// Starts the entry-point executable of an installed application.
#[derive(Debug, Clone)]
pub struct Launcher {
    store: InstallStore,
    entry_point: String,
}

impl Launcher {
    pub fn new(store: InstallStore, entry_point: impl Into<String>) -> Self {
        Self {
            store,
            entry_point: entry_point.into(),
        }
    }

    /// Path of the entry point for `id`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::MissingExecutable`] if the file is absent.
    pub fn resolve(&self, id: &ApplicationId) -> Result<PathBuf> {
        let executable = self.store.install_dir_for(id).join(&self.entry_point);
        if !executable.is_file() {
            return Err(ManagerError::MissingExecutable {
                id: id.to_string(),
                path: executable,
            });
        }
        Ok(executable)
    }

    /// Start the application as an independent process.
    ///
    /// No arguments are passed and the exit status is never collected. The
    /// working directory is the install directory.
    pub fn launch(&self, id: &ApplicationId) -> Result<LaunchedProcess> {
        let executable = self.resolve(id)?;
        let mut child = Command::new(&executable)
            .current_dir(self.store.install_dir_for(id))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ManagerError::Launch {
                path: executable.clone(),
                source: e,
            })?;

        let pid = child.id();
        info!("Started {id} (pid: {pid})");

        // Reap the child in the background.
        let name = id.to_string();
        std::thread::spawn(move || match child.wait() {
            Ok(status) => debug!("{name} exited with {status} (pid: {pid})"),
            Err(e) => warn!("Failed to wait for {name} (pid: {pid}): {e}"),
        });
        Ok(LaunchedProcess {
            pid,
            executable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::error::ErrorCategory;
    use crate::catalog::testing::{app, create_temp_store};

    #[test]
    fn test_missing_executable() -> Result<()> {
        let (_temp, store) = create_temp_store();
        let id = app("writer");
        store.replace_install_dir(&id)?;
        store.write_install_record(&id, "1.0.0")?;
        let launcher = Launcher::new(store.clone(), "app.exe");

        let Err(err) = launcher.launch(&id) else {
            panic!("launch should fail without an entry point");
        };
        assert_eq!(err.category(), ErrorCategory::MissingExecutable);

        let record = store.read_install_record(&id)?;
        assert_eq!(record.map(|r| r.installed_version), Some("1.0.0".to_string()));
        Ok(())
    }

    #[test]
    fn test_not_installed_is_missing_executable() {
        let (_temp, store) = create_temp_store();
        let launcher = Launcher::new(store, "app.exe");
        assert!(matches!(
            launcher.resolve(&app("writer")),
            Err(ManagerError::MissingExecutable { .. })
        ));
    }

    #[test]
    fn test_resolve_nested_entry_point() -> Result<()> {
        let (_temp, store) = create_temp_store();
        let id = app("writer");
        store.replace_install_dir(&id)?;
        let bin = store.install_dir_for(&id).join("bin");
        std::fs::create_dir_all(&bin).map_err(|e| ManagerError::fs(&bin, e))?;
        std::fs::write(bin.join("run"), b"").map_err(|e| ManagerError::fs(&bin, e))?;

        let launcher = Launcher::new(store, "bin/run");
        assert_eq!(launcher.resolve(&id)?, bin.join("run"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_script() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, store) = create_temp_store();
        let id = app("writer");
        store.replace_install_dir(&id)?;
        let exe = store.install_dir_for(&id).join("app.exe");
        std::fs::write(&exe, b"#!/bin/sh\nexit 0\n").map_err(|e| ManagerError::fs(&exe, e))?;
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| ManagerError::fs(&exe, e))?;

        let launcher = Launcher::new(store, "app.exe");
        let process = launcher.launch(&id)?;
        assert_eq!(process.executable, exe);
        assert!(process.pid > 0);
        Ok(())
    }
}
