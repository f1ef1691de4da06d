//! Entry point used by the presentation layer.
//!
//! `AppManager` ties the catalog, store, installer and launcher together and
//! is the boundary at which errors become user-facing messages.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use super::app_id::ApplicationId;
use super::error::Result;
use super::installer::{InstallOutcome, Installer};
use super::launcher::{LaunchedProcess, Launcher};
use super::reconcile::{Action, CatalogEntry, ReconciliationState, reconcile};
use super::remote::CatalogSource;
use super::store::InstallStore;
use crate::config::InstallConfig;

/// State of one catalog application, or why it could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppStatus {
    pub id: ApplicationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ReconciliationState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppStatus {
    /// Action to offer, if the state is known.
    pub fn action(&self) -> Option<Action> {
        self.state.as_ref().map(ReconciliationState::action)
    }
}

/// Outcome of a user-triggered action, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub id: ApplicationId,
    pub action: Action,
    pub success: bool,
    pub message: String,
    /// State after the action, re-queried so the caller can update its affordance.
    pub state: Option<ReconciliationState>,
}

/// Coordinates catalog queries, installs and launches.
pub struct AppManager<C> {
    catalog: Arc<C>,
    store: InstallStore,
    installer: Installer<C>,
    launcher: Launcher,
}

impl<C: CatalogSource> AppManager<C> {
    /// Create a manager over `catalog` and `store`.
    pub fn new(catalog: Arc<C>, store: InstallStore, config: &InstallConfig) -> Self {
        let installer = Installer::new(Arc::clone(&catalog), store.clone(), config);
        let launcher = Launcher::new(store.clone(), config.entry_point.clone());
        Self {
            catalog,
            store,
            installer,
            launcher,
        }
    }

    pub fn store(&self) -> &InstallStore {
        &self.store
    }

    /// Ordered application ids from the catalog manifest.
    pub async fn catalog_ids(&self) -> Result<Vec<ApplicationId>> {
        self.catalog.fetch_catalog_ids().await
    }

    /// Current catalog entry for `id`.
    pub async fn entry(&self, id: &ApplicationId) -> Result<CatalogEntry> {
        let latest_version = self.catalog.fetch_latest_version(id).await?;
        Ok(CatalogEntry {
            id: id.clone(),
            latest_version: latest_version.trim().to_string(),
            package_location: self.catalog.package_location(id),
        })
    }

    /// Reconciled state of `id`.
    pub async fn status(&self, id: &ApplicationId) -> Result<ReconciliationState> {
        let entry = self.entry(id).await?;
        let record = self.store.read_install_record(id)?;
        Ok(reconcile(&entry, record.as_ref()))
    }

    /// Reconcile every catalog application concurrently.
    ///
    /// Results follow manifest order. A failure for one application is
    /// recorded in its status and does not affect the others.
    pub async fn statuses(&self) -> Result<Vec<AppStatus>> {
        let ids = self.catalog_ids().await?;
        let checks = ids.into_iter().map(|id| async move {
            match self.status(&id).await {
                Ok(state) => AppStatus {
                    id,
                    state: Some(state),
                    error: None,
                },
                Err(e) => {
                    warn!("Could not determine state of {id}: {e}");
                    AppStatus {
                        id,
                        state: None,
                        error: Some(e.user_message()),
                    }
                }
            }
        });
        Ok(join_all(checks).await)
    }

    /// Install or update `id`.
    pub async fn install_or_update(&self, id: &ApplicationId) -> Result<InstallOutcome> {
        self.installer.install_or_update(id).await
    }

    /// Start the installed application `id`.
    pub fn launch(&self, id: &ApplicationId) -> Result<LaunchedProcess> {
        self.launcher.launch(id)
    }

    /// Uninstall `id`. Returns `false` if it was not installed.
    ///
    /// Holds the install permit for `id` while deleting, so an install and a
    /// removal of the same application never overlap.
    pub fn remove(&self, id: &ApplicationId) -> Result<bool> {
        let _permit = self.installer.guard().acquire(id)?;
        let removed = self.store.remove(id)?;
        if removed {
            info!("Removed {id}");
        }
        Ok(removed)
    }

    /// Whether an install of `id` is currently running.
    pub fn is_busy(&self, id: &ApplicationId) -> bool {
        self.installer.guard().is_busy(id)
    }

    /// Run `action` for `id` and describe the result.
    ///
    /// Never fails: errors are turned into the report message. The state is
    /// queried again afterwards.
    pub async fn perform(&self, id: &ApplicationId, action: Action) -> ActionReport {
        let outcome = if action.installs() {
            self.install_or_update(id)
                .await
                .map(|outcome| match outcome {
                    InstallOutcome::AlreadyUpToDate { .. } => format!("{id} is already up to date."),
                    InstallOutcome::Installed { .. } => format!("{id} has been installed/updated."),
                })
        } else {
            self.launch(id).map(|process| format!("Started {id} (pid {}).", process.pid))
        };

        let (success, message) = match outcome {
            Ok(message) => (true, message),
            Err(e) => (false, e.user_message()),
        };

        let state = match self.status(id).await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Could not refresh state of {id}: {e}");
                None
            }
        };

        ActionReport {
            id: id.clone(),
            action,
            success,
            message,
            state,
        }
    }
}
