//! Reconciliation of local install state against the remote catalog.
//!
//! The state of an application is never stored. It is recomputed from the
//! latest catalog entry and the local install record every time it is asked
//! for, so a "transition" is just another call after an install or launch.
//!
//! | State             | Action            | Label      |
//! |-------------------|-------------------|------------|
//! | `NotInstalled`    | install or update | `Download` |
//! | `UpdateAvailable` | install or update | `Update`   |
//! | `UpToDate`        | launch            | `Launch`   |

use serde::Serialize;
use std::fmt;

use super::app_id::ApplicationId;
use super::store::InstallRecord;

/// What the catalog currently publishes for an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: ApplicationId,
    pub latest_version: String,
    pub package_location: String,
}

/// Derived install state of one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconciliationState {
    NotInstalled,
    UpToDate {
        version: String,
    },
    UpdateAvailable {
        installed_version: String,
        latest_version: String,
    },
}

/// The single action allowed out of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Download,
    Update,
    Launch,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download => write!(f, "Download"),
            Self::Update => write!(f, "Update"),
            Self::Launch => write!(f, "Launch"),
        }
    }
}

impl Action {
    /// Whether this action runs the installer.
    pub fn installs(self) -> bool {
        matches!(self, Self::Download | Self::Update)
    }
}

impl ReconciliationState {
    /// The action the presentation layer should offer.
    pub fn action(&self) -> Action {
        match self {
            Self::NotInstalled => Action::Download,
            Self::UpdateAvailable { .. } => Action::Update,
            Self::UpToDate { .. } => Action::Launch,
        }
    }

    /// Installed version, if any.
    pub fn installed_version(&self) -> Option<&str> {
        match self {
            Self::NotInstalled => None,
            Self::UpToDate { version } => Some(version),
            Self::UpdateAvailable {
                installed_version, ..
            } => Some(installed_version),
        }
    }
}

impl fmt::Display for ReconciliationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "not installed"),
            Self::UpToDate { version } => write!(f, "up to date ({version})"),
            Self::UpdateAvailable {
                installed_version,
                latest_version,
            } => write!(f, "update available ({installed_version} -> {latest_version})"),
        }
    }
}

/// Whether two version strings match after trimming surrounding whitespace.
pub fn versions_match(installed: &str, latest: &str) -> bool {
    installed.trim() == latest.trim()
}

/// Compute the state of an application (pure function).
///
/// No record means `NotInstalled` whatever the catalog says. Otherwise the
/// versions are compared by exact string equality after trimming.
pub fn reconcile(entry: &CatalogEntry, record: Option<&InstallRecord>) -> ReconciliationState {
    let Some(record) = record else {
        return ReconciliationState::NotInstalled;
    };

    let installed = record.installed_version.trim();
    let latest = entry.latest_version.trim();
    if versions_match(installed, latest) {
        ReconciliationState::UpToDate {
            version: installed.to_string(),
        }
    } else {
        ReconciliationState::UpdateAvailable {
            installed_version: installed.to_string(),
            latest_version: latest.to_string(),
        }
    }
}
