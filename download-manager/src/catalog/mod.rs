//! Catalog of remotely published applications and their local installs.
//!
//! The catalog lets users:
//! - See every published application and whether it is installed and current
//! - Download an application or update it to the published version
//! - Launch an installed application
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  CLI / presentation                  │
//! │      list / status     install        launch         │
//! └─────────────────────────────────────────────────────┘
//!         │                 │                 │
//!         ▼                 ▼                 ▼
//!    ┌──────────────────────────────────────────┐
//!    │   AppManager (reconcile + single flight)  │
//!    └──────────────────────────────────────────┘
//!         │                 │                 │
//!         ▼                 ▼                 ▼
//!    ┌───────────┐   ┌─────────────┐   ┌────────────┐
//!    │  Remote   │   │  Installer  │   │  Launcher  │
//!    │  catalog  │   │  zip → dir  │   │            │
//!    └───────────┘   └─────────────┘   └────────────┘
//!                           │                 │
//!                           ▼                 ▼
//!    ┌──────────────────────────────────────────┐
//!    │  Install store: <data>/<namespace>/<id>/ │
//!    │        expanded package + version.txt    │
//!    └──────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```bash
//! # Show every application and the action available for it
//! download-manager list
//!
//! # Download or update an application
//! download-manager install TrueWord
//!
//! # Start an installed application
//! download-manager launch TrueWord
//! ```

pub mod app_id;
pub mod cli;
pub mod error;
pub mod installer;
pub mod launcher;
pub mod manager;
pub mod platform;
pub mod reconcile;
pub mod remote;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use app_id::{ApplicationId, InvalidApplicationId};
pub use cli::{CatalogCommand, execute};
pub use error::{ErrorCategory, ManagerError, Result};
pub use installer::{InstallGuard, InstallOutcome, InstallPermit, Installer};
pub use launcher::{LaunchedProcess, Launcher};
pub use manager::{ActionReport, AppManager, AppStatus};
pub use platform::PackagePlatform;
pub use reconcile::{Action, CatalogEntry, ReconciliationState, reconcile, versions_match};
pub use remote::{CatalogSource, RemoteCatalog, parse_manifest};
pub use store::{InstallRecord, InstallStore};
