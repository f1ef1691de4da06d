//! Download Manager - install, update and launch applications from a remote catalog
//!
//! The catalog publishes a manifest of application ids, a version file per
//! application and a zip package per platform. The manager compares the
//! published version with the locally installed one and offers exactly one
//! action per application: download, update or launch.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   Download Manager                    │
//! │  ┌────────────┐  ┌──────────────┐  ┌──────────────┐  │
//! │  │   Remote   │  │  Reconciler  │  │ Install store│  │
//! │  │  catalog   │  │ (pure state) │  │ (local data) │  │
//! │  └────────────┘  └──────────────┘  └──────────────┘  │
//! └──────────────────────────────────────────────────────┘
//!         │                 │                 │
//!         ▼                 ▼                 ▼
//!    ┌───────────┐   ┌─────────────┐   ┌────────────┐
//!    │ Installer │   │ AppManager  │   │  Launcher  │
//!    └───────────┘   └─────────────┘   └────────────┘
//! ```

pub mod catalog;
pub mod config;

pub use catalog::{
    Action, AppManager, AppStatus, ApplicationId, CatalogSource, ManagerError,
    ReconciliationState, RemoteCatalog,
};
pub use config::{ConfigError, InstallStrategy, ManagerConfig};
