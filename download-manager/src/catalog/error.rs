//! Error types for catalog, install, and launch operations.

use std::fmt;
use std::path::{Path, PathBuf};

use super::app_id::InvalidApplicationId;

/// Broad failure classes reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport or HTTP failure.
    Network,
    /// The catalog manifest could not be decoded.
    CatalogFormat,
    /// Permission or I/O failure on the install tree, including archive expansion.
    Filesystem,
    /// The installed application has no entry point to start.
    MissingExecutable,
    /// The caller supplied something unusable (bad identifier).
    Input,
    /// Another install for the same application is still running.
    Busy,
    /// Results could not be rendered for output.
    Output,
}

/// Errors that can occur while managing applications.
#[derive(Debug)]
pub enum ManagerError {
    /// Transport failure (DNS, connect, timeout, body read).
    Network { url: String, message: String },

    /// The server answered with a non-2xx status.
    HttpStatus { url: String, status: u16 },

    /// The catalog manifest is not text.
    CatalogFormat { url: String, reason: String },

    /// Could not determine the per-user data directory
    DataDirectory { message: String },

    /// I/O failure on a specific path.
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Archive expansion failed.
    Extraction {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// The installed application has no entry point.
    MissingExecutable { id: String, path: PathBuf },

    /// The entry point exists but could not be started.
    Launch {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Application identifier failed validation.
    InvalidApplicationId(InvalidApplicationId),

    /// An install for this application is already running.
    InstallInProgress { id: String },

    /// Results could not be serialized as JSON.
    Json { source: serde_json::Error },

    /// A failure after the previous installation was already removed.
    InstallInterrupted {
        id: String,
        source: Box<ManagerError>,
    },
}

impl ManagerError {
    /// Attach a path to an I/O error.
    pub fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap a failure that left the previous install of `id` destroyed.
    pub fn interrupted(id: impl fmt::Display, source: ManagerError) -> Self {
        Self::InstallInterrupted {
            id: id.to_string(),
            source: Box::new(source),
        }
    }

    /// Map a `reqwest` failure for `url`.
    pub fn network(url: &str, source: &reqwest::Error) -> Self {
        if let Some(status) = source.status() {
            return Self::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }
        Self::Network {
            url: url.to_string(),
            message: source.to_string(),
        }
    }

    /// The failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } | Self::HttpStatus { .. } => ErrorCategory::Network,
            Self::CatalogFormat { .. } => ErrorCategory::CatalogFormat,
            Self::DataDirectory { .. }
            | Self::Filesystem { .. }
            | Self::Extraction { .. }
            | Self::Launch { .. } => ErrorCategory::Filesystem,
            Self::MissingExecutable { .. } => ErrorCategory::MissingExecutable,
            Self::InvalidApplicationId(_) => ErrorCategory::Input,
            Self::InstallInProgress { .. } => ErrorCategory::Busy,
            Self::Json { .. } => ErrorCategory::Output,
            Self::InstallInterrupted { source, .. } => source.category(),
        }
    }

    /// Whether the previous installation was lost because of this failure.
    pub fn removed_previous_install(&self) -> bool {
        matches!(self, Self::InstallInterrupted { .. })
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } | Self::HttpStatus { .. } => {
                format!("Could not reach the download server. {self}")
            }
            Self::MissingExecutable { id, .. } => format!("Executable for {id} not found."),
            Self::InstallInProgress { id } => {
                format!("{id} is already being installed. Please wait for it to finish.")
            }
            Self::InstallInterrupted { id, source } => format!(
                "Error installing {id}: {}. The previous installation was removed; reinstall required.",
                source
            ),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { url, message } => write!(f, "Failed to fetch {url}: {message}"),
            Self::HttpStatus { url, status } => write!(f, "HTTP {status} when fetching {url}"),
            Self::CatalogFormat { url, reason } => {
                write!(f, "Catalog at {url} is not readable: {reason}")
            }
            Self::DataDirectory { message } => write!(f, "Data directory error: {message}"),
            Self::Filesystem { path, source } => {
                write!(f, "I/O error at {}: {source}", path.display())
            }
            Self::Extraction { path, source } => {
                write!(f, "Failed to extract archive at {}: {source}", path.display())
            }
            Self::MissingExecutable { id, path } => {
                write!(f, "Executable for '{id}' not found at {}", path.display())
            }
            Self::Launch { path, source } => {
                write!(f, "Failed to start {}: {source}", path.display())
            }
            Self::InvalidApplicationId(err) => write!(f, "{err}"),
            Self::InstallInProgress { id } => {
                write!(f, "An install of '{id}' is already in progress")
            }
            Self::Json { source } => write!(f, "JSON error: {source}"),
            Self::InstallInterrupted { id, source } => {
                write!(f, "Install of '{id}' failed after removing the previous version: {source}")
            }
        }
    }
}

impl std::error::Error for ManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Filesystem { source, .. } => Some(source),
            Self::Extraction { source, .. } => Some(source),
            Self::Launch { source, .. } => Some(source),
            Self::InvalidApplicationId(err) => Some(err),
            Self::Json { source } => Some(source),
            Self::InstallInterrupted { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<InvalidApplicationId> for ManagerError {
    fn from(err: InvalidApplicationId) -> Self {
        Self::InvalidApplicationId(err)
    }
}

impl From<serde_json::Error> for ManagerError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source }
    }
}

/// Result type for manager operations.
pub type Result<T> = std::result::Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ManagerError::HttpStatus {
            url: "https://example.com/apps.txt".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "HTTP 404 when fetching https://example.com/apps.txt"
        );

        let err = ManagerError::InstallInProgress {
            id: "writer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "An install of 'writer' is already in progress"
        );
    }

    #[test]
    fn test_error_categories() {
        let err = ManagerError::Network {
            url: "u".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);

        let err = ManagerError::fs(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.category(), ErrorCategory::Filesystem);

        let err = ManagerError::MissingExecutable {
            id: "writer".to_string(),
            path: PathBuf::from("/apps/writer/app.exe"),
        };
        assert_eq!(err.category(), ErrorCategory::MissingExecutable);
    }

    #[test]
    fn test_interrupted_install_keeps_inner_category() {
        let err = ManagerError::InstallInterrupted {
            id: "writer".to_string(),
            source: Box::new(ManagerError::Network {
                url: "u".to_string(),
                message: "reset".to_string(),
            }),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.removed_previous_install());
        assert!(err.user_message().contains("reinstall required"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_missing_executable_message() {
        let err = ManagerError::MissingExecutable {
            id: "calc".to_string(),
            path: PathBuf::from("/apps/calc/app.exe"),
        };
        assert_eq!(err.user_message(), "Executable for calc not found.");
    }

    #[test]
    fn test_json_error_is_output_category() {
        let Err(source) = serde_json::from_str::<serde_json::Value>("{") else {
            panic!("truncated JSON should not parse");
        };
        let err = ManagerError::from(source);
        assert_eq!(err.category(), ErrorCategory::Output);
        assert!(err.to_string().starts_with("JSON error:"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
