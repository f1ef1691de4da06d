//! Package platform detection for archive downloads.

use std::fmt;

/// Platform tag used in published package file names.
///
/// Packages are published per operating system as `latest_<tag>.zip`,
/// for example `latest_win.zip`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackagePlatform(String);

impl PackagePlatform {
    /// Detect the current platform from compile-time cfg attributes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use download_manager::catalog::platform::PackagePlatform;
    /// let platform = PackagePlatform::detect();
    /// assert!(!platform.as_str().is_empty());
    /// ```
    pub fn detect() -> Self {
        Self(Self::detect_os().to_string())
    }

    /// Get the platform tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the package archive for this platform.
    pub fn package_file_name(&self) -> String {
        format!("latest_{}.zip", self.0)
    }

    fn detect_os() -> &'static str {
        #[cfg(target_os = "windows")]
        return "win";
        #[cfg(target_os = "macos")]
        return "mac";
        #[cfg(target_os = "linux")]
        return "linux";
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        return "unknown";
    }
}

impl fmt::Display for PackagePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PackagePlatform {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
