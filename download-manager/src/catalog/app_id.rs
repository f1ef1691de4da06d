//! Application identifier newtype.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated application identifier.
///
/// Identifiers come from the remote catalog manifest and are used both as a
/// directory name under the install root and as a URL path segment, so they
/// are restricted to a conservative character set.
///
/// # Validation Rules
///
/// - Cannot be empty
/// - Cannot exceed 128 bytes
/// - Cannot be `.` or `..`, or start with `.`
/// - Contain only ASCII letters, digits, `-`, `_`, `.`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApplicationId(String);

/// Error returned when creating an invalid application identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidApplicationId {
    /// Identifier cannot be empty.
    Empty,
    /// Identifier contains characters outside the allowed set.
    InvalidCharacters { value: String },
    /// Identifier has invalid structure.
    InvalidStructure { value: String, reason: &'static str },
}

impl fmt::Display for InvalidApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "application id cannot be empty"),
            Self::InvalidCharacters { value } => {
                write!(f, "application id '{value}' contains invalid characters")
            }
            Self::InvalidStructure { value, reason } => {
                write!(f, "application id '{value}' is invalid: {reason}")
            }
        }
    }
}

impl std::error::Error for InvalidApplicationId {}

impl ApplicationId {
    /// Maximum length for an application id.
    pub const MAX_LENGTH: usize = 128;

    /// Creates a new application id after validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is not safe as a path or URL segment.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidApplicationId> {
        let value = value.into();

        if value.is_empty() {
            return Err(InvalidApplicationId::Empty);
        }

        if value.len() > Self::MAX_LENGTH {
            return Err(InvalidApplicationId::InvalidStructure {
                value,
                reason: "cannot exceed 128 characters",
            });
        }

        if value.starts_with('.') {
            return Err(InvalidApplicationId::InvalidStructure {
                value,
                reason: "cannot start with '.'",
            });
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(InvalidApplicationId::InvalidCharacters { value });
        }

        Ok(Self(value))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApplicationId {
    type Err = InvalidApplicationId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ApplicationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ApplicationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ApplicationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        for value in ["TrueWord", "true-calc", "sheet_2", "viewer.v2", "A"] {
            let id = ApplicationId::new(value);
            assert!(id.is_ok(), "{value} should be accepted");
        }
    }

    #[test]
    fn test_empty_id() {
        assert_eq!(ApplicationId::new(""), Err(InvalidApplicationId::Empty));
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(matches!(
            ApplicationId::new(".."),
            Err(InvalidApplicationId::InvalidStructure { .. })
        ));
        assert!(matches!(
            ApplicationId::new(".hidden"),
            Err(InvalidApplicationId::InvalidStructure { .. })
        ));
        assert!(matches!(
            ApplicationId::new("../etc"),
            Err(InvalidApplicationId::InvalidStructure { .. })
        ));
        assert!(matches!(
            ApplicationId::new("a/b"),
            Err(InvalidApplicationId::InvalidCharacters { .. })
        ));
        assert!(matches!(
            ApplicationId::new("a\\b"),
            Err(InvalidApplicationId::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn test_url_unsafe_rejected() {
        for value in ["my app", "app?x=1", "app#frag", "app%2F"] {
            assert!(
                matches!(
                    ApplicationId::new(value),
                    Err(InvalidApplicationId::InvalidCharacters { .. })
                ),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_too_long() {
        let value = "a".repeat(ApplicationId::MAX_LENGTH + 1);
        assert!(matches!(
            ApplicationId::new(value),
            Err(InvalidApplicationId::InvalidStructure { .. })
        ));
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let id: ApplicationId = match serde_json::from_str("\"writer\"") {
            Ok(id) => id,
            Err(e) => panic!("should deserialize: {e}"),
        };
        assert_eq!(id.as_str(), "writer");
        assert!(serde_json::from_str::<ApplicationId>("\"../x\"").is_err());
    }
}
