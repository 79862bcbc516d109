//! Bundle versions and the records persisted in the cumulative list.
//!
//! Daily builds carry dotted-numeric versions with a varying number of
//! components (`8.1.2`, `10.4.201.1`), so `semver` does not apply. Versions
//! compare component-wise as integers, never as strings:
//!
//! ```
//! use mihome_tracker::BundleVersion;
//!
//! let newer: BundleVersion = "1.10.0".parse().unwrap();
//! let older: BundleVersion = "1.9.0".parse().unwrap();
//! assert!(newer > older);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced when parsing versions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The version string was empty.
    #[error("empty version string")]
    Empty,

    /// A component was not a non-negative integer.
    #[error("invalid version component {component:?} in {version:?}")]
    InvalidComponent { version: String, component: String },
}

/// A dotted-numeric bundle version.
///
/// Keeps the original text so rendering a parsed version is lossless
/// (`"08.1"` stays `"08.1"` on disk).
#[derive(Debug, Clone)]
pub struct BundleVersion {
    raw: String,
    components: Vec<u64>,
}

impl FromStr for BundleVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| VersionError::InvalidComponent {
                        version: trimmed.to_string(),
                        component: part.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: trimmed.to_string(),
            components,
        })
    }
}

impl fmt::Display for BundleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for BundleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Vec ordering is lexicographic over integers: component-wise, and a
        // strict prefix ranks lower.
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for BundleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BundleVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for BundleVersion {}

/// One discovered application version and its validated package URL.
///
/// The package URL is the identity of a record: two builds may report the
/// same version string but never share a package URL in the cumulative list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub version: BundleVersion,
    pub package_url: String,
}

impl VersionRecord {
    /// Create a new record.
    pub fn new(version: BundleVersion, package_url: impl Into<String>) -> Self {
        Self {
            version,
            package_url: package_url.into(),
        }
    }

    /// Render as a `"<version> <packageUrl>"` line without terminator.
    pub fn to_line(&self) -> String {
        format!("{} {}", self.version, self.package_url)
    }

    /// Ordering used for every persisted list: newest version first, ties
    /// broken by package URL so the output does not depend on probe order.
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.version
            .cmp(&a.version)
            .then_with(|| a.package_url.cmp(&b.package_url))
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.version, self.package_url)
    }
}
