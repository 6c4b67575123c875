//! Next-version derivation.
//!
//! A library's next version is either its explicit override, or derived
//! from its current version:
//!
//! - `1.2.3` bumps the minor component: `1.3.0`
//! - `1.0.0-beta.3` bumps the trailing prerelease number: `1.0.0-beta.4`
//!
//! The major component is never bumped automatically, including for
//! breaking changes.

pub mod prerelease;

use semver::Version;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::state::LibraryState;

/// Errors from version derivation.
#[derive(Error, Debug)]
pub enum VersionError {
    /// The library has no current version and no override.
    #[error("library {library_id} has no current version and no next version override")]
    MissingVersion {
        /// Library whose version could not be derived.
        library_id: String,
    },

    /// The version string is not `major.minor.patch[-prerelease]`.
    #[error("invalid version {version:?}: {reason}")]
    Malformed {
        /// The offending version string.
        version: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The prerelease suffix has no trailing number to increment.
    #[error("cannot derive next prerelease version from {version:?}: no trailing digits")]
    NoPrereleaseNumber {
        /// The offending version string.
        version: String,
    },

    /// The incremented component does not fit in a `u64`.
    #[error("cannot derive next version from {version:?}: {component} number overflows")]
    Overflow {
        /// The offending version string.
        version: String,
        /// The component that overflowed.
        component: &'static str,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// A parsed `major.minor.patch[-prerelease]` version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryVersion {
    /// The numeric `major.minor.patch` part.
    pub core: Version,
    /// Everything after the first `-`, if present.
    pub prerelease: Option<String>,
}

impl LibraryVersion {
    /// Parse a version string.
    ///
    /// The prerelease suffix is kept verbatim; build metadata is rejected.
    pub fn parse(s: &str) -> VersionResult<Self> {
        let malformed = |reason: &str| VersionError::Malformed {
            version: s.to_string(),
            reason: reason.to_string(),
        };

        if s.contains('+') {
            return Err(malformed("build metadata is not supported"));
        }

        let (core, prerelease) = match s.split_once('-') {
            Some((_, "")) => return Err(malformed("empty prerelease suffix")),
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (s, None),
        };

        let core = Version::parse(core).map_err(|e| malformed(&e.to_string()))?;
        Ok(Self { core, prerelease })
    }
}

impl std::fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prerelease {
            Some(pre) => write!(f, "{}-{pre}", self.core),
            None => write!(f, "{}", self.core),
        }
    }
}

/// Derive the version the next release of `library` should carry.
///
/// An explicit override is returned verbatim, without validation.
#[instrument(skip(library), fields(library_id = %library.id))]
pub fn next_version(library: &LibraryState) -> VersionResult<String> {
    if let Some(next) = library.next_version.as_deref().filter(|v| !v.is_empty()) {
        debug!(%next, "using next version override");
        return Ok(next.to_string());
    }

    if library.current_version.is_empty() {
        return Err(VersionError::MissingVersion {
            library_id: library.id.clone(),
        });
    }

    let next = derive_next(&library.current_version)?;
    debug!(current = %library.current_version, %next, "derived next version");
    Ok(next)
}

/// Derive the next version from a current version string.
pub fn derive_next(current: &str) -> VersionResult<String> {
    let parsed = LibraryVersion::parse(current)?;

    let next = match parsed.prerelease {
        Some(pre) => {
            let pre = prerelease::increment(&pre).map_err(|e| match e {
                prerelease::CounterError::NoDigits => VersionError::NoPrereleaseNumber {
                    version: current.to_string(),
                },
                prerelease::CounterError::Overflow => VersionError::Overflow {
                    version: current.to_string(),
                    component: "prerelease",
                },
            })?;
            LibraryVersion {
                core: parsed.core,
                prerelease: Some(pre),
            }
        }
        None => {
            let minor = parsed
                .core
                .minor
                .checked_add(1)
                .ok_or_else(|| VersionError::Overflow {
                    version: current.to_string(),
                    component: "minor",
                })?;
            LibraryVersion {
                core: Version::new(parsed.core.major, minor, 0),
                prerelease: None,
            }
        }
    };

    Ok(next.to_string())
}
