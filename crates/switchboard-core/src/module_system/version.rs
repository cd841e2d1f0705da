use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error type for version parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("Invalid version format")]
    InvalidFormat,
    #[error("Version parse error: {0}")]
    ParseError(String),
}

/// Parse a version as reported by the host.
///
/// Hosts often report versions like "6.4" or "5"; missing minor and patch
/// components are padded with zeros before parsing.
pub fn parse_host_version(version: &str) -> Result<Version, VersionError> {
    let trimmed = version.trim().trim_start_matches('v');
    if trimmed.is_empty() {
        return Err(VersionError::InvalidFormat);
    }
    if let Ok(parsed) = Version::parse(trimmed) {
        return Ok(parsed);
    }

    let (core, rest) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };
    let parts = core.split('.').count();
    if parts >= 3 {
        return Err(VersionError::ParseError(format!("Invalid version '{}'", version)));
    }
    let padded = format!("{}{}{}", core, ".0".repeat(3 - parts), rest);
    Version::parse(&padded)
        .map_err(|e| VersionError::ParseError(format!("Invalid version '{}': {}", version, e)))
}

/// Represents a version requirement range using semver constraints.
#[derive(Debug, Clone)]
pub struct VersionRange {
    /// The original constraint string (e.g., "^1.2.3", ">=2.0")
    constraint: String,
    /// The parsed semver requirement
    req: VersionReq,
}

impl VersionRange {
    /// Creates a new version range from a constraint string.
    pub fn from_constraint(constraint: &str) -> Result<Self, VersionError> {
        let req = VersionReq::parse(constraint).map_err(|e| {
            VersionError::ParseError(format!("Invalid version constraint '{}': {}", constraint, e))
        })?;
        Ok(Self {
            constraint: constraint.to_string(),
            req,
        })
    }

    /// Checks if a specific version satisfies this range.
    pub fn includes(&self, version: &Version) -> bool {
        self.req.matches(version)
    }

    /// Checks a host-reported version string; unparsable versions never match.
    pub fn includes_str(&self, version: &str) -> bool {
        match parse_host_version(version) {
            Ok(parsed) => self.includes(&parsed),
            Err(e) => {
                log::debug!("Ignoring unparsable host version '{}': {}", version, e);
                false
            }
        }
    }

    /// Returns a reference to the underlying `semver::VersionReq`.
    pub fn semver_req(&self) -> &VersionReq {
        &self.req
    }

    /// Returns the original constraint string.
    pub fn constraint_string(&self) -> &str {
        &self.constraint
    }
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.req == other.req
    }
}

/// Implement Display to show the original constraint string.
impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constraint)
    }
}

/// Allow parsing directly from a string slice.
impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::from_constraint(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.constraint)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let constraint = String::deserialize(deserializer)?;
        VersionRange::from_constraint(&constraint).map_err(serde::de::Error::custom)
    }
}
