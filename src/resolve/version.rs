//! Requested versions and package references

use crate::error::{PackyardError, PackyardResult};
use std::fmt;
use std::str::FromStr;

/// Version alias that resolves to a concrete version per request
pub const LATEST: &str = "latest";

/// A version as requested by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedVersion {
    Latest,
    Concrete(String),
}

impl FromStr for RequestedVersion {
    type Err = PackyardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(PackyardError::InvalidName {
                kind: "version",
                value: String::new(),
                reason: "must not be empty".to_string(),
            }),
            LATEST => Ok(Self::Latest),
            other => Ok(Self::Concrete(other.to_string())),
        }
    }
}

impl fmt::Display for RequestedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Concrete(v) => f.write_str(v),
        }
    }
}

/// `name` or `name@version`, as typed on the command line or in a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub name: String,
    pub version: RequestedVersion,
}

impl PackageRef {
    /// Split at the first `@`; no `@` means `latest`
    pub fn parse(s: &str) -> PackyardResult<Self> {
        let (name, version) = match s.split_once('@') {
            Some((name, version)) => (name, version.parse()?),
            None => (s, RequestedVersion::Latest),
        };

        if name.is_empty() {
            return Err(PackyardError::InvalidName {
                kind: "package",
                value: s.to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
