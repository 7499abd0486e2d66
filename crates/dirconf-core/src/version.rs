//! Product version handling
//!
//! Resource types appear in different releases of the directory server.
//! The connection configuration names the release being managed, and the
//! reconciler refuses types the release does not have.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Directory server release, `major.minor.patch.build`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductVersion {
    /// Major release
    pub major: u32,
    /// Minor release
    pub minor: u32,
    /// Patch release
    pub patch: u32,
    /// Build number
    pub build: u32,
}

impl ProductVersion {
    /// Oldest release any resource in this workspace supports
    pub const BASELINE: ProductVersion = ProductVersion::new(9, 1, 0, 0);

    /// Create a version from its components
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }
}

impl Default for ProductVersion {
    fn default() -> Self {
        Self::BASELINE
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

impl FromStr for ProductVersion {
    type Err = Error;

    /// Parse `9.3`, `9.3.0` or `9.3.0.0`; missing components are zero
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(Error::config(format!(
                "Invalid product version '{}': expected major.minor[.patch[.build]]",
                s
            )));
        }

        let mut numbers = [0u32; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| {
                Error::config(format!(
                    "Invalid product version '{}': '{}' is not a number",
                    s, part
                ))
            })?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2], numbers[3]))
    }
}

impl TryFrom<String> for ProductVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProductVersion> for String {
    fn from(version: ProductVersion) -> Self {
        version.to_string()
    }
}
