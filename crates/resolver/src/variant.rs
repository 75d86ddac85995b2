//! Build variants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use varsign_core::error::Error;

/// Named build configuration with its own signing and shrink policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Variant {
    /// Local development builds
    Debug,
    /// Distributable builds
    Release,
}

impl Variant {
    /// All known variants, in declaration order
    pub const ALL: [Variant; 2] = [Variant::Debug, Variant::Release];

    /// Lowercase name as used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Debug => "debug",
            Variant::Release => "release",
        }
    }

    /// Whether artifacts of this variant are meant for distribution
    pub fn is_distributable(&self) -> bool {
        matches!(self, Variant::Release)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Variant::Debug),
            "release" => Ok(Variant::Release),
            _ => Err(Error::unknown_variant(s)),
        }
    }
}
