//! Small enums shared by remotes, refspecs and transports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RemoraError;

/// Direction of a refspec or a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Fetch,
    Push,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => f.write_str("fetch"),
            Self::Push => f.write_str("push"),
        }
    }
}

/// Controls which annotated tags a fetch brings in beyond its refspecs.
///
/// # Example
///
/// ```
/// use remora_core::AutotagPolicy;
///
/// let policy: AutotagPolicy = "all".parse().unwrap();
/// assert_eq!(policy, AutotagPolicy::All);
/// assert_eq!(AutotagPolicy::default(), AutotagPolicy::Auto);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutotagPolicy {
    /// Never fetch tags implicitly.
    None,
    /// Fetch tags pointing at objects the fetch already brings in.
    #[default]
    Auto,
    /// Fetch every advertised tag.
    All,
}

impl AutotagPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Auto => "auto",
            Self::All => "all",
        }
    }
}

impl fmt::Display for AutotagPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutotagPolicy {
    type Err = RemoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "--no-tags" => Ok(Self::None),
            "auto" => Ok(Self::Auto),
            "all" | "--tags" => Ok(Self::All),
            _ => Err(RemoraError::validation(
                "autotag",
                s,
                "expected one of: none, auto, all",
            )),
        }
    }
}
