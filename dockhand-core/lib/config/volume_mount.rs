//! Volume mounts into a container.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::DockhandError;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A bind mount from a host path or named volume into a container.
///
/// The wire form is `"SOURCE:TARGET"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VolumeMount {
    /// Host path or volume name.
    source: String,

    /// Absolute path inside the container.
    target: String,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl VolumeMount {
    /// Creates a mount of `source` at `target`.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Host path or volume name.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Path inside the container.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl FromStr for VolumeMount {
    type Err = DockhandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [source, target] if !source.is_empty() && !target.is_empty() => {
                Ok(Self::new(*source, *target))
            }
            _ => Err(DockhandError::validation(
                "volume mount",
                format!("`{}` is not `SOURCE:TARGET`", s),
            )),
        }
    }
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.target)
    }
}

impl TryFrom<String> for VolumeMount {
    type Error = DockhandError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<VolumeMount> for String {
    fn from(mount: VolumeMount) -> Self {
        mount.to_string()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
