//! Port mappings between the host and a container.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::DockhandError;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A container port, optionally bound to a fixed host port.
///
/// The wire form is either `"8080:80"` (publish container port 80 on host
/// port 8080) or `"80"` (expose only; published solely when an operation
/// asks for publish-all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortMapping {
    /// The fixed host port, when the mapping publishes one.
    host: Option<u16>,

    /// The container port.
    container: u16,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl PortMapping {
    /// Creates a mapping of `container`, bound to `host` when given.
    pub fn new(host: Option<u16>, container: u16) -> Self {
        Self { host, container }
    }

    /// The fixed host port, when the mapping publishes one.
    pub fn host(&self) -> Option<u16> {
        self.host
    }

    /// The container port.
    pub fn container(&self) -> u16 {
        self.container
    }
}

impl FromStr for PortMapping {
    type Err = DockhandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_port = |part: &str| {
            part.parse::<u16>().map_err(|e| {
                DockhandError::validation("port mapping", format!("`{}`: {}", s, e))
            })
        };

        match s.split(':').collect::<Vec<_>>().as_slice() {
            [container] => Ok(Self::new(None, parse_port(container)?)),
            [host, container] => Ok(Self::new(Some(parse_port(host)?), parse_port(container)?)),
            _ => Err(DockhandError::validation(
                "port mapping",
                format!("`{}` is not `PORT` or `HOST:PORT`", s),
            )),
        }
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host {
            Some(host) => write!(f, "{}:{}", host, self.container),
            None => write!(f, "{}", self.container),
        }
    }
}

impl TryFrom<String> for PortMapping {
    type Error = DockhandError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PortMapping> for String {
    fn from(mapping: PortMapping) -> Self {
        mapping.to_string()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exposed_port() {
        let mapping: PortMapping = "4001".parse().unwrap();
        assert_eq!(mapping.host(), None);
        assert_eq!(mapping.container(), 4001);
        assert_eq!(mapping.to_string(), "4001");
    }

    #[test]
    fn test_parse_published_port() {
        let mapping: PortMapping = "8080:80".parse().unwrap();
        assert_eq!(mapping.host(), Some(8080));
        assert_eq!(mapping.container(), 80);
        assert_eq!(mapping.to_string(), "8080:80");
    }

    #[test]
    fn test_parse_rejects_bad_forms() {
        for spec in ["", "eighty", "80:80:80", "99999", "80:"] {
            assert!(spec.parse::<PortMapping>().is_err(), "accepted {:?}", spec);
        }
    }
}
