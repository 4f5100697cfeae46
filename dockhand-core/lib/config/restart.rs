//! Restart policies for service processes.
//!
//! The wire form of a restart policy is a string in a definition: empty
//! (never restart), `"always"`, or `"max:N"`. The string form only exists at
//! the configuration boundary; everything past deserialization works with
//! the parsed variant, and a malformed specification fails at load time, not
//! at execution time.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::DockhandError;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Wire form of [`RestartPolicy::Always`].
const ALWAYS_SPEC: &str = "always";

/// Wire prefix of [`RestartPolicy::Max`].
const MAX_SPEC_PREFIX: &str = "max:";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// How often a failed container process should be relaunched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RestartPolicy {
    /// Never relaunch. The default for an absent specification.
    #[default]
    Never,

    /// Relaunch on every failure; the caller bounds real-world retries with
    /// its own loop or backoff.
    Always,

    /// Relaunch while fewer than this many attempts have been made.
    Max(u32),
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl RestartPolicy {
    /// Returns whether another attempt should be made after `attempts`
    /// attempts have already been made.
    pub fn should_retry(&self, attempts: u32) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::Always => true,
            RestartPolicy::Max(limit) => attempts < *limit,
        }
    }
}

impl FromStr for RestartPolicy {
    type Err = DockhandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(RestartPolicy::Never);
        }

        if s == ALWAYS_SPEC {
            return Ok(RestartPolicy::Always);
        }

        if let Some(limit) = s.strip_prefix(MAX_SPEC_PREFIX) {
            let limit = limit.parse::<u32>().map_err(|e| {
                DockhandError::validation(
                    "restart policy",
                    format!("`{}` has a bad attempt count: {}", s, e),
                )
            })?;
            return Ok(RestartPolicy::Max(limit));
        }

        Err(DockhandError::validation(
            "restart policy",
            format!("`{}` is not one of ``, `always`, `max:N`", s),
        ))
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPolicy::Never => Ok(()),
            RestartPolicy::Always => write!(f, "{}", ALWAYS_SPEC),
            RestartPolicy::Max(limit) => write!(f, "{}{}", MAX_SPEC_PREFIX, limit),
        }
    }
}

impl TryFrom<String> for RestartPolicy {
    type Error = DockhandError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RestartPolicy> for String {
    fn from(policy: RestartPolicy) -> Self {
        policy.to_string()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_specs() {
        assert_eq!("".parse::<RestartPolicy>().unwrap(), RestartPolicy::Never);
        assert_eq!(
            "always".parse::<RestartPolicy>().unwrap(),
            RestartPolicy::Always
        );
        assert_eq!(
            "max:99".parse::<RestartPolicy>().unwrap(),
            RestartPolicy::Max(99)
        );
        assert_eq!(
            "max:0".parse::<RestartPolicy>().unwrap(),
            RestartPolicy::Max(0)
        );
    }

    #[test]
    fn test_parse_rejects_unknown_specs() {
        for spec in ["sometimes", "max", "max:", "max:many", "max:-1", "Always"] {
            assert!(spec.parse::<RestartPolicy>().is_err(), "accepted {:?}", spec);
        }
    }

    #[test]
    fn test_should_retry_never() {
        let policy = RestartPolicy::Never;
        assert!(!policy.should_retry(0));
        assert!(!policy.should_retry(100));
    }

    #[test]
    fn test_should_retry_always() {
        let policy = RestartPolicy::Always;
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(u32::MAX));
    }

    #[test]
    fn test_should_retry_max_bounds() {
        let policy: RestartPolicy = "max:99".parse().unwrap();
        for attempts in 0..99 {
            assert!(policy.should_retry(attempts));
        }
        assert!(!policy.should_retry(99));
        assert!(!policy.should_retry(100));
    }

    #[test]
    fn test_wire_form_roundtrip() {
        for spec in ["", "always", "max:5"] {
            let policy: RestartPolicy = spec.parse().unwrap();
            assert_eq!(policy.to_string(), spec);
        }
    }

    #[test]
    fn test_serde_uses_wire_form() {
        let policy: RestartPolicy = serde_json::from_str(r#""max:3""#).unwrap();
        assert_eq!(policy, RestartPolicy::Max(3));
        assert_eq!(serde_json::to_string(&policy).unwrap(), r#""max:3""#);

        assert!(serde_json::from_str::<RestartPolicy>(r#""sometimes""#).is_err());
    }
}
