//! Canonical container naming and existence queries.
//!
//! Every logical unit resolves to deterministic container names, one per
//! role, so repeated operations against the same unit always target the same
//! containers. The queries here are read-only and side-effect-free; the
//! lifecycle manager uses them as preconditions everywhere.

use std::collections::BTreeMap;
use std::fmt;

use dockhand_utils::{CONTAINER_NAME_PREFIX, NAME_LABEL, ROLE_LABEL};
use uuid::Uuid;

use crate::{runtime::ContainerRuntime, DockhandError, DockhandResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The two container roles dockhand manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerRole {
    /// A container running a service process.
    Service,

    /// A storage-only companion owning persistent volumes; created, never
    /// started.
    Data,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl ContainerRole {
    /// The role's label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerRole::Service => "service",
            ContainerRole::Data => "data",
        }
    }
}

impl fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Resolves the canonical container name for a logical unit in a role.
///
/// The resolution is injective per `(logical, role)` pair, and the two roles
/// of one unit never collide: `dockhand_service_<name>` vs
/// `dockhand_data_<name>`.
pub fn container_name(role: ContainerRole, logical: &str) -> String {
    format!("{}_{}_{}", CONTAINER_NAME_PREFIX, role.as_str(), logical)
}

/// Generates a unique name for a throwaway exec-session container.
///
/// Session names never collide with service/data names or with each other,
/// so two exec sessions for the same unit can overlap without one finding
/// its container pre-empted by the other's cleanup.
pub fn session_name(logical: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_session_{}_{}",
        CONTAINER_NAME_PREFIX,
        logical,
        &suffix[..8]
    )
}

/// The labels attached to every managed container.
pub fn labels(role: ContainerRole, logical: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (NAME_LABEL.to_string(), logical.to_string()),
        (ROLE_LABEL.to_string(), role.as_str().to_string()),
    ])
}

/// Validates a logical or resolved container name.
///
/// Empty names and names the runtime would reject (whitespace, or anything
/// outside `[a-zA-Z0-9_.-]` after the first alphanumeric character) are
/// validation errors, uniformly for every operation.
pub fn validate_name(name: &str) -> DockhandResult<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => {
            return Err(DockhandError::validation(
                "container name",
                "name must not be empty",
            ));
        }
        Some(first) if !first.is_ascii_alphanumeric() => {
            return Err(DockhandError::validation(
                "container name",
                format!("`{}` must start with an alphanumeric character", name),
            ));
        }
        Some(_) => {}
    }

    if let Some(bad) = chars.find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '.' | '-')) {
        return Err(DockhandError::validation(
            "container name",
            format!("`{}` contains invalid character `{}`", name, bad),
        ));
    }

    Ok(())
}

/// Whether `candidate` refers to the container named `resolved`.
///
/// Runtimes report names in variant forms (a leading slash, differing ASCII
/// case); the comparison tolerates both.
pub fn matches(resolved: &str, candidate: &str) -> bool {
    let candidate = candidate.trim_start_matches('/');
    resolved.eq_ignore_ascii_case(candidate)
}

/// Whether a container by the resolved name exists, in any state.
pub async fn exists<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    resolved: &str,
) -> DockhandResult<bool> {
    let containers = runtime.list(false).await?;
    Ok(containers.iter().any(|c| matches(resolved, &c.name)))
}

/// Whether a container by the resolved name is currently running.
pub async fn running<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    resolved: &str,
) -> DockhandResult<bool> {
    let containers = runtime.list(false).await?;
    Ok(containers
        .iter()
        .any(|c| matches(resolved, &c.name) && c.state.is_running()))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_role_distinct() {
        let service = container_name(ContainerRole::Service, "ipfs");
        let data = container_name(ContainerRole::Data, "ipfs");
        assert_eq!(service, "dockhand_service_ipfs");
        assert_eq!(data, "dockhand_data_ipfs");
        assert_ne!(service, data);
    }

    #[test]
    fn test_names_are_deterministic() {
        assert_eq!(
            container_name(ContainerRole::Service, "keys"),
            container_name(ContainerRole::Service, "keys"),
        );
    }

    #[test]
    fn test_session_names_are_unique() {
        let a = session_name("ipfs");
        let b = session_name("ipfs");
        assert_ne!(a, b);
        assert!(a.starts_with("dockhand_session_ipfs_"));
    }

    #[test]
    fn test_matches_tolerates_variants() {
        assert!(matches("dockhand_service_ipfs", "/dockhand_service_ipfs"));
        assert!(matches("dockhand_service_ipfs", "Dockhand_Service_IPFS"));
        assert!(!matches("dockhand_service_ipfs", "dockhand_data_ipfs"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("ipfs").is_ok());
        assert!(validate_name("restart-keys_2.0").is_ok());

        assert!(validate_name("").is_err());
        assert!(validate_name("bad name").is_err());
        assert!(validate_name("-leading-dash").is_err());
        assert!(validate_name("tab\tname").is_err());
    }
}
