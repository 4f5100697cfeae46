//! Resolved definitions of service and data units.

use std::collections::BTreeMap;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{
    merge::{overlay_option, overlay_string, union_map},
    Merge, PortMapping, RestartPolicy, VolumeMount,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A fully-resolved definition of a logical unit.
///
/// Loading and validating definition files is the concern of callers (see
/// the definition-loader boundary); the lifecycle manager only ever works
/// from this resolved form. The same definition describes the unit's service
/// container and, when `auto_data` is set, its companion data container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TypedBuilder, Getters, CopyGetters)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logical name of the unit.
    #[builder(setter(into))]
    #[getset(get = "pub with_prefix")]
    name: String,

    /// Image reference the service runs from.
    #[builder(setter(into))]
    #[getset(get = "pub with_prefix")]
    image: String,

    /// Command run when the service container starts.
    #[builder(default)]
    #[getset(get = "pub with_prefix")]
    command: Vec<String>,

    /// Environment variables.
    #[builder(default)]
    #[getset(get = "pub with_prefix")]
    environment: BTreeMap<String, String>,

    /// Bind mounts.
    #[builder(default)]
    #[getset(get = "pub with_prefix")]
    volumes: Vec<VolumeMount>,

    /// Exposed ports, with optional fixed host bindings.
    #[builder(default)]
    #[getset(get = "pub with_prefix")]
    ports: Vec<PortMapping>,

    /// Whether a companion data container is provisioned automatically.
    #[serde(rename = "data_container")]
    #[builder(default)]
    #[getset(get_copy = "pub with_prefix")]
    auto_data: bool,

    /// Restart policy applied to the service process.
    #[builder(default)]
    #[getset(get_copy = "pub with_prefix")]
    restart: RestartPolicy,

    /// User the container process runs as.
    #[builder(default)]
    #[getset(get = "pub with_prefix")]
    user: Option<String>,

    /// Working directory inside the container.
    #[builder(default)]
    #[getset(get = "pub with_prefix")]
    working_dir: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl Merge for ServiceConfig {
    fn merge(&mut self, overlay: Self) {
        overlay_string(&mut self.name, overlay.name);
        overlay_string(&mut self.image, overlay.image);
        self.command.extend(overlay.command);
        union_map(&mut self.environment, overlay.environment);
        self.volumes.extend(overlay.volumes);
        self.ports.extend(overlay.ports);
        if overlay.auto_data {
            self.auto_data = true;
        }
        if overlay.restart != RestartPolicy::Never {
            self.restart = overlay.restart;
        }
        overlay_option(&mut self.user, overlay.user);
        overlay_option(&mut self.working_dir, overlay.working_dir);
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
