//! Types exchanged between the lifecycle manager and runtime implementations.

use std::collections::BTreeMap;

use typed_builder::TypedBuilder;

use crate::config::{PortMapping, RestartPolicy};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Observable state of a resolved container name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// No container by the name.
    Absent,

    /// Created but never started.
    Created,

    /// Process running (including paused/restarting under runtime control).
    Running,

    /// Process exited; the container is kept until removed.
    Stopped,
}

/// Parameters for creating one container.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ContainerSpec {
    /// Resolved container name.
    #[builder(setter(into))]
    pub name: String,

    /// Image reference.
    #[builder(setter(into))]
    pub image: String,

    /// Command and arguments; empty keeps the image default.
    #[builder(default)]
    pub command: Vec<String>,

    /// Environment in `KEY=VALUE` form.
    #[builder(default)]
    pub env: Vec<String>,

    /// Bind mounts in `SOURCE:TARGET` form.
    #[builder(default)]
    pub binds: Vec<String>,

    /// Exposed ports with optional fixed host bindings.
    #[builder(default)]
    pub ports: Vec<PortMapping>,

    /// Publish every exposed port on a runtime-chosen host port.
    #[builder(default)]
    pub publish_all_ports: bool,

    /// Containers whose volumes this container mounts.
    #[builder(default)]
    pub volumes_from: Vec<String>,

    /// Labels identifying the container as dockhand-managed.
    #[builder(default)]
    pub labels: BTreeMap<String, String>,

    /// Restart policy mapped onto the runtime's native policy.
    #[builder(default)]
    pub restart: RestartPolicy,

    /// User the container process runs as.
    #[builder(default)]
    pub user: Option<String>,

    /// Working directory inside the container.
    #[builder(default)]
    pub working_dir: Option<String>,

    /// Keep stdin open and allocate a terminal (interactive sessions).
    #[builder(default)]
    pub attach_stdin: bool,
}

/// One row of a container listing.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    /// Runtime container id.
    pub id: String,

    /// Container name, without the runtime's leading slash.
    pub name: String,

    /// Image reference the container was created from.
    pub image: String,

    /// Observable state.
    pub state: ContainerState,

    /// Container labels.
    pub labels: BTreeMap<String, String>,
}

/// Options for fetching container logs.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Keep streaming until the container stops.
    pub follow: bool,

    /// Number of lines from the end, or `"all"`.
    pub tail: String,
}

/// Outcome of one command execution inside a container.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Exit status of the command.
    pub exit_code: i64,

    /// Captured combined output.
    pub output: String,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl ContainerState {
    /// Whether the container exists in any state.
    pub fn exists(&self) -> bool {
        !matches!(self, ContainerState::Absent)
    }

    /// Whether the container's process is running.
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            follow: false,
            tail: dockhand_utils::LOG_TAIL_ALL.to_string(),
        }
    }
}
