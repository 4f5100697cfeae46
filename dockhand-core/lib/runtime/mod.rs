//! The boundary to the container runtime.
//!
//! [`ContainerRuntime`] is the capability the lifecycle manager consumes:
//! every operation it performs against real containers goes through this
//! trait, which keeps the manager testable against an in-memory runtime and
//! keeps runtime specifics (API versions, wire types) out of the lifecycle
//! logic. [`DockerRuntime`] implements the capability over the Docker API.

mod docker;
mod types;

use async_trait::async_trait;

use crate::DockhandResult;

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Operations a container runtime provides to the lifecycle manager.
///
/// Implementations map their native errors into the dockhand taxonomy:
/// a missing container is `NotFound`, an occupied name is `AlreadyExists`,
/// everything else the runtime rejects is `Runtime` with the operation and
/// resolved name attached.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Creates a container from `spec` and returns the runtime id.
    async fn create(&self, spec: &ContainerSpec) -> DockhandResult<String>;

    /// Starts a created or stopped container.
    async fn start(&self, name: &str) -> DockhandResult<()>;

    /// Gracefully stops a running container within `timeout_secs`, then
    /// kills it.
    async fn stop(&self, name: &str, timeout_secs: u32) -> DockhandResult<()>;

    /// Removes a container, optionally forcing a running one and removing
    /// its anonymous volumes.
    async fn remove(&self, name: &str, force: bool, volumes: bool) -> DockhandResult<()>;

    /// Renames a container, preserving its state.
    async fn rename(&self, name: &str, new_name: &str) -> DockhandResult<()>;

    /// Pulls the latest image for `image` from its registry.
    async fn pull_image(&self, image: &str) -> DockhandResult<()>;

    /// Reports the observable state of `name`; `Absent` is not an error.
    async fn state(&self, name: &str) -> DockhandResult<ContainerState>;

    /// Returns the runtime's structured view of the container.
    async fn inspect(&self, name: &str) -> DockhandResult<serde_json::Value>;

    /// Collects container logs; `opts.tail` is a line count or `"all"`.
    async fn logs(&self, name: &str, opts: &LogOptions) -> DockhandResult<String>;

    /// Runs `cmd` inside a running container and captures its output.
    /// Interactive sessions forward the process's standard input.
    async fn exec(
        &self,
        name: &str,
        cmd: &[String],
        interactive: bool,
    ) -> DockhandResult<ExecOutput>;

    /// Attaches to a container's streams until it stops and returns the
    /// collected output. Interactive sessions forward standard input.
    async fn attach(&self, name: &str, interactive: bool) -> DockhandResult<String>;

    /// Waits until the container stops and returns its exit code.
    async fn wait(&self, name: &str) -> DockhandResult<i64>;

    /// Lists containers in every state, optionally only dockhand-managed
    /// ones.
    async fn list(&self, managed_only: bool) -> DockhandResult<Vec<ContainerSummary>>;
}

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use docker::*;
pub use types::*;
