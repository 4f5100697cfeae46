//! The container lifecycle manager.
//!
//! This module decides, for every lifecycle operation, which runtime calls
//! to issue, in what order, and under what preconditions, and how to react
//! to their results. It composes the naming resolver, the data-container
//! dependency resolver and the restart-policy engine over a
//! [`ContainerRuntime`] capability.
//!
//! The manager is synchronous per call: each operation blocks until the
//! underlying runtime calls complete or time out. Operations against
//! different units are safe to run concurrently; overlapping operations
//! against the *same* resolved name race at the runtime level and are the
//! caller's responsibility to avoid.

use std::{collections::HashMap, str::FromStr, sync::Mutex};

use dockhand_utils::{env, LOG_TAIL_ALL, ROLE_LABEL};
use serde_json::Value;
use typed_builder::TypedBuilder;

use crate::{
    config::{ExecConfig, OutputSink, RestartPolicy, ServiceConfig},
    management::{
        data,
        naming::{self, ContainerRole},
    },
    runtime::{
        ContainerRuntime, ContainerSpec, ContainerState, ContainerSummary, ExecOutput, LogOptions,
    },
    DockhandError, DockhandResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Orchestrates container lifecycle operations over a runtime capability.
///
/// All state lives in the runtime, keyed by resolved container name; the
/// only thing the manager itself holds across calls is the per-unit exec
/// attempt counter used for restart-policy bookkeeping.
pub struct LifecycleManager<R: ContainerRuntime> {
    /// The runtime every operation goes through.
    runtime: R,

    /// Exec attempts per resolved service name, for restart bookkeeping.
    exec_attempts: Mutex<HashMap<String, u32>>,
}

/// Options for removing a unit's containers.
#[derive(Debug, Clone, Copy, Default, TypedBuilder)]
pub struct RemoveOpts {
    /// Also remove the paired data container, as a second step.
    #[builder(default)]
    pub with_data: bool,

    /// Remove a running container instead of refusing.
    #[builder(default)]
    pub force: bool,

    /// Remove the container's anonymous volumes with it.
    #[builder(default)]
    pub volumes: bool,
}

/// Which part of an inspect dump to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectSelector {
    /// The full structured dump.
    All,

    /// A single-line summary.
    Line,

    /// One value, addressed by a dotted field path like `Config.WorkingDir`.
    Field(String),
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl<R: ContainerRuntime> LifecycleManager<R> {
    /// Creates a manager over the given runtime.
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            exec_attempts: Mutex::new(HashMap::new()),
        }
    }

    /// The runtime this manager operates through.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Creates a unit's data container.
    ///
    /// Create is strict: if any container occupies the resolved data name,
    /// in whatever state, the call fails with `AlreadyExists` rather than
    /// reusing it.
    pub async fn create_data(&self, config: &ServiceConfig) -> DockhandResult<()> {
        let data_name = resolved_name(ContainerRole::Data, config)?;

        if naming::exists(&self.runtime, &data_name).await? {
            return Err(DockhandError::AlreadyExists { name: data_name });
        }

        data::create_data_container(&self.runtime, config).await?;
        Ok(())
    }

    /// Creates (if absent) and starts a unit's service container.
    ///
    /// When the unit has auto-data enabled, the companion data container is
    /// provisioned first and linked through volumes-from. Re-invoking on an
    /// already-running container is a success no-op; a running container is
    /// never restarted. Ports are published exactly as requested: fixed host
    /// bindings from the definition's port mappings, everything only when
    /// `opts` asks for publish-all.
    ///
    /// ## Arguments
    ///
    /// * `config` - The resolved unit definition
    /// * `opts` - Execution configuration (publish-all-ports is honored here)
    ///
    /// ## Example
    ///
    /// ```no_run
    /// use dockhand_core::config::{ExecConfig, ServiceConfig};
    /// use dockhand_core::management::LifecycleManager;
    /// use dockhand_core::runtime::DockerRuntime;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let manager = LifecycleManager::new(DockerRuntime::connect().await?);
    ///
    /// let config = ServiceConfig::builder()
    ///     .name("ipfs")
    ///     .image("ipfs/kubo:latest")
    ///     .auto_data(true)
    ///     .build();
    ///
    /// manager.run_service(&config, &ExecConfig::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_service(
        &self,
        config: &ServiceConfig,
        opts: &ExecConfig,
    ) -> DockhandResult<()> {
        let service_name = resolved_name(ContainerRole::Service, config)?;

        if naming::running(&self.runtime, &service_name).await? {
            tracing::debug!("service container {} already running", service_name);
            return Ok(());
        }

        let volumes_from = data::ensure_data(&self.runtime, config).await?;

        if !naming::exists(&self.runtime, &service_name).await? {
            let spec = service_spec(config, &service_name, volumes_from, opts);
            self.runtime.create(&spec).await?;
        }

        self.runtime.start(&service_name).await?;
        tracing::info!("service container {} started", service_name);

        Ok(())
    }

    /// Executes a command in the context of a unit's service container.
    ///
    /// If the service container is currently running, the command runs
    /// inside it. An interactive session against a container that was
    /// started without published ports fails with a connectivity error
    /// rather than silently falling back, unless publish-all-ports was set
    /// on that run or is set on this call.
    ///
    /// If it is not running, a throwaway session container is created from
    /// the service image (with the data container's volumes attached when
    /// auto-data is enabled), the command runs there, combined output is
    /// captured, and the session container is removed on every exit path.
    ///
    /// Bad command lines surface as non-zero-exit runtime errors, not
    /// lifecycle errors; teardown still runs. Captured output is written to
    /// the sink in `opts` and returned.
    pub async fn exec_service(
        &self,
        config: &ServiceConfig,
        opts: &ExecConfig,
    ) -> DockhandResult<ExecOutput> {
        let service_name = resolved_name(ContainerRole::Service, config)?;
        validate_exec_args(opts)?;

        let output = if naming::running(&self.runtime, &service_name).await? {
            self.exec_in_running(config, &service_name, opts).await?
        } else {
            let volumes_from = data::ensure_data(&self.runtime, config).await?;
            self.exec_session(config, config.get_image().clone(), volumes_from, opts)
                .await?
        };

        self.note_attempt(config, &service_name);
        Ok(output)
    }

    /// Executes a command in a throwaway session over a unit's data
    /// container volumes.
    ///
    /// The data container must already exist; there is no auto-creation on
    /// this path.
    pub async fn exec_data(
        &self,
        config: &ServiceConfig,
        opts: &ExecConfig,
    ) -> DockhandResult<ExecOutput> {
        let data_name = resolved_name(ContainerRole::Data, config)?;
        validate_exec_args(opts)?;

        if !naming::exists(&self.runtime, &data_name).await? {
            return Err(DockhandError::NotFound {
                operation: "exec",
                name: data_name,
            });
        }

        self.exec_session(config, env::get_data_image(), Some(data_name), opts)
            .await
    }

    /// Gracefully stops a unit's container in the given role.
    ///
    /// Stopping a container that is absent, merely created, or already
    /// stopped is a deliberate success no-op, which makes stop on a
    /// data-role handle always safe, since data containers never run.
    pub async fn stop(
        &self,
        config: &ServiceConfig,
        role: ContainerRole,
        timeout_secs: u32,
    ) -> DockhandResult<()> {
        let name = resolved_name(role, config)?;

        match self.runtime.state(&name).await? {
            ContainerState::Running => {
                self.runtime.stop(&name, timeout_secs).await?;
                tracing::info!("stopped container {}", name);
            }
            state => {
                tracing::debug!("stop of {} is a no-op in state {:?}", name, state);
            }
        }

        Ok(())
    }

    /// Rebuilds a unit's service container from its image.
    ///
    /// Stops the container if running, removes it, optionally pulls a fresh
    /// image, recreates it, and restarts it only if it was running before
    /// the rebuild. Rebuilding an absent container creates it fresh without
    /// error; rebuilding a stopped one leaves the new container stopped.
    pub async fn rebuild(
        &self,
        config: &ServiceConfig,
        opts: &ExecConfig,
        pull: bool,
        timeout_secs: u32,
    ) -> DockhandResult<()> {
        let service_name = resolved_name(ContainerRole::Service, config)?;

        let state = self.runtime.state(&service_name).await?;
        let was_running = state.is_running();

        if state.exists() {
            if was_running {
                self.runtime.stop(&service_name, timeout_secs).await?;
            }
            self.runtime.remove(&service_name, false, false).await?;
        }

        if pull {
            self.runtime.pull_image(config.get_image()).await?;
        }

        let volumes_from = data::ensure_data(&self.runtime, config).await?;
        let spec = service_spec(config, &service_name, volumes_from, opts);
        self.runtime.create(&spec).await?;

        if was_running {
            self.runtime.start(&service_name).await?;
        }

        tracing::info!(
            "rebuilt container {} (running: {})",
            service_name,
            was_running
        );
        Ok(())
    }

    /// Pulls the latest image for a unit without disturbing its container.
    ///
    /// A running container keeps running on the old image until a
    /// subsequent rebuild adopts the new one.
    pub async fn pull(&self, config: &ServiceConfig) -> DockhandResult<()> {
        resolved_name(ContainerRole::Service, config)?;
        self.runtime.pull_image(config.get_image()).await
    }

    /// Renames a unit's container in the given role.
    ///
    /// The new logical name is validated first (an empty or malformed name
    /// changes nothing); renaming a missing container is `NotFound`;
    /// renaming onto an occupied name is `AlreadyExists`. Running and
    /// stopped containers keep their state under the new resolved name, and
    /// the old name stops resolving entirely.
    pub async fn rename(
        &self,
        config: &ServiceConfig,
        role: ContainerRole,
        new_name: &str,
    ) -> DockhandResult<()> {
        let name = resolved_name(role, config)?;
        naming::validate_name(new_name)?;

        let new_resolved = naming::container_name(role, new_name);
        if new_resolved == name {
            return Err(DockhandError::validation(
                "rename target",
                "cannot rename to the same name",
            ));
        }

        if !naming::exists(&self.runtime, &name).await? {
            return Err(DockhandError::NotFound {
                operation: "rename",
                name,
            });
        }

        if naming::exists(&self.runtime, &new_resolved).await? {
            return Err(DockhandError::AlreadyExists { name: new_resolved });
        }

        self.runtime.rename(&name, &new_resolved).await?;
        tracing::info!("renamed container {} to {}", name, new_resolved);

        Ok(())
    }

    /// Removes a unit's container in the given role.
    ///
    /// A running container is refused unless `opts.force`. With
    /// `opts.with_data` on a service-role removal, the paired data
    /// container is removed as a second step; a failure there after the
    /// primary removal succeeded is reported as a partial failure, and the
    /// primary removal is not rolled back.
    pub async fn remove(
        &self,
        config: &ServiceConfig,
        role: ContainerRole,
        opts: &RemoveOpts,
    ) -> DockhandResult<()> {
        let name = resolved_name(role, config)?;

        let state = self.runtime.state(&name).await?;
        if !state.exists() {
            return Err(DockhandError::NotFound {
                operation: "remove",
                name,
            });
        }
        if state.is_running() && !opts.force {
            return Err(DockhandError::validation(
                "remove",
                format!("container {} is running; stop it first or pass force", name),
            ));
        }

        self.runtime.remove(&name, opts.force, opts.volumes).await?;
        tracing::info!("removed container {}", name);

        if opts.with_data && role == ContainerRole::Service {
            let data_name = naming::container_name(ContainerRole::Data, config.get_name());
            if naming::exists(&self.runtime, &data_name).await? {
                if let Err(secondary) =
                    self.runtime.remove(&data_name, opts.force, opts.volumes).await
                {
                    return Err(DockhandError::PartialFailure {
                        operation: "remove",
                        name: data_name,
                        primary: None,
                        secondary: Box::new(secondary),
                    });
                }
                tracing::info!("removed data container {}", data_name);
            }
        }

        Ok(())
    }

    /// Writes a read-only view of a unit's container to the sink.
    ///
    /// Succeeds for stopped containers too, and mutates nothing.
    pub async fn inspect(
        &self,
        config: &ServiceConfig,
        role: ContainerRole,
        selector: &InspectSelector,
        sink: &OutputSink,
    ) -> DockhandResult<()> {
        let name = resolved_name(role, config)?;
        let details = self.runtime.inspect(&name).await?;

        match selector {
            InspectSelector::All => {
                let dump = serde_json::to_string_pretty(&details)?;
                sink.write_out(dump.as_bytes())?;
                sink.write_out(b"\n")?;
            }
            InspectSelector::Line => {
                sink.write_out(summary_line(&name, &details).as_bytes())?;
            }
            InspectSelector::Field(path) => {
                let value = lookup_field(&details, path).ok_or_else(|| {
                    DockhandError::validation(
                        "inspect selector",
                        format!("no field `{}` on {}", path, name),
                    )
                })?;
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                sink.write_out(rendered.as_bytes())?;
                sink.write_out(b"\n")?;
            }
        }

        Ok(())
    }

    /// Writes a unit's container logs to the sink.
    ///
    /// `opts.tail` bounds the number of lines from the end; a tail of `"0"`
    /// yields empty output, not an error.
    pub async fn logs(
        &self,
        config: &ServiceConfig,
        role: ContainerRole,
        opts: &LogOptions,
        sink: &OutputSink,
    ) -> DockhandResult<()> {
        let name = resolved_name(role, config)?;
        validate_tail(&opts.tail)?;

        let content = self.runtime.logs(&name, opts).await?;
        sink.write_out(content.as_bytes())?;

        Ok(())
    }

    /// Lists managed containers, optionally filtered to one role.
    pub async fn list(
        &self,
        role: Option<ContainerRole>,
    ) -> DockhandResult<Vec<ContainerSummary>> {
        let containers = self.runtime.list(true).await?;

        Ok(match role {
            Some(role) => containers
                .into_iter()
                .filter(|c| c.labels.get(ROLE_LABEL).map(String::as_str) == Some(role.as_str()))
                .collect(),
            None => containers,
        })
    }

    /// How many exec attempts this manager has recorded for a unit.
    ///
    /// Only units with a restart policy other than never are counted.
    pub fn exec_attempts(&self, config: &ServiceConfig) -> u32 {
        let name = naming::container_name(ContainerRole::Service, config.get_name());
        self.lock_attempts().get(&name).copied().unwrap_or(0)
    }
}

impl<R: ContainerRuntime> LifecycleManager<R> {
    /// Runs a command inside the live service container.
    async fn exec_in_running(
        &self,
        config: &ServiceConfig,
        name: &str,
        opts: &ExecConfig,
    ) -> DockhandResult<ExecOutput> {
        if opts.get_interactive()
            && !config.get_ports().is_empty()
            && !opts.get_publish_all_ports()
            && !self.ports_published(name).await?
        {
            return Err(DockhandError::Connectivity {
                name: name.to_string(),
                reason: "running without published ports; re-run the service with \
                         publish-all-ports or pass publish-all-ports to this session"
                    .to_string(),
            });
        }

        let output = self
            .runtime
            .exec(name, opts.get_args(), opts.get_interactive())
            .await?;
        opts.get_sink().write_out(output.output.as_bytes())?;

        if output.exit_code != 0 {
            return Err(DockhandError::NonZeroExit {
                name: name.to_string(),
                code: output.exit_code,
            });
        }

        Ok(output)
    }

    /// Runs a command in a throwaway session container and tears it down on
    /// every exit path.
    async fn exec_session(
        &self,
        config: &ServiceConfig,
        image: String,
        volumes_from: Option<String>,
        opts: &ExecConfig,
    ) -> DockhandResult<ExecOutput> {
        let session = naming::session_name(config.get_name());
        let spec = session_spec(config, &session, image, volumes_from, opts);

        self.runtime.create(&spec).await?;
        tracing::debug!("created session container {}", session);

        let result = self.run_session(&session, opts).await;

        // teardown runs whether the session succeeded or not
        let cleanup = self.runtime.remove(&session, true, true).await;
        if cleanup.is_ok() {
            tracing::debug!("removed session container {}", session);
        }

        match (result, cleanup) {
            (Ok(output), Ok(())) => Ok(output),
            (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup_err)) => Err(DockhandError::PartialFailure {
                operation: "exec",
                name: session,
                primary: Some(Box::new(err)),
                secondary: Box::new(cleanup_err),
            }),
        }
    }

    /// Starts a session container, captures its output and exit code.
    async fn run_session(&self, session: &str, opts: &ExecConfig) -> DockhandResult<ExecOutput> {
        self.runtime.start(session).await?;

        let (exit_code, output) = if opts.get_interactive() {
            let output = self.runtime.attach(session, true).await?;
            let exit_code = self.runtime.wait(session).await?;
            (exit_code, output)
        } else {
            let exit_code = self.runtime.wait(session).await?;
            let output = self.runtime.logs(session, &LogOptions::default()).await?;
            (exit_code, output)
        };

        opts.get_sink().write_out(output.as_bytes())?;

        if exit_code != 0 {
            return Err(DockhandError::NonZeroExit {
                name: session.to_string(),
                code: exit_code,
            });
        }

        Ok(ExecOutput { exit_code, output })
    }

    /// Whether the running container has any port reachable from the host.
    async fn ports_published(&self, name: &str) -> DockhandResult<bool> {
        let details = self.runtime.inspect(name).await?;

        if details
            .pointer("/HostConfig/PublishAllPorts")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Ok(true);
        }

        Ok(details
            .pointer("/NetworkSettings/Ports")
            .and_then(Value::as_object)
            .map(|ports| {
                ports
                    .values()
                    .any(|bindings| bindings.as_array().is_some_and(|b| !b.is_empty()))
            })
            .unwrap_or(false))
    }

    /// Records an exec attempt for restart-policy bookkeeping.
    fn note_attempt(&self, config: &ServiceConfig, name: &str) {
        if config.get_restart() == RestartPolicy::Never {
            return;
        }

        let mut attempts = self.lock_attempts();
        let count = attempts.entry(name.to_string()).or_insert(0);
        *count += 1;

        tracing::debug!(
            "exec attempt {} for {}; runtime retry expected: {}",
            count,
            name,
            config.get_restart().should_retry(*count)
        );
    }

    fn lock_attempts(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        self.exec_attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FromStr for InspectSelector {
    type Err = DockhandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(DockhandError::validation(
                "inspect selector",
                "selector must be `all`, `line` or a field path",
            )),
            "all" => Ok(InspectSelector::All),
            "line" => Ok(InspectSelector::Line),
            path => Ok(InspectSelector::Field(path.to_string())),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Validates the unit name and resolves the container name for a role.
fn resolved_name(role: ContainerRole, config: &ServiceConfig) -> DockhandResult<String> {
    naming::validate_name(config.get_name())?;
    Ok(naming::container_name(role, config.get_name()))
}

/// Non-interactive exec sessions must have a command to execute.
fn validate_exec_args(opts: &ExecConfig) -> DockhandResult<()> {
    if !opts.get_interactive() && opts.get_args().is_empty() {
        return Err(DockhandError::validation(
            "exec arguments",
            "non-interactive exec sessions must provide a command to execute",
        ));
    }
    Ok(())
}

/// `"all"` or a line count.
fn validate_tail(tail: &str) -> DockhandResult<()> {
    if tail == LOG_TAIL_ALL || tail.parse::<u64>().is_ok() {
        Ok(())
    } else {
        Err(DockhandError::validation(
            "log tail",
            format!("`{}` is not a line count or `{}`", tail, LOG_TAIL_ALL),
        ))
    }
}

/// The create spec for a unit's long-lived service container.
fn service_spec(
    config: &ServiceConfig,
    name: &str,
    volumes_from: Option<String>,
    opts: &ExecConfig,
) -> ContainerSpec {
    ContainerSpec::builder()
        .name(name)
        .image(config.get_image().clone())
        .command(config.get_command().clone())
        .env(environment_pairs(config))
        .binds(config.get_volumes().iter().map(ToString::to_string).collect())
        .ports(config.get_ports().clone())
        .publish_all_ports(opts.get_publish_all_ports())
        .volumes_from(volumes_from.into_iter().collect())
        .labels(naming::labels(ContainerRole::Service, config.get_name()))
        .restart(config.get_restart())
        .user(config.get_user().clone())
        .working_dir(config.get_working_dir().clone())
        .build()
}

/// The create spec for a throwaway exec-session container.
fn session_spec(
    config: &ServiceConfig,
    session: &str,
    image: String,
    volumes_from: Option<String>,
    opts: &ExecConfig,
) -> ContainerSpec {
    ContainerSpec::builder()
        .name(session)
        .image(image)
        .command(opts.get_args().clone())
        .env(environment_pairs(config))
        .publish_all_ports(opts.get_publish_all_ports())
        .volumes_from(volumes_from.into_iter().collect())
        .user(config.get_user().clone())
        .working_dir(config.get_working_dir().clone())
        .attach_stdin(opts.get_interactive())
        .build()
}

/// Flattens the environment map into `KEY=VALUE` pairs.
fn environment_pairs(config: &ServiceConfig) -> Vec<String> {
    config
        .get_environment()
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect()
}

/// Descends a dotted field path through the inspect dump.
fn lookup_field<'a>(details: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = details;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// One line: name, image, state and address, for quick listings.
fn summary_line(name: &str, details: &Value) -> String {
    let field = |path: &str| {
        lookup_field(details, path)
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string()
    };

    format!(
        "{}\t{}\t{}\t{}\n",
        name,
        field("Config.Image"),
        field("State.Status"),
        field("NetworkSettings.IPAddress"),
    )
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse() {
        assert_eq!("all".parse::<InspectSelector>().unwrap(), InspectSelector::All);
        assert_eq!(
            "line".parse::<InspectSelector>().unwrap(),
            InspectSelector::Line
        );
        assert_eq!(
            "Config.WorkingDir".parse::<InspectSelector>().unwrap(),
            InspectSelector::Field("Config.WorkingDir".to_string())
        );
        assert!("".parse::<InspectSelector>().is_err());
    }

    #[test]
    fn test_validate_tail() {
        assert!(validate_tail("all").is_ok());
        assert!(validate_tail("0").is_ok());
        assert!(validate_tail("100").is_ok());
        assert!(validate_tail("-5").is_err());
        assert!(validate_tail("some").is_err());
    }

    #[test]
    fn test_lookup_field() {
        let details = serde_json::json!({
            "Config": { "WorkingDir": "/home/dockhand" },
            "State": { "Status": "exited" },
        });

        assert_eq!(
            lookup_field(&details, "Config.WorkingDir").and_then(Value::as_str),
            Some("/home/dockhand")
        );
        assert!(lookup_field(&details, "Config.Missing").is_none());
        assert!(lookup_field(&details, "No.Such.Path").is_none());
    }
}
