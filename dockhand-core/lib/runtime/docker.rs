//! Docker-backed implementation of the runtime capability.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    AttachContainerOptions, Config, CreateContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, RenameContainerOptions, StartContainerOptions, StopContainerOptions,
    WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{
    ContainerStateStatusEnum, HostConfig, PortBinding, RestartPolicy as DockerRestartPolicy,
    RestartPolicyNameEnum,
};
use bollard::Docker;
use futures::StreamExt;

use dockhand_utils::{env, ROLE_LABEL};

use crate::{
    config::RestartPolicy,
    runtime::{ContainerRuntime, ContainerSpec, ContainerState, ContainerSummary, ExecOutput, LogOptions},
    DockhandError, DockhandResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Seconds before an HTTP connection to a remote daemon times out.
const CONNECT_TIMEOUT_SECS: u64 = 120;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`ContainerRuntime`] over the Docker Engine API.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl DockerRuntime {
    /// Connects to the Docker daemon and verifies it answers.
    ///
    /// Uses the `DOCKHAND_DOCKER_HOST` endpoint when set, otherwise the
    /// platform's local daemon socket. An unreachable daemon is a
    /// connectivity error carrying enough context to act on, not a deferred
    /// failure at the first lifecycle call.
    pub async fn connect() -> DockhandResult<Self> {
        let docker = match env::get_docker_host() {
            Some(host) => {
                Docker::connect_with_http(&host, CONNECT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
            None => Docker::connect_with_socket_defaults(),
        }
        .map_err(|e| connect_error(e.into()))?;

        docker.ping().await.map_err(|e| connect_error(e.into()))?;

        Ok(Self { docker })
    }

    /// Wraps an already-connected bollard client.
    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create(&self, spec: &ContainerSpec) -> DockhandResult<String> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(|e| map_runtime_err("create", &spec.name, e))?;

        tracing::debug!("created container {} ({})", spec.name, response.id);
        Ok(response.id)
    }

    async fn start(&self, name: &str) -> DockhandResult<()> {
        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_runtime_err("start", name, e))
    }

    async fn stop(&self, name: &str, timeout_secs: u32) -> DockhandResult<()> {
        let options = StopContainerOptions {
            t: timeout_secs as i64,
        };

        self.docker
            .stop_container(name, Some(options))
            .await
            .map_err(|e| map_runtime_err("stop", name, e))
    }

    async fn remove(&self, name: &str, force: bool, volumes: bool) -> DockhandResult<()> {
        let options = RemoveContainerOptions {
            force,
            v: volumes,
            ..Default::default()
        };

        self.docker
            .remove_container(name, Some(options))
            .await
            .map_err(|e| map_runtime_err("remove", name, e))
    }

    async fn rename(&self, name: &str, new_name: &str) -> DockhandResult<()> {
        let options = RenameContainerOptions { name: new_name };

        self.docker
            .rename_container(name, options)
            .await
            .map_err(|e| map_runtime_err("rename", name, e))
    }

    async fn pull_image(&self, image: &str) -> DockhandResult<()> {
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            let info = progress.map_err(|e| map_runtime_err("pull", image, e))?;
            if let Some(status) = info.status {
                tracing::trace!("pull {}: {}", image, status);
            }
        }

        tracing::debug!("pulled image {}", image);
        Ok(())
    }

    async fn state(&self, name: &str) -> DockhandResult<ContainerState> {
        match self.docker.inspect_container(name, None).await {
            Ok(details) => Ok(map_state(details.state.and_then(|s| s.status))),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(ContainerState::Absent),
            Err(e) => Err(map_runtime_err("state", name, e)),
        }
    }

    async fn inspect(&self, name: &str) -> DockhandResult<serde_json::Value> {
        let details = self
            .docker
            .inspect_container(name, None)
            .await
            .map_err(|e| map_runtime_err("inspect", name, e))?;

        Ok(serde_json::to_value(details)?)
    }

    async fn logs(&self, name: &str, opts: &LogOptions) -> DockhandResult<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: opts.follow,
            tail: opts.tail.clone(),
            ..Default::default()
        };

        let mut stream = self.docker.logs(name, Some(options));
        let mut collected = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_runtime_err("logs", name, e))?;
            collected.push_str(&chunk.to_string());
        }

        Ok(collected)
    }

    async fn exec(
        &self,
        name: &str,
        cmd: &[String],
        interactive: bool,
    ) -> DockhandResult<ExecOutput> {
        let options = CreateExecOptions::<String> {
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            attach_stdin: Some(interactive),
            tty: Some(interactive),
            cmd: Some(cmd.to_vec()),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(name, options)
            .await
            .map_err(|e| map_runtime_err("exec", name, e))?;

        let mut collected = String::new();
        match self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| map_runtime_err("exec", name, e))?
        {
            StartExecResults::Attached { mut output, input } => {
                if interactive {
                    forward_stdin(input);
                }
                while let Some(chunk) = output.next().await {
                    let chunk = chunk.map_err(|e| map_runtime_err("exec", name, e))?;
                    collected.push_str(&chunk.to_string());
                }
            }
            StartExecResults::Detached => {}
        }

        let details = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| map_runtime_err("exec", name, e))?;

        Ok(ExecOutput {
            exit_code: details.exit_code.unwrap_or_default(),
            output: collected,
        })
    }

    async fn attach(&self, name: &str, interactive: bool) -> DockhandResult<String> {
        let options = AttachContainerOptions::<String> {
            stdin: Some(interactive),
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            logs: Some(true),
            detach_keys: None,
        };

        let results = self
            .docker
            .attach_container(name, Some(options))
            .await
            .map_err(|e| map_runtime_err("attach", name, e))?;

        if interactive {
            forward_stdin(results.input);
        }

        let mut output = results.output;
        let mut collected = String::new();
        while let Some(chunk) = output.next().await {
            let chunk = chunk.map_err(|e| map_runtime_err("attach", name, e))?;
            collected.push_str(&chunk.to_string());
        }

        Ok(collected)
    }

    async fn wait(&self, name: &str) -> DockhandResult<i64> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };

        let mut stream = self.docker.wait_container(name, Some(options));
        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // A non-zero exit surfaces as a wait error carrying the code.
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(map_runtime_err("wait", name, e)),
            None => Err(DockhandError::runtime(
                "wait",
                name,
                anyhow::anyhow!("no response from wait"),
            )),
        }
    }

    async fn list(&self, managed_only: bool) -> DockhandResult<Vec<ContainerSummary>> {
        let mut filters = HashMap::new();
        if managed_only {
            filters.insert("label".to_string(), vec![ROLE_LABEL.to_string()]);
        }

        let options = ListContainersOptions::<String> {
            all: true,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| map_runtime_err("list", "containers", e))?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                name: c
                    .names
                    .and_then(|names| names.into_iter().next())
                    .unwrap_or_default()
                    .trim_start_matches('/')
                    .to_string(),
                image: c.image.unwrap_or_default(),
                state: parse_state_str(c.state.as_deref().unwrap_or_default()),
                labels: c.labels.unwrap_or_default().into_iter().collect(),
            })
            .collect())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Builds the Docker create-container request from a spec.
fn container_config(spec: &ContainerSpec) -> Config<String> {
    let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
    let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();

    for mapping in &spec.ports {
        let container_port = format!("{}/tcp", mapping.container());
        exposed_ports.insert(container_port.clone(), HashMap::new());

        if let Some(host) = mapping.host() {
            port_bindings.insert(
                container_port,
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(host.to_string()),
                }]),
            );
        }
    }

    let host_config = HostConfig {
        binds: Some(spec.binds.clone()),
        port_bindings: Some(port_bindings),
        publish_all_ports: Some(spec.publish_all_ports),
        volumes_from: Some(spec.volumes_from.clone()),
        restart_policy: map_restart_policy(spec.restart),
        ..Default::default()
    };

    Config {
        image: Some(spec.image.clone()),
        cmd: if spec.command.is_empty() {
            None
        } else {
            Some(spec.command.clone())
        },
        env: Some(spec.env.clone()),
        exposed_ports: Some(exposed_ports),
        labels: Some(spec.labels.clone().into_iter().collect()),
        user: spec.user.clone(),
        working_dir: spec.working_dir.clone(),
        open_stdin: Some(spec.attach_stdin),
        attach_stdin: Some(spec.attach_stdin),
        tty: Some(spec.attach_stdin),
        host_config: Some(host_config),
        ..Default::default()
    }
}

/// Maps a dockhand restart policy onto Docker's native restart policy.
fn map_restart_policy(policy: RestartPolicy) -> Option<DockerRestartPolicy> {
    match policy {
        RestartPolicy::Never => None,
        RestartPolicy::Always => Some(DockerRestartPolicy {
            name: Some(RestartPolicyNameEnum::ALWAYS),
            maximum_retry_count: None,
        }),
        RestartPolicy::Max(limit) => Some(DockerRestartPolicy {
            name: Some(RestartPolicyNameEnum::ON_FAILURE),
            maximum_retry_count: Some(limit as i64),
        }),
    }
}

/// Maps the inspect status enum onto the observable state.
fn map_state(status: Option<ContainerStateStatusEnum>) -> ContainerState {
    match status {
        Some(ContainerStateStatusEnum::CREATED) => ContainerState::Created,
        Some(ContainerStateStatusEnum::RUNNING)
        | Some(ContainerStateStatusEnum::PAUSED)
        | Some(ContainerStateStatusEnum::RESTARTING) => ContainerState::Running,
        Some(ContainerStateStatusEnum::EXITED)
        | Some(ContainerStateStatusEnum::DEAD)
        | Some(ContainerStateStatusEnum::REMOVING) => ContainerState::Stopped,
        Some(ContainerStateStatusEnum::EMPTY) | None => ContainerState::Stopped,
    }
}

/// Maps a listing's state string onto the observable state.
fn parse_state_str(state: &str) -> ContainerState {
    match state {
        "created" => ContainerState::Created,
        "running" | "paused" | "restarting" => ContainerState::Running,
        _ => ContainerState::Stopped,
    }
}

/// Maps a Docker API error into the dockhand taxonomy.
fn map_runtime_err(operation: &'static str, name: &str, err: BollardError) -> DockhandError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => DockhandError::NotFound {
            operation,
            name: name.to_string(),
        },
        BollardError::DockerResponseServerError {
            status_code: 409, ..
        } => DockhandError::AlreadyExists {
            name: name.to_string(),
        },
        other => DockhandError::runtime(operation, name, other),
    }
}

/// The connectivity error for an unreachable daemon.
fn connect_error(source: anyhow::Error) -> DockhandError {
    DockhandError::Connectivity {
        name: "docker daemon".to_string(),
        reason: format!(
            "{}. Is the Docker daemon installed, running, and is your user allowed to use it?",
            source
        ),
    }
}

/// Copies the process's standard input into an attached container stream.
fn forward_stdin(mut input: std::pin::Pin<Box<dyn tokio::io::AsyncWrite + Send>>) {
    tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        let _ = tokio::io::copy(&mut stdin, &mut input).await;
    });
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_restart_policy() {
        assert!(map_restart_policy(RestartPolicy::Never).is_none());

        let always = map_restart_policy(RestartPolicy::Always).unwrap();
        assert_eq!(always.name, Some(RestartPolicyNameEnum::ALWAYS));
        assert_eq!(always.maximum_retry_count, None);

        let bounded = map_restart_policy(RestartPolicy::Max(99)).unwrap();
        assert_eq!(bounded.name, Some(RestartPolicyNameEnum::ON_FAILURE));
        assert_eq!(bounded.maximum_retry_count, Some(99));
    }

    #[test]
    fn test_map_state() {
        assert_eq!(
            map_state(Some(ContainerStateStatusEnum::CREATED)),
            ContainerState::Created
        );
        assert_eq!(
            map_state(Some(ContainerStateStatusEnum::RUNNING)),
            ContainerState::Running
        );
        assert_eq!(
            map_state(Some(ContainerStateStatusEnum::EXITED)),
            ContainerState::Stopped
        );
    }

    #[test]
    fn test_parse_state_str() {
        assert_eq!(parse_state_str("created"), ContainerState::Created);
        assert_eq!(parse_state_str("running"), ContainerState::Running);
        assert_eq!(parse_state_str("exited"), ContainerState::Stopped);
    }

    #[test]
    fn test_map_runtime_err_translates_conflicts() {
        let not_found = map_runtime_err(
            "inspect",
            "dockhand_service_missing",
            BollardError::DockerResponseServerError {
                status_code: 404,
                message: "no such container".to_string(),
            },
        );
        assert!(not_found.is_not_found());

        let conflict = map_runtime_err(
            "create",
            "dockhand_service_taken",
            BollardError::DockerResponseServerError {
                status_code: 409,
                message: "name already in use".to_string(),
            },
        );
        assert!(conflict.is_already_exists());
    }

    #[tokio::test]
    #[ignore] // requires a Docker daemon
    async fn test_connect_and_list() {
        let runtime = DockerRuntime::connect().await.unwrap();
        let containers = runtime.list(false).await.unwrap();
        // the listing itself succeeding is the assertion; contents depend on the host
        let _ = containers;
    }
}
