//! Auto-provisioning of companion data containers.
//!
//! A data container owns a unit's persistent volumes and nothing else: it is
//! created from a minimal image and never started. Service containers and
//! exec sessions reach the volumes through a volumes-from link, which may
//! only ever point at a data container that exists, so provisioning happens
//! before any dependent container starts.

use dockhand_utils::env;

use crate::{
    config::ServiceConfig,
    management::naming::{self, ContainerRole},
    runtime::{ContainerRuntime, ContainerSpec},
    DockhandError, DockhandResult,
};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Ensures the companion data container for `config` exists.
///
/// Returns the resolved data-container name when one exists afterwards
/// (pre-existing or freshly created), or `None` when the unit has auto-data
/// disabled. An existing data container is reused unmodified. A creation
/// failure is a [`DockhandError::DataContainer`] error; callers must not
/// start or exec the dependent service container when it is returned.
///
/// ## Arguments
///
/// * `runtime` - The container runtime to provision through
/// * `config` - The unit whose data container is needed
pub async fn ensure_data<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    config: &ServiceConfig,
) -> DockhandResult<Option<String>> {
    if !config.get_auto_data() {
        return Ok(None);
    }

    let data_name = naming::container_name(ContainerRole::Data, config.get_name());

    if naming::exists(runtime, &data_name).await? {
        tracing::debug!("data container {} already exists, reusing", data_name);
        return Ok(Some(data_name));
    }

    create_data_container(runtime, config)
        .await
        .map_err(|e| DockhandError::DataContainer {
            name: data_name.clone(),
            source: Box::new(e),
        })?;

    Ok(Some(data_name))
}

/// Creates the data container for `config`, unconditionally.
///
/// The container is left in the created state; data containers are never
/// started. Callers wanting strict-create semantics check for occupancy
/// first; callers wanting reuse go through [`ensure_data`].
pub(crate) async fn create_data_container<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    config: &ServiceConfig,
) -> DockhandResult<String> {
    let data_name = naming::container_name(ContainerRole::Data, config.get_name());

    let spec = ContainerSpec::builder()
        .name(data_name.clone())
        .image(env::get_data_image())
        // never started; the command only has to resolve at create time
        .command(vec!["true".to_string()])
        .binds(
            config
                .get_volumes()
                .iter()
                .map(|mount| mount.to_string())
                .collect(),
        )
        .labels(naming::labels(ContainerRole::Data, config.get_name()))
        .build();

    runtime.create(&spec).await?;
    tracing::info!("created data container {}", data_name);

    Ok(data_name)
}
