//! `dockhand` manages the lifecycle of cooperating service and data containers
//! on a Docker-compatible runtime.
//!
//! # Overview
//!
//! dockhand works with two container roles. *Service* containers run a
//! long- or short-lived process. *Data* containers are storage-only
//! companions that exist solely to own persistent volumes; they are created
//! but never started. Every lifecycle operation composes the same few pieces:
//! deterministic naming, an auto-provisioned data-container dependency, a
//! restart-policy engine, and interactive or output-capturing command
//! execution inside new or existing containers.
//!
//! # Architecture
//!
//! - **Runtime adapter**: the [`runtime::ContainerRuntime`] trait is the only
//!   boundary to the container runtime; [`runtime::DockerRuntime`] implements
//!   it over the Docker API.
//! - **Management**: [`management::LifecycleManager`] orchestrates
//!   create/run/exec/stop/rebuild/pull/rename/remove/inspect/logs, deciding
//!   which runtime calls to issue, in what order, and under what
//!   preconditions.
//! - **Config**: resolved definitions ([`config::ServiceConfig`]), the
//!   per-operation [`config::ExecConfig`], restart policies and the typed
//!   configuration overlay.
//!
//! # Modules
//!
//! - [`config`] - Configuration types and validation
//! - [`management`] - Naming, data-container provisioning and the lifecycle manager
//! - [`runtime`] - The container runtime capability and its Docker implementation

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod config;
pub mod management;
pub mod runtime;

pub use error::*;
