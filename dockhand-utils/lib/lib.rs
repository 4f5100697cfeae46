//! `dockhand_utils` is a library containing general utilities for the dockhand project.
//!
//! It carries the constants shared between the dockhand crates (container
//! naming, labels, default images and timeouts) and small helpers for reading
//! configuration from environment variables.

#![warn(missing_docs)]

mod defaults;
pub mod env;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use defaults::*;
pub use env::*;
