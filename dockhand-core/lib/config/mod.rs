//! Configuration types and helpers.

mod exec;
mod merge;
mod port_mapping;
mod restart;
mod service;
mod volume_mount;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use exec::*;
pub use merge::*;
pub use port_mapping::*;
pub use restart::*;
pub use service::*;
pub use volume_mount::*;
