//! Default values and constants shared across the dockhand project.

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Prefix applied to the name of every container dockhand manages.
pub const CONTAINER_NAME_PREFIX: &str = "dockhand";

/// Label carrying the logical unit name on managed containers.
pub const NAME_LABEL: &str = "dockhand.name";

/// Label carrying the container role (`service` or `data`) on managed containers.
pub const ROLE_LABEL: &str = "dockhand.role";

/// Image used for auto-provisioned data containers.
///
/// Data containers never run a process; the image only needs to exist and
/// carry a filesystem for the volumes it owns.
pub const DEFAULT_DATA_IMAGE: &str = "busybox:stable";

/// Seconds a graceful stop waits before the runtime kills the process.
pub const DEFAULT_STOP_TIMEOUT_SECS: u32 = 10;

/// Tail value that fetches a container's entire log.
pub const LOG_TAIL_ALL: &str = "all";
