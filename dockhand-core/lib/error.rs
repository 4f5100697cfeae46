//! Error types for dockhand operations.
//!
//! One taxonomy is shared by every component. Validation failures are
//! rejected before any runtime call is made; runtime failures carry the
//! operation and resolved container name they happened under; partial
//! failures of multi-step operations carry every underlying error instead of
//! downgrading to success. Presentation layers format messages from the
//! structured fields.

use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a dockhand operation.
pub type DockhandResult<T> = Result<T, DockhandError>;

/// An error from a dockhand operation.
#[derive(pretty_error_debug::Debug, Error)]
pub enum DockhandError {
    /// A name, selector or option failed validation. Nothing was sent to the
    /// runtime.
    #[error("invalid {what}: {reason}")]
    Validation {
        /// What was being validated, e.g. `"container name"`.
        what: String,

        /// Why it was rejected.
        reason: String,
    },

    /// No container matched the resolved name.
    #[error("container {name} not found during {operation}")]
    NotFound {
        /// The lifecycle operation that needed the container.
        operation: &'static str,

        /// The resolved container name.
        name: String,
    },

    /// A container already occupies the resolved name.
    #[error("container {name} already exists")]
    AlreadyExists {
        /// The resolved container name.
        name: String,
    },

    /// The container or the runtime daemon cannot be reached.
    #[error("cannot reach {name}: {reason}")]
    Connectivity {
        /// The resolved container name, or the daemon endpoint.
        name: String,

        /// Why the target is unreachable.
        reason: String,
    },

    /// The container runtime rejected or failed a call.
    #[error("runtime error during {operation} on {name}")]
    Runtime {
        /// The lifecycle operation that issued the call.
        operation: &'static str,

        /// The resolved container name the call targeted.
        name: String,

        /// The underlying runtime error, verbatim.
        #[source]
        source: anyhow::Error,
    },

    /// A command executed in a container exited with a non-zero status.
    #[error("container {name} exited with status {code}")]
    NonZeroExit {
        /// The resolved container name the command ran in.
        name: String,

        /// The exit status of the command.
        code: i64,
    },

    /// Creating the companion data container failed; the dependent service
    /// operation was not attempted.
    #[error("error creating data container {name}")]
    DataContainer {
        /// The resolved data-container name.
        name: String,

        /// The underlying creation error.
        #[source]
        source: Box<DockhandError>,
    },

    /// A multi-step operation's primary step and/or its dependent cleanup
    /// step failed; every underlying error is carried.
    #[error(
        "{operation} on {name} partially failed: {}; cleanup error: {secondary}",
        .primary.as_ref().map_or_else(|| "primary step succeeded".to_string(), |e| e.to_string())
    )]
    PartialFailure {
        /// The multi-step lifecycle operation.
        operation: &'static str,

        /// The resolved container name of the failing step.
        name: String,

        /// The primary step's error, when the primary step failed too.
        primary: Option<Box<DockhandError>>,

        /// The cleanup/secondary step's error.
        secondary: Box<DockhandError>,
    },

    /// An error writing to the caller-provided output sink.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An error serializing inspect output.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl DockhandError {
    /// Creates a validation error.
    pub fn validation(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Creates a runtime error carrying the operation and resolved name.
    pub fn runtime(
        operation: &'static str,
        name: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Runtime {
            operation,
            name: name.into(),
            source: source.into(),
        }
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is an already-exists error.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
