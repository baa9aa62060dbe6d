//! Error types for boundary operations

use thiserror::Error;

use crate::exception::{NativeError, NativeErrorKind};
use crate::ownership::Mode;

/// Main error type for bridge operations.
///
/// These are misuse and plumbing failures of the bridge itself. Failures of
/// the native computation travel as [`NativeError`] and are only turned into
/// managed exceptions at the boundary.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Operating on a handle that no longer owns anything
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The class-resolution context was never set
    #[error("Class-resolution context not set. Call set_context first.")]
    Unconfigured,

    /// A null value crossed the boundary where one is not allowed
    #[error("Null argument: {0}")]
    NullArgument(String),

    /// A value does not fit the declared storage
    #[error("Out of range: {value} does not fit in {target}")]
    OutOfRange {
        /// The offending value
        value: i64,
        /// Name of the target storage
        target: String,
    },

    /// A slot name was re-declared with another mode or value type
    #[error("Slot '{name}' is declared as {declared:?} {declared_type}, not {requested:?} {requested_type}")]
    SlotMismatch {
        /// Slot name
        name: String,
        /// Mode the slot was first declared with
        declared: Mode,
        /// Value type the slot was first declared with
        declared_type: &'static str,
        /// Mode of the conflicting request
        requested: Mode,
        /// Value type of the conflicting request
        requested_type: &'static str,
    },

    /// A scope restricted to some value types was given another type
    #[error("{type_name} is not an allowed scope type: {allowed:?}")]
    ScopeRejected {
        /// Type that was offered
        type_name: &'static str,
        /// Types the scope accepts
        allowed: Vec<&'static str>,
    },

    /// The worker thread could not be started
    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// The worker thread panicked before completing
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),

    /// A callback failed on the worker thread
    #[error("Callback failed: {0}")]
    Callback(NativeError),
}

impl BridgeError {
    /// Shorthand for an [`BridgeError::InvalidState`] with a message.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        BridgeError::InvalidState(msg.into())
    }

    /// Native kind this error surfaces as when it crosses the boundary.
    pub fn native_kind(&self) -> NativeErrorKind {
        match self {
            BridgeError::Callback(native) => native.kind().clone(),
            BridgeError::NullArgument(_) | BridgeError::ScopeRejected { .. } => {
                NativeErrorKind::InvalidArgument
            }
            BridgeError::OutOfRange { .. } => NativeErrorKind::OutOfRange,
            _ => NativeErrorKind::Runtime,
        }
    }
}

impl From<BridgeError> for NativeError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Callback(native) => native,
            other => NativeError::new(other.native_kind(), other.to_string()),
        }
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Render a panic payload as a message, if it carries one.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        Some((*s).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}
