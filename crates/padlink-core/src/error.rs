// ── Core error types ──
//
// User-facing errors from padlink-core. Transport and driver failures are
// folded into `Transport` so consumers never see raw socket errors.
// No variant is fatal: the manager stays usable after any of them.

use std::path::Path;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Lookup errors ────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Validation errors ────────────────────────────────────────────
    #[error("Invalid name: {reason}")]
    InvalidName { reason: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    // ── External collaborator errors ─────────────────────────────────
    #[error("{operation} failed for {target}: {reason}")]
    Transport {
        operation: String,
        target: String,
        reason: String,
    },

    // ── Persistence ──────────────────────────────────────────────────
    #[error("State file {path}: {reason}")]
    Persistence { path: String, reason: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Controller is not running")]
    ControllerStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn device_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "device".into(),
            identifier: id.to_string(),
        }
    }

    pub(crate) fn endpoint_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "endpoint".into(),
            identifier: id.to_string(),
        }
    }

    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(
        operation: &str,
        target: impl ToString,
        reason: impl ToString,
    ) -> Self {
        Self::Transport {
            operation: operation.into(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn persistence(path: &Path, reason: impl ToString) -> Self {
        Self::Persistence {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from an external collaborator rather than
    /// from validating the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
