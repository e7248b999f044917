//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use padlink_config::ConfigError;
use padlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const STATE: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("{operation} failed for {target}: {reason}")]
    #[diagnostic(
        code(padlink::connection_failed),
        help(
            "Check that the software is running and accepting connections on {target}.\n\
             Try: padlink software test <host> <port>"
        )
    )]
    ConnectionFailed {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("The manager is not running")]
    #[diagnostic(
        code(padlink::stopped),
        help("The command was issued while the session was shutting down; run it again.")
    )]
    ControllerStopped,

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(padlink::not_found),
        help("Run: padlink {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(padlink::invalid_state))]
    InvalidState { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(padlink::validation))]
    Validation { field: String, reason: String },

    // ── Persistence / configuration ──────────────────────────────────

    #[error("Cannot use state file {path}: {reason}")]
    #[diagnostic(
        code(padlink::state_file),
        help("Move the file aside to start fresh, or point --state-file elsewhere.")
    )]
    Persistence { path: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(padlink::config),
        help("Run: padlink config path to locate the file, or padlink config init to reset it.")
    )]
    Config { message: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(padlink::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(padlink::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(padlink::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(padlink::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ControllerStopped => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::InvalidState { .. } | Self::ConfigExists { .. } => exit_code::STATE,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub(crate) fn not_found(resource_type: &str, identifier: &str) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: format!("{resource_type}s list"),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound {
                entity_type,
                identifier,
            } => {
                let list_command = match entity_type.as_str() {
                    "endpoint" => "software list".into(),
                    other => format!("{other}s list"),
                };
                CliError::NotFound {
                    resource_type: entity_type,
                    identifier,
                    list_command,
                }
            }

            CoreError::InvalidName { reason } => CliError::Validation {
                field: "name".into(),
                reason,
            },

            CoreError::Validation { field, reason } => CliError::Validation { field, reason },

            CoreError::InvalidState { message } => CliError::InvalidState { message },

            CoreError::Transport {
                operation,
                target,
                reason,
            } => CliError::ConnectionFailed {
                operation,
                target,
                reason,
            },

            CoreError::Persistence { path, reason } => CliError::Persistence { path, reason },

            CoreError::ControllerStopped => CliError::ControllerStopped,

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let not_found: CliError = CoreError::NotFound {
            entity_type: "endpoint".into(),
            identifier: "9".into(),
        }
        .into();
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);
        assert!(matches!(
            not_found,
            CliError::NotFound { ref list_command, .. } if list_command == "software list"
        ));

        let refused: CliError = CoreError::Transport {
            operation: "connect".into(),
            target: "127.0.0.1:4455".into(),
            reason: "connection refused".into(),
        }
        .into();
        assert_eq!(refused.exit_code(), exit_code::CONNECTION);

        let blank: CliError = CoreError::InvalidName {
            reason: "must not be empty".into(),
        }
        .into();
        assert_eq!(blank.exit_code(), exit_code::USAGE);

        let state: CliError = CoreError::InvalidState {
            message: "device 1 is not in editing mode".into(),
        }
        .into();
        assert_eq!(state.exit_code(), exit_code::STATE);
    }
}
