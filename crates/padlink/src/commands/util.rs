//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use padlink_core::{Controller, EntityId};

use crate::error::CliError;

/// Resolve a device identifier (id or exact name, case-insensitive) to an
/// EntityId via snapshot lookup.
pub fn resolve_device_id(controller: &Controller, identifier: &str) -> Result<EntityId, CliError> {
    let snap = controller.devices_snapshot();
    let wanted = identifier.trim();
    snap.iter()
        .find(|d| d.id.to_string() == wanted)
        .or_else(|| snap.iter().find(|d| d.name.eq_ignore_ascii_case(wanted)))
        .map(|d| d.id.clone())
        .ok_or_else(|| CliError::not_found("device", identifier))
}

/// Resolve a software endpoint identifier (id or exact name,
/// case-insensitive) to an EntityId via snapshot lookup.
pub fn resolve_endpoint_id(
    controller: &Controller,
    identifier: &str,
) -> Result<EntityId, CliError> {
    let snap = controller.endpoints_snapshot();
    let wanted = identifier.trim();
    snap.iter()
        .find(|e| e.id.to_string() == wanted)
        .or_else(|| snap.iter().find(|e| e.name.eq_ignore_ascii_case(wanted)))
        .map(|e| e.id.clone())
        .ok_or_else(|| CliError::NotFound {
            resource_type: "endpoint".into(),
            identifier: identifier.into(),
            list_command: "software list".into(),
        })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.trim_end_matches('?').into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--file` flags.
pub fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "file".into(),
        reason: format!("{}: invalid JSON: {e}", path.display()),
    })
}
