// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;
use crate::error::CoreError;

/// Hardware category. Fixed once a device is registered.
///
/// Unknown tags in persisted state decode as [`DeviceType::Other`] so that
/// files written by newer builds still load.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum DeviceType {
    Gamepad,
    Pedal,
    Keyboard,
    Mixer,
    #[serde(other)]
    Other,
}

/// A paired hardware peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: EntityId,
    pub name: String,
    pub device_type: DeviceType,

    /// Reported by the device layer; read-only to views.
    #[serde(default)]
    pub firmware_version: String,

    /// `None` for mains-powered devices.
    #[serde(default)]
    pub battery_percent: Option<u8>,

    /// Materialized from the registry's single editing slot on every read.
    #[serde(default)]
    pub editing: bool,

    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
}

impl Device {
    pub fn is_battery_powered(&self) -> bool {
        self.battery_percent.is_some()
    }

    /// Label used in status messages: `Device "Foot Pedal Pro"`.
    pub fn label(&self) -> String {
        format!("Device \"{}\"", self.name)
    }
}

/// Trim a proposed display name, rejecting blank input.
pub fn normalize_name(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidName {
            reason: "name must not be empty".into(),
        });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(CoreError::InvalidName {
            reason: "name must not contain control characters".into(),
        });
    }
    Ok(trimmed.to_owned())
}

/// Check that a battery reading is a percentage.
pub fn validate_battery(percent: Option<u8>) -> Result<Option<u8>, CoreError> {
    match percent {
        Some(p) if p > 100 => Err(CoreError::validation(
            "battery_percent",
            format!("{p} is outside 0..=100"),
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn device_type_parses_case_insensitively() {
        assert_eq!("gamepad".parse::<DeviceType>().unwrap(), DeviceType::Gamepad);
        assert_eq!("MIXER".parse::<DeviceType>().unwrap(), DeviceType::Mixer);
    }

    #[test]
    fn unknown_device_type_decodes_as_other() {
        let t: DeviceType = serde_json::from_str("\"Turntable\"").unwrap();
        assert_eq!(t, DeviceType::Other);
    }

    #[test]
    fn normalize_name_trims() {
        assert_eq!(normalize_name("  Foot Pedal  ").unwrap(), "Foot Pedal");
    }

    #[test]
    fn normalize_name_rejects_blank() {
        assert!(matches!(
            normalize_name("   "),
            Err(CoreError::InvalidName { .. })
        ));
        assert!(matches!(normalize_name(""), Err(CoreError::InvalidName { .. })));
    }

    #[test]
    fn battery_above_hundred_is_rejected() {
        assert!(validate_battery(Some(101)).is_err());
        assert_eq!(validate_battery(Some(100)).unwrap(), Some(100));
        assert_eq!(validate_battery(None).unwrap(), None);
    }
}
