// ── Hardware driver layer ──
//
// Inbound: the driver reports devices appearing, leaving, and their
// battery/firmware readings as `DeviceEvent`s. Outbound: maintenance
// commands (calibrate, backup, restore) go through `DeviceLink`.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{Device, DeviceType, EntityId};
use crate::registry::DeviceRegistration;

/// Report from the driver layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A device was paired or came back online.
    Discovered(DeviceRegistration),
    /// The driver lost the device for good.
    Removed { id: EntityId },
    BatteryUpdate { id: EntityId, percent: Option<u8> },
    FirmwareUpdate { id: EntityId, version: String },
}

impl DeviceEvent {
    pub fn device_id(&self) -> &EntityId {
        match self {
            Self::Discovered(reg) => &reg.id,
            Self::Removed { id }
            | Self::BatteryUpdate { id, .. }
            | Self::FirmwareUpdate { id, .. } => id,
        }
    }
}

/// Opaque device settings blob produced by [`DeviceLink::backup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBackup {
    pub device_id: EntityId,
    pub device_type: DeviceType,
    pub firmware_version: String,
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Outbound maintenance commands to a physical device.
pub trait DeviceLink: Send + Sync {
    fn calibrate(&self, device: &Device) -> BoxFuture<'static, Result<(), CoreError>>;

    fn backup(&self, device: &Device) -> BoxFuture<'static, Result<DeviceBackup, CoreError>>;

    fn restore(
        &self,
        device: &Device,
        backup: &DeviceBackup,
    ) -> BoxFuture<'static, Result<(), CoreError>>;
}

/// Driver stand-in that acknowledges every command locally.
///
/// Backups carry the device's own metadata; restores only check that the
/// blob was taken from the same kind of device.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackDeviceLink;

impl DeviceLink for LoopbackDeviceLink {
    fn calibrate(&self, device: &Device) -> BoxFuture<'static, Result<(), CoreError>> {
        tracing::debug!(id = %device.id, "loopback calibrate");
        futures::future::ready(Ok(())).boxed()
    }

    fn backup(&self, device: &Device) -> BoxFuture<'static, Result<DeviceBackup, CoreError>> {
        let backup = DeviceBackup {
            device_id: device.id.clone(),
            device_type: device.device_type,
            firmware_version: device.firmware_version.clone(),
            taken_at: Utc::now(),
            settings: serde_json::json!({ "name": device.name }),
        };
        futures::future::ready(Ok(backup)).boxed()
    }

    fn restore(
        &self,
        device: &Device,
        backup: &DeviceBackup,
    ) -> BoxFuture<'static, Result<(), CoreError>> {
        let result = if backup.device_type == device.device_type {
            Ok(())
        } else {
            Err(CoreError::transport(
                "restore",
                device.label(),
                format!(
                    "backup was taken from a {}, not a {}",
                    backup.device_type, device.device_type
                ),
            ))
        };
        futures::future::ready(result).boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn device(device_type: DeviceType) -> Device {
        Device {
            id: EntityId::from(7_u64),
            name: "Desk Pad".into(),
            device_type,
            firmware_version: "1.2.0".into(),
            battery_percent: Some(80),
            editing: false,
            registered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn backup_captures_device_metadata() {
        let pad = device(DeviceType::Gamepad);
        let backup = LoopbackDeviceLink.backup(&pad).await.unwrap();
        assert_eq!(backup.device_id, pad.id);
        assert_eq!(backup.firmware_version, "1.2.0");
        assert_eq!(backup.settings["name"], "Desk Pad");
    }

    #[tokio::test]
    async fn restore_rejects_other_device_kind() {
        let pad = device(DeviceType::Gamepad);
        let backup = LoopbackDeviceLink.backup(&pad).await.unwrap();

        let pedal = device(DeviceType::Pedal);
        let err = LoopbackDeviceLink.restore(&pedal, &backup).await.unwrap_err();
        assert!(err.is_transport());
        assert!(LoopbackDeviceLink.restore(&pad, &backup).await.is_ok());
    }

    #[test]
    fn event_wire_format_is_tagged() {
        let json = r#"{"event":"battery_update","id":3,"percent":15}"#;
        let event: DeviceEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            DeviceEvent::BatteryUpdate {
                id: EntityId::from(3_u64),
                percent: Some(15),
            }
        );
        assert_eq!(event.device_id(), &EntityId::from(3_u64));
    }
}
