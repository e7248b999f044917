// ── Typed request structs for Command payloads ──

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{DeviceType, EntityId};
use crate::registry::DeviceRegistration;

// ── Software ───────────────────────────────────────────────────────

/// Raw "add new connection" form input. Validation happens in the
/// registry so that malformed input is reported field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddEndpointRequest {
    pub name: String,
    pub host: String,
    pub port: String,
}

// ── Devices ────────────────────────────────────────────────────────

/// Manual pairing, for devices the driver layer cannot discover itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairDeviceRequest {
    /// Generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    pub device_type: DeviceType,
    #[serde(default)]
    pub firmware_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<u8>,
}

impl From<PairDeviceRequest> for DeviceRegistration {
    fn from(req: PairDeviceRequest) -> Self {
        Self {
            id: req.id.unwrap_or_else(|| EntityId::Uuid(Uuid::new_v4())),
            name: req.name,
            device_type: req.device_type,
            firmware_version: req.firmware_version,
            battery_percent: req.battery_percent,
        }
    }
}
