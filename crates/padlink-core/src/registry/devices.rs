// ── Device registry ──
//
// Owns every paired device plus the two pieces of view state that span
// devices: the current selection and the single editing slot. At most one
// device is ever in editing mode because there is only one slot.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::device::{normalize_name, validate_battery};
use crate::model::{Device, DeviceType, EntityId};
use crate::store::collection::EntityCollection;

/// Snapshot type published to subscribers.
pub type DeviceSnapshot = Arc<Vec<Arc<Device>>>;

/// What the device layer reports when a device joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub device_type: DeviceType,
    #[serde(default)]
    pub firmware_version: String,
    #[serde(default)]
    pub battery_percent: Option<u8>,
}

/// Result of [`DeviceRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// First time this id was seen.
    Added(Device),
    /// A known device re-joined; firmware and battery were refreshed, the
    /// user-chosen name was kept.
    Rejoined(Device),
}

impl RegisterOutcome {
    pub fn device(&self) -> &Device {
        match self {
            Self::Added(d) | Self::Rejoined(d) => d,
        }
    }
}

/// Result of a successful rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub previous: String,
    pub device: Device,
}

/// Result of a battery update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryChange {
    pub previous: Option<u8>,
    pub device: Device,
}

pub struct DeviceRegistry {
    devices: EntityCollection<Device>,
    editing: Option<EntityId>,
    selected: Option<EntityId>,
    snapshot: watch::Sender<DeviceSnapshot>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            devices: EntityCollection::new(),
            editing: None,
            selected: None,
            snapshot,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// All devices in registration order.
    pub fn list_devices(&self) -> Vec<Device> {
        self.devices.values().map(|d| self.materialize(d)).collect()
    }

    pub fn get(&self, id: &EntityId) -> Option<Device> {
        self.devices.get(id).map(|d| self.materialize(d))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.devices.contains(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id of the device currently in editing mode, if any.
    pub fn editing_id(&self) -> Option<&EntityId> {
        self.editing.as_ref()
    }

    /// The selected device, or `None` when nothing (or something since
    /// removed) was selected.
    pub fn selected(&self) -> Option<Device> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    /// Monotonic counter bumped on every stored change.
    pub fn revision(&self) -> u64 {
        self.devices.version()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceSnapshot> {
        self.snapshot.subscribe()
    }

    // ── View actions ─────────────────────────────────────────────────

    /// Make `id` the viewed device. An unknown id clears the selection and
    /// yields `None` rather than an error.
    pub fn select_device(&mut self, id: &EntityId) -> Option<Device> {
        let found = self.get(id);
        self.selected = found.as_ref().map(|d| d.id.clone());
        found
    }

    /// Enter editing mode on `id`, leaving it on every other device.
    pub fn begin_rename(&mut self, id: &EntityId) -> Result<Device, CoreError> {
        if !self.devices.contains(id) {
            return Err(CoreError::device_not_found(id));
        }
        if let Some(previous) = self.editing.replace(id.clone()) {
            if &previous != id {
                debug!(%previous, next = %id, "editing slot moved");
            }
        }
        self.publish();
        self.get(id).ok_or_else(|| CoreError::device_not_found(id))
    }

    /// Store a new name and leave editing mode.
    ///
    /// A blank name fails with [`CoreError::InvalidName`] and leaves both the
    /// name and editing mode untouched.
    pub fn commit_rename(&mut self, id: &EntityId, new_name: &str) -> Result<Renamed, CoreError> {
        let current = self
            .devices
            .get(id)
            .ok_or_else(|| CoreError::device_not_found(id))?;
        let name = normalize_name(new_name)?;
        if self.editing.as_ref() != Some(id) {
            return Err(CoreError::InvalidState {
                message: format!("device {id} is not in editing mode"),
            });
        }

        let previous = current.name.clone();
        self.editing = None;
        let updated = self
            .devices
            .update(id, |d| d.name = name)
            .ok_or_else(|| CoreError::device_not_found(id))?;
        self.publish();

        Ok(Renamed {
            previous,
            device: self.materialize(&updated),
        })
    }

    /// Leave editing mode without renaming. Returns whether `id` was editing.
    pub fn cancel_rename(&mut self, id: &EntityId) -> Result<bool, CoreError> {
        if !self.devices.contains(id) {
            return Err(CoreError::device_not_found(id));
        }
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
            self.publish();
            return Ok(true);
        }
        Ok(false)
    }

    /// Remove a device on user request. Clears editing and selection when
    /// they pointed at it.
    pub fn unregister_device(&mut self, id: &EntityId) -> Result<Device, CoreError> {
        let removed = self
            .devices
            .remove(id)
            .ok_or_else(|| CoreError::device_not_found(id))?;
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
        }
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        self.publish();

        let mut device = Device::clone(&removed);
        device.editing = false;
        Ok(device)
    }

    // ── Device-layer events ──────────────────────────────────────────

    /// Add a newly discovered device, or refresh a known one.
    pub fn register(&mut self, registration: DeviceRegistration) -> Result<RegisterOutcome, CoreError> {
        let battery = validate_battery(registration.battery_percent)?;
        let id = registration.id;

        if self.devices.contains(&id) {
            let firmware = registration.firmware_version;
            let updated = self
                .devices
                .update(&id, |d| {
                    d.firmware_version = firmware;
                    d.battery_percent = battery;
                })
                .ok_or_else(|| CoreError::device_not_found(&id))?;
            self.publish();
            return Ok(RegisterOutcome::Rejoined(self.materialize(&updated)));
        }

        let name = normalize_name(&registration.name)
            .unwrap_or_else(|_| format!("{} {id}", registration.device_type));
        let device = Device {
            id: id.clone(),
            name,
            device_type: registration.device_type,
            firmware_version: registration.firmware_version,
            battery_percent: battery,
            editing: false,
            registered_at: Utc::now(),
        };
        self.devices.upsert(id, device.clone());
        self.publish();
        Ok(RegisterOutcome::Added(device))
    }

    /// Restore a persisted device. Editing mode never survives a restart,
    /// and a blank name is replaced the same way registration does it.
    pub(crate) fn restore(&mut self, mut device: Device) {
        device.editing = false;
        match normalize_name(&device.name) {
            Ok(name) => device.name = name,
            Err(e) => {
                warn!(id = %device.id, error = %e, "stored device has no usable name");
                device.name = format!("{} {}", device.device_type, device.id);
            }
        }
        if device.battery_percent.is_some_and(|p| p > 100) {
            device.battery_percent = Some(100);
        }
        self.devices.upsert(device.id.clone(), device);
        self.publish();
    }

    pub fn update_battery(
        &mut self,
        id: &EntityId,
        percent: Option<u8>,
    ) -> Result<BatteryChange, CoreError> {
        let percent = validate_battery(percent)?;
        let previous = self
            .devices
            .get(id)
            .ok_or_else(|| CoreError::device_not_found(id))?
            .battery_percent;
        let updated = self
            .devices
            .update(id, |d| d.battery_percent = percent)
            .ok_or_else(|| CoreError::device_not_found(id))?;
        self.publish();
        Ok(BatteryChange {
            previous,
            device: self.materialize(&updated),
        })
    }

    /// Returns the previous firmware version.
    pub fn update_firmware(
        &mut self,
        id: &EntityId,
        version: &str,
    ) -> Result<(String, Device), CoreError> {
        let version = version.trim();
        if version.is_empty() {
            return Err(CoreError::validation("firmware_version", "must not be empty"));
        }
        let previous = self
            .devices
            .get(id)
            .ok_or_else(|| CoreError::device_not_found(id))?
            .firmware_version
            .clone();
        let updated = self
            .devices
            .update(id, |d| d.firmware_version = version.to_owned())
            .ok_or_else(|| CoreError::device_not_found(id))?;
        self.publish();
        Ok((previous, self.materialize(&updated)))
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn materialize(&self, device: &Arc<Device>) -> Device {
        let mut out = Device::clone(device);
        out.editing = self.editing.as_ref() == Some(&device.id);
        out
    }

    fn publish(&self) {
        let values: Vec<Arc<Device>> = self
            .devices
            .values()
            .map(|d| Arc::new(self.materialize(d)))
            .collect();
        // `send_replace` updates unconditionally, even with zero receivers.
        self.snapshot.send_replace(Arc::new(values));
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
