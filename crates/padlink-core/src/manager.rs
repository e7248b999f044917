// ── Manager ──
//
// Aggregate of the device registry, the endpoint registry, and the status
// stream. Every user action and device-layer event passes through here
// exactly once; this is where registry outcomes become status entries.
//
// Nothing in this module is async. Transport calls are planned here
// (`ConnectTicket`) and executed by the controller, whose results come back
// through `resolve_connect` / `record_probe` / `record_maintenance`.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::error::CoreError;
use crate::model::{Device, EndpointAddress, EntityId, LogEntry, LogLevel, SoftwareEndpoint};
use crate::registry::{
    ConnectDisposition, DeviceRegistry, Disconnected, EndpointRegistry, RegisterOutcome,
    Resolution,
};
use crate::status::StatusStream;
use crate::store::persist::StateFile;
use crate::transport::{DeviceEvent, ProbeOutcome};

/// Outbound maintenance command sent to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceOp {
    Calibrate,
    Backup,
    Restore,
}

impl MaintenanceOp {
    fn done(self) -> &'static str {
        match self {
            Self::Calibrate => "calibrated",
            Self::Backup => "backed up",
            Self::Restore => "restored from backup",
        }
    }
}

impl fmt::Display for MaintenanceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Calibrate => "calibration",
            Self::Backup => "backup",
            Self::Restore => "restore",
        })
    }
}

pub struct Manager {
    config: ManagerConfig,
    devices: DeviceRegistry,
    endpoints: EndpointRegistry,
    status: StatusStream,
}

impl Manager {
    /// An empty, in-memory manager.
    pub fn new(config: ManagerConfig) -> Self {
        let status = StatusStream::new(config.log_capacity);
        Self {
            config,
            devices: DeviceRegistry::new(),
            endpoints: EndpointRegistry::new(),
            status,
        }
    }

    /// Build a manager from the configured state file, if any.
    pub fn load(config: ManagerConfig) -> Result<Self, CoreError> {
        let state = match &config.state_file {
            Some(path) => StateFile::load_or_default(path)?,
            None => StateFile::default(),
        };
        let mut manager = Self::new(config);
        manager.restore(state);
        Ok(manager)
    }

    fn restore(&mut self, state: StateFile) {
        let devices = state.devices.len();
        for device in state.devices {
            self.devices.restore(device);
        }
        let mut endpoints = 0_usize;
        for endpoint in state.endpoints {
            if self.endpoints.restore(endpoint) {
                endpoints += 1;
            }
        }
        self.endpoints.reserve_ids_from(state.next_endpoint_id);

        let skip = state.log.len().saturating_sub(self.status.capacity());
        for entry in state.log.into_iter().skip(skip) {
            self.status.push(entry);
        }
        info!(devices, endpoints, "state restored");
    }

    /// Everything that survives a restart.
    pub fn to_state(&self) -> StateFile {
        StateFile {
            devices: self
                .devices
                .list_devices()
                .into_iter()
                .map(|mut d| {
                    d.editing = false;
                    d
                })
                .collect(),
            endpoints: self
                .endpoints
                .list_endpoints()
                .into_iter()
                .map(|mut e| {
                    e.connected = false;
                    e.pending = None;
                    e
                })
                .collect(),
            next_endpoint_id: self.endpoints.next_id(),
            log: self.status.entries().cloned().collect(),
            ..StateFile::default()
        }
    }

    /// Write state to the configured file. A no-op for in-memory managers.
    pub fn save(&self) -> Result<(), CoreError> {
        match &self.config.state_file {
            Some(path) => self.to_state().save(path),
            None => Ok(()),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    pub fn status(&self) -> &StatusStream {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusStream {
        &mut self.status
    }

    /// Append a free-form status entry.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) -> LogEntry {
        self.status.append(level, message)
    }

    // ── Device actions ───────────────────────────────────────────────

    pub fn select_device(&mut self, id: &EntityId) -> Option<Device> {
        self.devices.select_device(id)
    }

    pub fn begin_rename(&mut self, id: &EntityId) -> Result<Device, CoreError> {
        self.devices.begin_rename(id)
    }

    pub fn commit_rename(&mut self, id: &EntityId, new_name: &str) -> Result<Device, CoreError> {
        let renamed = self.devices.commit_rename(id, new_name)?;
        if renamed.previous != renamed.device.name {
            self.log(
                LogLevel::Success,
                format!(
                    "Device \"{}\" renamed to \"{}\"",
                    renamed.previous, renamed.device.name
                ),
            );
        }
        Ok(renamed.device)
    }

    pub fn cancel_rename(&mut self, id: &EntityId) -> Result<bool, CoreError> {
        self.devices.cancel_rename(id)
    }

    pub fn unregister_device(&mut self, id: &EntityId) -> Result<Device, CoreError> {
        let device = self.devices.unregister_device(id)?;
        self.log(LogLevel::Info, format!("{} unregistered", device.label()));
        Ok(device)
    }

    /// Apply a report from the driver layer. Returns the affected device as
    /// it looks afterwards (or as it looked when removed).
    pub fn apply_device_event(&mut self, event: DeviceEvent) -> Result<Device, CoreError> {
        debug!(id = %event.device_id(), ?event, "device event");
        match event {
            DeviceEvent::Discovered(registration) => {
                let previous = self
                    .devices
                    .get(&registration.id)
                    .and_then(|d| d.battery_percent);
                match self.devices.register(registration)? {
                    RegisterOutcome::Added(device) => {
                        self.log(LogLevel::Success, format!("{} connected", device.label()));
                        self.check_low_battery(&device, None);
                        Ok(device)
                    }
                    RegisterOutcome::Rejoined(device) => {
                        self.log(LogLevel::Info, format!("{} reconnected", device.label()));
                        self.check_low_battery(&device, previous);
                        Ok(device)
                    }
                }
            }
            DeviceEvent::Removed { id } => {
                let device = self.devices.unregister_device(&id)?;
                self.log(LogLevel::Warn, format!("{} disconnected", device.label()));
                Ok(device)
            }
            DeviceEvent::BatteryUpdate { id, percent } => {
                let change = self.devices.update_battery(&id, percent)?;
                self.check_low_battery(&change.device, change.previous);
                Ok(change.device)
            }
            DeviceEvent::FirmwareUpdate { id, version } => {
                let (previous, device) = self.devices.update_firmware(&id, &version)?;
                if previous != device.firmware_version {
                    self.log(
                        LogLevel::Info,
                        format!(
                            "{} firmware updated to {}",
                            device.label(),
                            device.firmware_version
                        ),
                    );
                }
                Ok(device)
            }
        }
    }

    /// Warn once when a reading crosses the threshold from above.
    fn check_low_battery(&mut self, device: &Device, previous: Option<u8>) {
        let threshold = self.config.low_battery_threshold;
        let Some(now) = device.battery_percent else {
            return;
        };
        let was_low = previous.is_some_and(|p| p <= threshold);
        if now <= threshold && !was_low {
            self.log(
                LogLevel::Warn,
                format!("{} battery low ({now}%)", device.label()),
            );
        }
    }

    /// Look up a device for an outbound maintenance command.
    pub fn device_for(&self, id: &EntityId) -> Result<Device, CoreError> {
        self.devices
            .get(id)
            .ok_or_else(|| CoreError::device_not_found(id))
    }

    /// Log the result of calibrate / backup / restore.
    pub fn record_maintenance(
        &mut self,
        id: &EntityId,
        op: MaintenanceOp,
        result: &Result<(), CoreError>,
    ) -> LogEntry {
        let label = self
            .devices
            .get(id)
            .map(|d| d.label())
            .unwrap_or_else(|| format!("Device {id}"));
        match result {
            Ok(()) => self.log(LogLevel::Success, format!("{label} {}", op.done())),
            Err(e) => {
                warn!(%id, %op, error = %e, "device command failed");
                self.log(
                    LogLevel::Error,
                    format!("{label} {op} failed: {}", failure_reason(e)),
                )
            }
        }
    }

    // ── Software actions ─────────────────────────────────────────────

    pub fn add_endpoint(
        &mut self,
        name: &str,
        host: &str,
        port: &str,
    ) -> Result<SoftwareEndpoint, CoreError> {
        let endpoint = self.endpoints.add_endpoint(name, host, port)?;
        self.log(
            LogLevel::Info,
            format!("{} added ({})", endpoint.label(), endpoint.address()),
        );
        Ok(endpoint)
    }

    /// Remove an endpoint. The caller drops any transport link for it.
    pub fn remove_endpoint(&mut self, id: &EntityId) -> Result<SoftwareEndpoint, CoreError> {
        let endpoint = self.endpoints.remove_endpoint(id)?;
        self.log(LogLevel::Info, format!("{} removed", endpoint.label()));
        Ok(endpoint)
    }

    pub fn request_connect(&mut self, id: &EntityId) -> Result<ConnectDisposition, CoreError> {
        let disposition = self.endpoints.request_connect(id)?;
        if let ConnectDisposition::Dispatch(ticket) = &disposition {
            let name = self
                .endpoints
                .get(id)
                .map(|e| e.label())
                .unwrap_or_default();
            self.log(
                LogLevel::Info,
                format!("Connecting to {name} ({})", ticket.address),
            );
        }
        Ok(disposition)
    }

    /// Apply a connect result and log it. Superseded results are dropped
    /// without a status entry.
    pub fn resolve_connect(
        &mut self,
        id: &EntityId,
        seq: u64,
        outcome: Result<Duration, CoreError>,
    ) -> Resolution {
        let resolution = self.endpoints.resolve_connect(id, seq, outcome);
        match &resolution {
            Resolution::Connected(endpoint) => {
                let latency = endpoint
                    .latency_ms
                    .map(|ms| format!(", {ms}ms"))
                    .unwrap_or_default();
                self.log(
                    LogLevel::Success,
                    format!(
                        "{} connected ({}{latency})",
                        endpoint.label(),
                        endpoint.address()
                    ),
                );
            }
            Resolution::Failed { endpoint, error } => {
                warn!(%id, seq, error = %error, "connect failed");
                self.log(
                    LogLevel::Error,
                    format!(
                        "{} connection to {} failed: {}",
                        endpoint.label(),
                        endpoint.address(),
                        failure_reason(error)
                    ),
                );
            }
            Resolution::Stale { still_wanted } => {
                warn!(%id, seq, still_wanted, "stale connect resolution discarded");
            }
            Resolution::Gone => {
                debug!(%id, seq, "connect resolved for removed endpoint");
            }
        }
        resolution
    }

    /// Give up on every connect still in flight. Used when the processor
    /// stops; the endpoints end up disconnected and idle.
    pub fn abandon_pending_connects(&mut self) -> Vec<(EntityId, u64)> {
        let abandoned = self.endpoints.abandon_pending();
        for (id, seq) in &abandoned {
            debug!(%id, seq, "abandoning connect");
            if let Some(endpoint) = self.endpoints.get(id) {
                self.log(LogLevel::Info, format!("{} connect abandoned", endpoint.label()));
            }
        }
        abandoned
    }

    pub fn request_disconnect(&mut self, id: &EntityId) -> Result<Disconnected, CoreError> {
        let result = self.endpoints.request_disconnect(id)?;
        let suffix = if result.cancelled_seq.is_some() {
            " (pending connect cancelled)"
        } else {
            ""
        };
        self.log(
            LogLevel::Info,
            format!("{} disconnected{suffix}", result.endpoint.label()),
        );
        Ok(result)
    }

    /// Validate a probe target without touching any registry.
    pub fn probe_target(&self, host: &str, port: &str) -> Result<EndpointAddress, CoreError> {
        EndpointAddress::parse(host, port)
    }

    /// Log a connection test. When the address belongs to a configured
    /// endpoint the entry names it, and a successful round-trip is stored
    /// as its latest latency. Connection flags are never touched.
    pub fn record_probe(&mut self, address: &EndpointAddress, outcome: &ProbeOutcome) -> LogEntry {
        let known = self.endpoints.find_by_address(address);
        let target = match &known {
            Some(endpoint) => format!("\"{}\" ({address})", endpoint.name),
            None => address.to_string(),
        };
        match outcome {
            ProbeOutcome::Reachable { latency_ms } => {
                if let Some(endpoint) = &known {
                    self.endpoints
                        .record_latency(&endpoint.id, Duration::from_millis(*latency_ms));
                }
                self.log(
                    LogLevel::Success,
                    format!("Connection test to {target} succeeded in {latency_ms}ms"),
                )
            }
            ProbeOutcome::Unreachable { reason } => self.log(
                LogLevel::Error,
                format!("Connection test to {target} failed: {reason}"),
            ),
        }
    }
}

/// The human part of an error, without the operation/target prefix.
fn failure_reason(error: &CoreError) -> String {
    match error {
        CoreError::Transport { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DeviceType;
    use crate::registry::DeviceRegistration;

    fn manager() -> Manager {
        Manager::new(ManagerConfig::default())
    }

    fn discovered(id: u64, name: &str, battery: Option<u8>) -> DeviceEvent {
        DeviceEvent::Discovered(DeviceRegistration {
            id: EntityId::from(id),
            name: name.into(),
            device_type: DeviceType::Gamepad,
            firmware_version: "1.0.0".into(),
            battery_percent: battery,
        })
    }

    fn levels(m: &Manager) -> Vec<LogLevel> {
        m.status().entries().map(|e| e.level).collect()
    }

    fn ticket_seq(disposition: ConnectDisposition) -> u64 {
        match disposition {
            ConnectDisposition::Dispatch(t) => t.seq,
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn rename_flow_logs_once() {
        let mut m = manager();
        m.apply_device_event(discovered(1, "Pad", Some(90))).unwrap();
        let id = EntityId::from(1_u64);

        m.begin_rename(&id).unwrap();
        let device = m.commit_rename(&id, " Stream Pad ").unwrap();

        assert_eq!(device.name, "Stream Pad");
        let last = m.status().tail(1).remove(0);
        assert_eq!(last.level, LogLevel::Success);
        assert_eq!(last.message, "Device \"Pad\" renamed to \"Stream Pad\"");
    }

    #[test]
    fn blank_rename_fails_and_keeps_name() {
        let mut m = manager();
        m.apply_device_event(discovered(1, "Pad", None)).unwrap();
        let id = EntityId::from(1_u64);
        m.begin_rename(&id).unwrap();
        let logged = m.status().len();

        for blank in ["", "   "] {
            let err = m.commit_rename(&id, blank).unwrap_err();
            assert!(matches!(err, CoreError::InvalidName { .. }));
        }
        assert_eq!(m.devices().get(&id).unwrap().name, "Pad");
        assert_eq!(m.status().len(), logged);
    }

    #[test]
    fn unregister_then_select_is_no_selection() {
        let mut m = manager();
        m.apply_device_event(discovered(1, "Pad", None)).unwrap();
        let id = EntityId::from(1_u64);
        m.select_device(&id).unwrap();

        m.unregister_device(&id).unwrap();
        assert!(m.select_device(&id).is_none());
        assert!(m.devices().selected().is_none());
        assert_eq!(
            m.status().tail(1)[0].message,
            "Device \"Pad\" unregistered"
        );
    }

    #[test]
    fn low_battery_warns_once_per_crossing() {
        let mut m = manager();
        m.apply_device_event(discovered(1, "Pad", Some(50))).unwrap();
        let id = EntityId::from(1_u64);

        for percent in [30, 20, 15, 10] {
            m.apply_device_event(DeviceEvent::BatteryUpdate {
                id: id.clone(),
                percent: Some(percent),
            })
            .unwrap();
        }
        let warns = levels(&m).into_iter().filter(|l| *l == LogLevel::Warn).count();
        assert_eq!(warns, 1);
        assert!(m.status().tail(4).iter().any(|e| e.message == "Device \"Pad\" battery low (20%)"));

        // Recharge, then drop again: a second crossing warns again.
        for percent in [80, 5] {
            m.apply_device_event(DeviceEvent::BatteryUpdate {
                id: id.clone(),
                percent: Some(percent),
            })
            .unwrap();
        }
        let warns = levels(&m).into_iter().filter(|l| *l == LogLevel::Warn).count();
        assert_eq!(warns, 2);
    }

    #[test]
    fn out_of_range_battery_is_rejected() {
        let mut m = manager();
        m.apply_device_event(discovered(1, "Pad", Some(50))).unwrap();
        let err = m
            .apply_device_event(DeviceEvent::BatteryUpdate {
                id: EntityId::from(1_u64),
                percent: Some(101),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert_eq!(
            m.devices().get(&EntityId::from(1_u64)).unwrap().battery_percent,
            Some(50)
        );
    }

    #[test]
    fn driver_removal_drops_device_with_warning() {
        let mut m = manager();
        m.apply_device_event(discovered(4, "Pedal", None)).unwrap();
        m.apply_device_event(DeviceEvent::Removed {
            id: EntityId::from(4_u64),
        })
        .unwrap();
        assert!(m.devices().is_empty());
        assert_eq!(m.status().tail(1)[0].level, LogLevel::Warn);
    }

    #[test]
    fn add_endpoint_round_trip() {
        let mut m = manager();
        m.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();

        let all = m.endpoints().list_endpoints();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "OBS");
        assert_eq!(all[0].host, "127.0.0.1");
        assert_eq!(all[0].port, 4455);
        assert!(!all[0].connected);
    }

    #[test]
    fn invalid_endpoint_mutates_nothing() {
        let mut m = manager();
        let err = m.add_endpoint("OBS", "127.0.0.1", "70000").unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert!(m.endpoints().is_empty());
        assert!(m.status().is_empty());
    }

    #[test]
    fn failed_connect_logs_error_and_stays_disconnected() {
        let mut m = manager();
        let endpoint = m.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let seq = ticket_seq(m.request_connect(&endpoint.id).unwrap());

        let err = CoreError::transport("connect", endpoint.address(), "connection refused");
        let resolution = m.resolve_connect(&endpoint.id, seq, Err(err));

        assert!(matches!(resolution, Resolution::Failed { .. }));
        let now = m.endpoints().get(&endpoint.id).unwrap();
        assert!(!now.connected);
        assert!(!now.is_pending());
        let last = m.status().tail(1).remove(0);
        assert_eq!(last.level, LogLevel::Error);
        assert!(last.message.contains("OBS"));
        assert!(last.message.ends_with("connection refused"));
    }

    #[test]
    fn connect_on_connected_endpoint_is_noop() {
        let mut m = manager();
        let endpoint = m.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let seq = ticket_seq(m.request_connect(&endpoint.id).unwrap());
        m.resolve_connect(&endpoint.id, seq, Ok(Duration::from_millis(3)));
        let before = m.endpoints().get(&endpoint.id).unwrap();
        let logged = m.status().len();

        let again = m.request_connect(&endpoint.id).unwrap();

        assert_eq!(again, ConnectDisposition::AlreadyConnected);
        assert_eq!(m.endpoints().get(&endpoint.id).unwrap(), before);
        assert_eq!(m.status().len(), logged);
    }

    #[test]
    fn disconnect_supersedes_in_flight_connect() {
        let mut m = manager();
        let endpoint = m.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let seq = ticket_seq(m.request_connect(&endpoint.id).unwrap());

        let disconnected = m.request_disconnect(&endpoint.id).unwrap();
        assert_eq!(disconnected.cancelled_seq, Some(seq));

        let late = m.resolve_connect(&endpoint.id, seq, Ok(Duration::from_millis(1)));
        assert_eq!(late, Resolution::Stale { still_wanted: false });
        assert!(!m.endpoints().get(&endpoint.id).unwrap().connected);
    }

    #[test]
    fn unreachable_probe_names_known_endpoint() {
        let mut m = manager();
        m.add_endpoint("Test", "10.0.0.5", "9999").unwrap();
        let address = m.probe_target("10.0.0.5", "9999").unwrap();

        let entry = m.record_probe(
            &address,
            &ProbeOutcome::Unreachable {
                reason: "timed out after 2000ms".into(),
            },
        );

        assert_eq!(entry.level, LogLevel::Error);
        assert!(entry.message.contains("Test"));
        assert!(!m.endpoints().list_endpoints()[0].connected);
    }

    #[test]
    fn reachable_probe_records_latency() {
        let mut m = manager();
        let endpoint = m.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let address = endpoint.address();

        m.record_probe(&address, &ProbeOutcome::Reachable { latency_ms: 7 });

        let now = m.endpoints().get(&endpoint.id).unwrap();
        assert_eq!(now.latency_ms, Some(7));
        assert!(!now.connected);
    }

    #[test]
    fn maintenance_results_are_logged() {
        let mut m = manager();
        m.apply_device_event(discovered(1, "Pad", None)).unwrap();
        let id = EntityId::from(1_u64);

        let ok = m.record_maintenance(&id, MaintenanceOp::Calibrate, &Ok(()));
        assert_eq!(ok.message, "Device \"Pad\" calibrated");

        let err = CoreError::transport("restore", "Device \"Pad\"", "checksum mismatch");
        let failed = m.record_maintenance(&id, MaintenanceOp::Restore, &Err(err));
        assert_eq!(failed.level, LogLevel::Error);
        assert_eq!(failed.message, "Device \"Pad\" restore failed: checksum mismatch");
    }

    #[test]
    fn state_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = ManagerConfig {
            state_file: Some(dir.path().join("state.json")),
            ..ManagerConfig::default()
        };

        let mut m = Manager::load(config.clone()).unwrap();
        m.apply_device_event(discovered(1, "Pad", Some(60))).unwrap();
        let obs = m.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let removed = m.add_endpoint("Old", "127.0.0.1", "4456").unwrap();
        m.remove_endpoint(&removed.id).unwrap();
        let seq = ticket_seq(m.request_connect(&obs.id).unwrap());
        m.resolve_connect(&obs.id, seq, Ok(Duration::from_millis(2)));
        m.save().unwrap();

        let mut reloaded = Manager::load(config).unwrap();
        assert_eq!(reloaded.devices().len(), 1);
        let endpoints = reloaded.endpoints().list_endpoints();
        assert_eq!(endpoints.len(), 1);
        assert!(!endpoints[0].connected);
        assert_eq!(reloaded.status().len(), m.status().len());

        // Ids of removed endpoints are not handed out again.
        let fresh = reloaded.add_endpoint("New", "127.0.0.1", "4457").unwrap();
        assert_eq!(fresh.id, EntityId::from(3_u64));
    }

    #[test]
    fn invalid_stored_records_are_repaired_or_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{
                "endpoints": [
                    {"id": 1, "name": "", "host": "", "port": 0},
                    {"id": 2, "name": "  ", "host": "localhost", "port": 4455}
                ],
                "devices": [
                    {"id": 1, "name": "   ", "device_type": "Pedal"}
                ]
            }"#,
        )
        .unwrap();
        let config = ManagerConfig {
            state_file: Some(path),
            ..ManagerConfig::default()
        };

        let mut m = Manager::load(config).unwrap();
        let endpoints = m.endpoints().list_endpoints();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].id, EntityId::from(2_u64));
        assert_eq!(endpoints[0].name, "localhost:4455");
        assert_eq!(m.devices().list_devices()[0].name, "Pedal 1");

        let fresh = m.add_endpoint("New", "127.0.0.1", "4457").unwrap();
        assert_eq!(fresh.id, EntityId::from(3_u64));
    }
}
