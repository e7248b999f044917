// ── On-disk state ──
//
// Devices, software endpoints, and the recent status log, keyed by id.
// Every field has a default so older and newer files both load; unknown
// fields are ignored and unknown device types become `Other`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Device, LogEntry, SoftwareEndpoint};

/// Format version written by this build.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub devices: Vec<Device>,

    #[serde(default)]
    pub endpoints: Vec<SoftwareEndpoint>,

    /// Lower bound for the next endpoint id, so ids of removed endpoints
    /// are never reused.
    #[serde(default)]
    pub next_endpoint_id: u64,

    /// Recent status entries, oldest first.
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            devices: Vec::new(),
            endpoints: Vec::new(),
            next_endpoint_id: 1,
            log: Vec::new(),
        }
    }
}

impl StateFile {
    /// Read `path`. A missing file yields `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, CoreError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file yet");
                return Ok(None);
            }
            Err(e) => return Err(CoreError::persistence(path, e)),
        };

        let state: Self =
            serde_json::from_str(&raw).map_err(|e| CoreError::persistence(path, e))?;
        if state.version > STATE_VERSION {
            warn!(
                path = %path.display(),
                found = state.version,
                supported = STATE_VERSION,
                "state file written by a newer version; unknown data is ignored"
            );
        }
        Ok(Some(state))
    }

    /// Like [`load`](Self::load), but a missing file is an empty state.
    pub fn load_or_default(path: &Path) -> Result<Self, CoreError> {
        Ok(Self::load(path)?.unwrap_or_default())
    }

    /// Write atomically: serialize to a sibling temp file, then rename over
    /// `path`.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CoreError::persistence(path, e))?;
            }
        }

        let mut out = self.clone();
        out.version = STATE_VERSION;
        let json =
            serde_json::to_string_pretty(&out).map_err(|e| CoreError::persistence(path, e))?;

        let tmp = temp_path(path);
        fs::write(&tmp, json).map_err(|e| CoreError::persistence(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(CoreError::persistence(path, e));
        }
        debug!(
            path = %path.display(),
            devices = out.devices.len(),
            endpoints = out.endpoints.len(),
            "state saved"
        );
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{DeviceType, EntityId, LogLevel};

    fn sample() -> StateFile {
        StateFile {
            devices: vec![Device {
                id: EntityId::from(10_u64),
                name: "Foot Pedal Pro".into(),
                device_type: DeviceType::Pedal,
                firmware_version: "2.1.0".into(),
                battery_percent: None,
                editing: false,
                registered_at: Utc::now(),
            }],
            endpoints: vec![SoftwareEndpoint {
                id: EntityId::from(1_u64),
                name: "OBS Studio".into(),
                host: "127.0.0.1".into(),
                port: 4455,
                connected: false,
                pending: None,
                latency_ms: Some(3),
                created_at: Utc::now(),
                request_seq: 0,
            }],
            next_endpoint_id: 2,
            log: vec![LogEntry::new(LogLevel::Success, "saved")],
            ..StateFile::default()
        }
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StateFile::load(&dir.path().join("state.json")).unwrap().is_none());
        let empty = StateFile::load_or_default(&dir.path().join("state.json")).unwrap();
        assert_eq!(empty, StateFile::default());
    }

    #[test]
    fn save_then_load_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let state = sample();

        state.save(&path).unwrap();
        let loaded = StateFile::load(&path).unwrap().unwrap();

        assert_eq!(loaded, state);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn tolerates_unknown_fields_and_device_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{
                "version": 3,
                "theme_override": "neon",
                "devices": [
                    {"id": 5, "name": "Dial", "device_type": "Turntable", "extra": true}
                ]
            }"#,
        )
        .unwrap();

        let loaded = StateFile::load(&path).unwrap().unwrap();
        assert_eq!(loaded.devices.len(), 1);
        assert_eq!(loaded.devices[0].device_type, DeviceType::Other);
        assert!(loaded.endpoints.is_empty());
        assert_eq!(loaded.next_endpoint_id, 0);
    }

    #[test]
    fn corrupt_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = StateFile::load(&path).unwrap_err();
        assert!(matches!(err, CoreError::Persistence { .. }));
    }
}
