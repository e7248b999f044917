// ── Runtime manager configuration ──
//
// Tuning knobs for the manager and its transports. The config crate builds
// one of these from TOML + env and hands it in; core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

/// Default number of status entries retained.
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Default battery percentage at or below which a WARN entry is emitted.
pub const DEFAULT_LOW_BATTERY_THRESHOLD: u8 = 20;

/// Configuration for a single manager instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Maximum number of entries kept by the status stream.
    pub log_capacity: usize,
    /// Upper bound on a software connect attempt.
    pub connect_timeout: Duration,
    /// Upper bound on a connection test.
    pub probe_timeout: Duration,
    /// Battery level that triggers a low-battery warning.
    pub low_battery_threshold: u8,
    /// Where device and endpoint state is persisted. `None` keeps everything
    /// in memory.
    pub state_file: Option<PathBuf>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            connect_timeout: Duration::from_secs(3),
            probe_timeout: Duration::from_secs(2),
            low_battery_threshold: DEFAULT_LOW_BATTERY_THRESHOLD,
            state_file: None,
        }
    }
}
