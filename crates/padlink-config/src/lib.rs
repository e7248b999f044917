//! Shared configuration for the padlink binary.
//!
//! TOML defaults and application settings, file location via platform
//! conventions, and translation to `padlink_core::ManagerConfig`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use padlink_core::ManagerConfig;
use padlink_core::config::{DEFAULT_LOG_CAPACITY, DEFAULT_LOW_BATTERY_THRESHOLD};

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "PADLINK_CONFIG";

/// Overrides the persisted state file location.
pub const STATE_FILE_ENV: &str = "PADLINK_STATE_FILE";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Manager and output defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Application settings shown in the settings view.
    #[serde(default)]
    pub app: AppSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Number of status entries retained.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default = "default_low_battery_threshold")]
    pub low_battery_threshold: u8,

    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Persisted state location. Falls back to `state.json` in the
    /// platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            connect_timeout_ms: default_connect_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            low_battery_threshold: default_low_battery_threshold(),
            output: default_output(),
            color: default_color(),
            state_file: None,
        }
    }
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}
fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_probe_timeout_ms() -> u64 {
    2000
}
fn default_low_battery_threshold() -> u8 {
    DEFAULT_LOW_BATTERY_THRESHOLD
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// Settings-view preferences. Stored only; nothing registers with the OS.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppSettings {
    /// Launch with the OS.
    #[serde(default = "default_autostart")]
    pub autostart: bool,

    #[serde(default)]
    pub theme: Theme,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            autostart: default_autostart(),
            theme: Theme::default(),
        }
    }
}

fn default_autostart() -> bool {
    true
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "padlink", "padlink")
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("padlink");
    p
}

/// Resolve the config file path: `PADLINK_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Resolve the persisted state path.
///
/// `PADLINK_STATE_FILE` wins over the configured `state_file`, which wins
/// over `state.json` in the platform data dir.
pub fn state_path(cfg: &Config) -> PathBuf {
    if let Some(path) = std::env::var_os(STATE_FILE_ENV) {
        return PathBuf::from(path);
    }
    if let Some(ref path) = cfg.defaults.state_file {
        return path.clone();
    }
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("state.json"),
        |dirs| dirs.data_dir().join("state.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path`, then `PADLINK_*` env vars
/// (`PADLINK_DEFAULTS__LOG_CAPACITY=100`), and validate the result.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PADLINK_").split("__"));

    let config: Config = figment.extract()?;
    validate(&config)?;
    Ok(config)
}

/// Load config, returning a default if it is missing or unusable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let d = &cfg.defaults;
    if d.log_capacity == 0 {
        return Err(invalid("log_capacity", "must be greater than 0"));
    }
    if d.low_battery_threshold > 100 {
        return Err(invalid(
            "low_battery_threshold",
            format!("must be at most 100, got {}", d.low_battery_threshold),
        ));
    }
    if d.connect_timeout_ms == 0 {
        return Err(invalid("connect_timeout_ms", "must be greater than 0"));
    }
    if d.probe_timeout_ms == 0 {
        return Err(invalid("probe_timeout_ms", "must be greater than 0"));
    }
    Ok(())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    validate(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build core's `ManagerConfig`, with state persisted at [`state_path`].
pub fn to_manager_config(cfg: &Config) -> ManagerConfig {
    let d = &cfg.defaults;
    ManagerConfig {
        log_capacity: d.log_capacity,
        connect_timeout: Duration::from_millis(d.connect_timeout_ms),
        probe_timeout: Duration::from_millis(d.probe_timeout_ms),
        low_battery_threshold: d.low_battery_threshold,
        state_file: Some(state_path(cfg)),
    }
}

// ── Version check ───────────────────────────────────────────────────

/// Running version compared with the newest published one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VersionStatus {
    UpToDate { current: String },
    UpdateAvailable { current: String, latest: String },
    /// Running a build newer than anything published.
    Ahead { current: String, latest: String },
}

impl VersionStatus {
    pub fn check(current: &str, latest: &str) -> Result<Self, ConfigError> {
        let ord = compare_versions(current, latest)?;
        let current = current.trim().to_owned();
        let latest = latest.trim().to_owned();
        Ok(match ord {
            Ordering::Less => Self::UpdateAvailable { current, latest },
            Ordering::Equal => Self::UpToDate { current },
            Ordering::Greater => Self::Ahead { current, latest },
        })
    }

    pub fn update_available(&self) -> bool {
        matches!(self, Self::UpdateAvailable { .. })
    }
}

fn parse_version(raw: &str) -> Result<Vec<u64>, ConfigError> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    // Pre-release and build suffixes are ignored.
    let core = bare.split(['-', '+']).next().unwrap_or_default();
    if core.is_empty() {
        return Err(invalid("version", format!("'{raw}' is empty")));
    }
    core.split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| invalid("version", format!("'{raw}' is not a dotted number")))
        })
        .collect()
}

/// Compare two dotted numeric versions; missing components count as 0.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, ConfigError> {
    let a = parse_version(a)?;
    let b = parse_version(b)?;
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => {}
            other => return Ok(other),
        }
    }
    Ok(Ordering::Equal)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.app.autostart);
        assert_eq!(cfg.app.theme, Theme::System);
        assert_eq!(cfg.defaults.log_capacity, 500);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[defaults]\nlog_capacity = 50\n\n[app]\ntheme = \"dark\"\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.log_capacity, 50);
        assert_eq!(cfg.defaults.connect_timeout_ms, 3000);
        assert_eq!(cfg.app.theme, Theme::Dark);
        assert!(cfg.app.autostart);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\nlow_battery_threshold = 150\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "low_battery_threshold"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.app.autostart = false;
        cfg.app.theme = Theme::Light;
        cfg.defaults.probe_timeout_ms = 750;

        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }

    #[test]
    fn manager_config_carries_defaults() {
        let mut cfg = Config::default();
        cfg.defaults.connect_timeout_ms = 1500;
        cfg.defaults.state_file = Some(PathBuf::from("/tmp/padlink-state.json"));

        let mc = to_manager_config(&cfg);
        assert_eq!(mc.connect_timeout, Duration::from_millis(1500));
        assert_eq!(mc.probe_timeout, Duration::from_secs(2));
        assert_eq!(mc.low_battery_threshold, 20);
        assert!(mc.state_file.is_some());
    }

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(Theme::System.to_string(), "system");
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn version_comparison() {
        assert_eq!(compare_versions("1.2.0", "1.2").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("v1.9.3", "1.10.0").unwrap(), Ordering::Less);
        assert_eq!(compare_versions("2.0.0-beta.1", "1.99").unwrap(), Ordering::Greater);
        assert!(compare_versions("1.x", "1.0").is_err());
        assert!(compare_versions("", "1.0").is_err());
    }

    #[test]
    fn version_status() {
        let status = VersionStatus::check("0.1.0", "0.2.0").unwrap();
        assert!(status.update_available());
        assert_eq!(
            VersionStatus::check("0.2.0", "0.2.0").unwrap(),
            VersionStatus::UpToDate {
                current: "0.2.0".into()
            }
        );
        assert!(matches!(
            VersionStatus::check("0.3.0", "0.2.0").unwrap(),
            VersionStatus::Ahead { .. }
        ));
    }
}
