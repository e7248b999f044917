//! Clap derive structures for the `padlink` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Depends only on clap + clap_complete so `build.rs` can render man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// padlink -- console for peripheral devices and their software links
#[derive(Debug, Parser)]
#[command(
    name = "padlink",
    version,
    about = "Manage padlink devices and software connections",
    long_about = "Keeps track of paired hardware (gamepads, pedals, keyboards, mixers)\n\
        and TCP connections to local creative and streaming software.\n\n\
        Every change is mirrored into a status feed; see `padlink status log`.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

/// One line typed into `padlink shell`.
#[derive(Debug, Parser)]
#[command(name = "padlink", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Clone, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "PADLINK_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// State file holding devices, endpoints, and the status feed
    #[arg(long, global = true, value_name = "PATH")]
    pub state_file: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "PADLINK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

impl GlobalOpts {
    pub fn format(&self) -> OutputFormat {
        self.output.clone().unwrap_or_default()
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.clone().unwrap_or_default()
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    #[default]
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage third-party software connections
    #[command(alias = "sw", alias = "s")]
    Software(SoftwareArgs),

    /// Manage paired hardware devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// View the status feed and system metrics
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Application preferences and version check
    Settings(SettingsArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Interactive session against one running manager
    Shell,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SOFTWARE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SoftwareArgs {
    #[command(subcommand)]
    pub command: SoftwareCommand,
}

#[derive(Debug, Subcommand)]
pub enum SoftwareCommand {
    /// List configured software endpoints
    #[command(alias = "ls")]
    List,

    /// Add a software endpoint
    Add {
        /// Display name (e.g. "OBS Studio")
        name: String,

        /// Hostname or IP address
        host: String,

        /// TCP port (1-65535)
        port: String,
    },

    /// Connect to a software endpoint
    Connect {
        /// Endpoint ID or name
        endpoint: String,

        /// Return once the attempt is started instead of waiting for it
        #[arg(long)]
        no_wait: bool,
    },

    /// Disconnect from a software endpoint
    Disconnect {
        /// Endpoint ID or name
        endpoint: String,
    },

    /// Check whether something is listening on a host and port
    Test {
        /// Hostname or IP address
        host: String,

        /// TCP port (1-65535)
        port: String,
    },

    /// Remove a software endpoint
    #[command(alias = "rm")]
    Remove {
        /// Endpoint ID or name
        endpoint: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List paired devices
    #[command(alias = "ls")]
    List,

    /// Show device details
    Show {
        /// Device ID or name
        device: String,
    },

    /// Make a device the viewed one
    Select {
        /// Device ID or name
        device: String,
    },

    /// Enter editing mode on a device
    Edit {
        /// Device ID or name
        device: String,
    },

    /// Rename a device (enters editing mode first if needed)
    Rename {
        /// Device ID or name
        device: String,

        /// New display name
        name: String,
    },

    /// Leave editing mode without renaming
    CancelRename {
        /// Device ID or name
        device: String,
    },

    /// Report a device joining the bus
    Pair {
        /// Hardware id; a UUID is generated when omitted
        #[arg(long)]
        id: Option<String>,

        /// Display name
        #[arg(long)]
        name: String,

        /// Hardware category
        #[arg(long = "type", value_name = "TYPE")]
        device_type: DeviceKind,

        /// Firmware version string
        #[arg(long, default_value = "")]
        firmware: String,

        /// Battery level 0-100 (omit for mains-powered devices)
        #[arg(long)]
        battery: Option<u8>,
    },

    /// Report a battery reading
    Battery {
        /// Device ID or name
        device: String,

        /// Battery level 0-100; omit for mains power
        percent: Option<u8>,
    },

    /// Report a firmware version
    Firmware {
        /// Device ID or name
        device: String,

        /// New firmware version
        #[arg(id = "firmware_version", value_name = "VERSION")]
        version: String,
    },

    /// Remove a device
    #[command(alias = "rm")]
    Unregister {
        /// Device ID or name
        device: String,
    },

    /// Run the device's calibration routine
    Calibrate {
        /// Device ID or name
        device: String,
    },

    /// Save the device's settings
    Backup {
        /// Device ID or name
        device: String,

        /// Write the backup to this file instead of stdout
        #[arg(long, short = 'f', value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Load settings from a backup file
    Restore {
        /// Device ID or name
        device: String,

        /// Backup file written by `devices backup`
        #[arg(long, short = 'f', value_name = "PATH")]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceKind {
    Gamepad,
    Pedal,
    Keyboard,
    Mixer,
    Other,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATUS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(subcommand)]
    pub command: StatusCommand,
}

#[derive(Debug, Subcommand)]
pub enum StatusCommand {
    /// Show the most recent status entries, newest first
    Log {
        /// Number of entries
        #[arg(long, short = 'n', default_value = "20")]
        lines: usize,

        /// Only entries at this level
        #[arg(long)]
        level: Option<LevelArg>,
    },

    /// Append an entry to the status feed
    Append {
        level: LevelArg,
        message: String,
    },

    /// Show the latest system metrics
    Metrics,

    /// Print entries as they are appended
    Follow {
        /// Stop after this many entries
        #[arg(long)]
        count: Option<usize>,

        /// Stop after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Info,
    Success,
    Warn,
    Error,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SETTINGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show application settings
    Show,

    /// Launch with the OS
    Autostart {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Color theme
    Theme {
        #[arg(value_enum)]
        theme: ThemeArg,
    },

    /// Compare the running version with the latest release
    Version {
        /// Latest published version to compare against
        #[arg(long, env = "PADLINK_LATEST_VERSION")]
        latest: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    System,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config and state file locations
    Path,

    /// Display current resolved configuration
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
