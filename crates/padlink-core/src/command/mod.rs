// ── Command API ──
//
// All writes flow through a unified `Command` enum. The controller's
// processor task applies each one to the manager, starting transport or
// driver work where needed.

pub mod requests;

use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::manager::Manager;
use crate::model::{
    Device, EndpointAddress, EntityId, LogEntry, LogLevel, MetricsSnapshot, SoftwareEndpoint,
};
use crate::transport::{DeviceBackup, DeviceEvent, ProbeOutcome};

pub use requests::{AddEndpointRequest, PairDeviceRequest};

/// Work item for the processor task.
pub(crate) enum Request {
    Execute(CommandEnvelope),
    /// Read-only access to the manager, run between commands.
    Query(ManagerJob),
}

pub(crate) type ManagerJob = Box<dyn FnOnce(&mut Manager) + Send>;

/// A command plus the oneshot its result goes back on.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// Every state-changing operation a view or the driver layer can issue.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Device view ──────────────────────────────────────────────────
    SelectDevice {
        id: EntityId,
    },
    BeginRename {
        id: EntityId,
    },
    CommitRename {
        id: EntityId,
        name: String,
    },
    CancelRename {
        id: EntityId,
    },
    UnregisterDevice {
        id: EntityId,
    },
    PairDevice(PairDeviceRequest),

    // ── Device maintenance (driver round-trip) ───────────────────────
    CalibrateDevice {
        id: EntityId,
    },
    BackupDevice {
        id: EntityId,
    },
    RestoreDevice {
        id: EntityId,
        backup: DeviceBackup,
    },

    // ── Driver layer ─────────────────────────────────────────────────
    DeviceEvent(DeviceEvent),

    // ── Software connections ─────────────────────────────────────────
    AddEndpoint(AddEndpointRequest),
    RemoveEndpoint {
        id: EntityId,
    },
    Connect {
        id: EntityId,
    },
    Disconnect {
        id: EntityId,
    },
    TestConnection {
        host: String,
        port: String,
    },

    // ── Status feed ──────────────────────────────────────────────────
    AppendLog {
        level: LogLevel,
        message: String,
    },
    UpdateMetrics(MetricsSnapshot),
}

/// Result of a command execution.
#[derive(Debug)]
pub enum CommandResult {
    Ok,
    Device(Device),
    /// `None` means "no selection".
    Selection(Option<Device>),
    Endpoint(SoftwareEndpoint),
    Probe {
        address: EndpointAddress,
        outcome: ProbeOutcome,
    },
    Backup(DeviceBackup),
    Log(LogEntry),
}
