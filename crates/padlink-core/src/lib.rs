//! State manager between peripheral devices, local creative software, and UI
//! consumers (CLI / interactive shell).
//!
//! This crate owns the domain model, the mutation-gated registries, and the
//! async orchestration layer:
//!
//! - **[`Controller`]**: cheaply cloneable facade. A single command-processor
//!   task owns the [`Manager`] and applies [`Command`]s one at a time;
//!   transport calls run off-task and come back as sequenced resolutions, so
//!   a later disconnect always beats an earlier connect.
//!
//! - **[`Manager`]**: the synchronous core. [`DeviceRegistry`],
//!   [`EndpointRegistry`], and the bounded [`StatusStream`]. Every state
//!   change is validated here and mirrored into the status feed.
//!
//! - **[`EntityStream<T>`]**: subscription handle for device / endpoint
//!   snapshots, backed by `tokio::sync::watch`. [`LogStream`] carries the
//!   status feed.
//!
//! - **Seams** ([`transport`]): [`SoftwareTransport`] for TCP links to
//!   third-party software and [`DeviceLink`] for the hardware driver layer.
//!
//! - **Persistence** ([`store::persist`]): JSON state file keyed by id,
//!   tolerant of unknown fields and device types.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod manager;
pub mod model;
pub mod registry;
pub mod status;
pub mod store;
pub mod stream;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::requests::*;
pub use command::{Command, CommandResult};
pub use config::ManagerConfig;
pub use controller::{Controller, ControllerState};
pub use error::CoreError;
pub use manager::{MaintenanceOp, Manager};
pub use registry::{
    ConnectDisposition, DeviceRegistration, DeviceRegistry, EndpointRegistry, RegisterOutcome,
    Resolution,
};
pub use status::{LogObserver, StatusStream, SubscriptionId};
pub use store::persist::StateFile;
pub use stream::{EntityStream, LogStream};
pub use transport::{
    DeviceBackup, DeviceEvent, DeviceLink, LoopbackDeviceLink, ProbeOutcome, SoftwareTransport,
    TcpTransport,
};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Device, DeviceType, EndpointAddress, EntityId, LogEntry, LogLevel, MetricsSnapshot,
    PendingRequest, SoftwareEndpoint,
};
