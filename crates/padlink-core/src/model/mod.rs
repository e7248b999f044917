// ── Unified domain model ──
//
// Canonical representation of everything the manager tracks. Views consume
// these types read-only; all mutation goes through the registries.

pub mod device;
pub mod endpoint;
pub mod entity_id;
pub mod log;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use padlink_core::model::*` gives you everything.

pub use device::{Device, DeviceType};
pub use endpoint::{EndpointAddress, PendingRequest, SoftwareEndpoint};
pub use entity_id::{EntityId, EntityIdParseError};
pub use log::{LogEntry, LogLevel, MetricsSnapshot};
