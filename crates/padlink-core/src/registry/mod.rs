// ── Registries ──
//
// Mutation-gated stores for devices and software endpoints. Each registry
// validates its inputs, owns its invariants, and publishes a fresh snapshot
// on every change.

pub mod devices;
pub mod endpoints;

pub use devices::{
    BatteryChange, DeviceRegistration, DeviceRegistry, DeviceSnapshot, RegisterOutcome, Renamed,
};
pub use endpoints::{
    ConnectDisposition, ConnectTicket, Disconnected, EndpointRegistry, EndpointSnapshot,
    Resolution,
};
