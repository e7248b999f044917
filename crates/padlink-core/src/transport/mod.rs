// ── External collaborator seams ──
//
// The manager never speaks a wire protocol itself. Software links go
// through `SoftwareTransport`; the hardware driver layer goes through
// `DeviceLink` (outbound commands) and `DeviceEvent` (inbound reports).
// Both traits hand back boxed `'static` futures so the controller can run
// them off the command-processor task.

mod driver;
mod tcp;

#[cfg(test)]
pub(crate) mod scripted;

use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{EndpointAddress, EntityId};

pub use driver::{DeviceBackup, DeviceEvent, DeviceLink, LoopbackDeviceLink};
pub use tcp::TcpTransport;

/// Result of a connection test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Reachable { latency_ms: u64 },
    Unreachable { reason: String },
}

impl ProbeOutcome {
    pub fn reachable(latency: Duration) -> Self {
        Self::Reachable {
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable { .. })
    }
}

/// Link layer to local third-party software.
pub trait SoftwareTransport: Send + Sync {
    /// Open a link for endpoint `id` as attempt `seq`. Resolves with the
    /// connect round-trip. A link opened by an older attempt never replaces
    /// one held for a newer attempt.
    fn connect(
        &self,
        id: &EntityId,
        seq: u64,
        address: &EndpointAddress,
    ) -> BoxFuture<'static, Result<Duration, CoreError>>;

    /// Release the link for `id`, if any. Takes effect when called, so a
    /// connect issued afterwards is never torn down by it. Never fails.
    fn disconnect(&self, id: &EntityId) -> BoxFuture<'static, ()>;

    /// Release the link for `id` only if attempt `seq` opened it.
    fn abandon(&self, id: &EntityId, seq: u64);

    /// Check reachability without keeping a link.
    fn probe(&self, address: &EndpointAddress) -> BoxFuture<'static, ProbeOutcome>;
}
