// ── Storage ──
//
// In-memory entity collections behind the registries, and the on-disk
// state file that survives restarts.

pub(crate) mod collection;
pub mod persist;

pub use persist::{STATE_VERSION, StateFile};
