// ── Core identity type ──
//
// Devices report a numeric hardware id when they join the bus; endpoints
// created locally get sequential numbers. UUIDs are accepted for devices
// paired through tooling that mints them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Canonical identifier for any managed entity.
///
/// Serializes untagged: a bare JSON number or a UUID string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Numeric(u64),
    Uuid(Uuid),
}

impl EntityId {
    pub fn as_numeric(&self) -> Option<u64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Uuid(_) => None,
        }
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Uuid(u) => Some(u),
            Self::Numeric(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

/// Returned when a string is neither an unsigned integer nor a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a numeric id or UUID")]
pub struct EntityIdParseError(pub String);

impl FromStr for EntityId {
    type Err = EntityIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u64>() {
            return Ok(Self::Numeric(n));
        }
        Uuid::parse_str(trimmed)
            .map(Self::Uuid)
            .map_err(|_| EntityIdParseError(s.to_owned()))
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

impl From<u32> for EntityId {
    fn from(n: u32) -> Self {
        Self::Numeric(u64::from(n))
    }
}

impl From<Uuid> for EntityId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}
