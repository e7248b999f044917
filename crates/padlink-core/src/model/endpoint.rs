// ── Software endpoint domain types ──

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;
use crate::error::CoreError;

/// Validated `host:port` pair of a local software endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointAddress {
    pub host: String,
    pub port: u16,
}

impl EndpointAddress {
    /// Validate raw form input. `host` may be a hostname or an IPv4/IPv6
    /// literal (IPv6 with or without brackets); `port` must be 1..=65535.
    pub fn parse(host: &str, port: &str) -> Result<Self, CoreError> {
        let host = parse_host(host)?;
        let port = parse_port(port)?;
        Ok(Self { host, port })
    }

    /// Same as [`parse`](Self::parse) for an already-numeric port.
    pub fn new(host: &str, port: u16) -> Result<Self, CoreError> {
        if port == 0 {
            return Err(CoreError::validation("port", "must be between 1 and 65535"));
        }
        Ok(Self {
            host: parse_host(host)?,
            port,
        })
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn parse_host(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("host", "must not be empty"));
    }

    let unbracketed = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    if let Ok(ip) = unbracketed.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    match url::Host::parse(trimmed) {
        Ok(url::Host::Domain(domain)) => Ok(domain),
        Ok(url::Host::Ipv4(ip)) => Ok(ip.to_string()),
        Ok(url::Host::Ipv6(ip)) => Ok(ip.to_string()),
        Err(e) => Err(CoreError::validation("host", format!("'{trimmed}': {e}"))),
    }
}

fn parse_port(raw: &str) -> Result<u16, CoreError> {
    let trimmed = raw.trim();
    match trimmed.parse::<u16>() {
        Ok(0) | Err(_) => Err(CoreError::validation(
            "port",
            format!("'{trimmed}' is not a port between 1 and 65535"),
        )),
        Ok(port) => Ok(port),
    }
}

/// An in-flight transport request on an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingRequest {
    Connecting { seq: u64, since: DateTime<Utc> },
}

impl PendingRequest {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Connecting { seq, .. } => *seq,
        }
    }
}

/// Configured third-party software reachable over TCP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareEndpoint {
    pub id: EntityId,
    pub name: String,
    pub host: String,
    pub port: u16,

    /// Authoritative only once a request has resolved.
    #[serde(default)]
    pub connected: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingRequest>,

    /// Round-trip of the last successful connect or test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Sequence number of the newest connect/disconnect request.
    #[serde(skip)]
    pub(crate) request_seq: u64,
}

impl SoftwareEndpoint {
    pub fn address(&self) -> EndpointAddress {
        EndpointAddress {
            host: self.host.clone(),
            port: self.port,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Label used in status messages: `Software "OBS Studio"`.
    pub fn label(&self) -> String {
        format!("Software \"{}\"", self.name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_ipv4_and_port() {
        let addr = EndpointAddress::parse("127.0.0.1", "4455").unwrap();
        assert_eq!(addr.host, "127.0.0.1");
        assert_eq!(addr.port, 4455);
        assert_eq!(addr.to_string(), "127.0.0.1:4455");
    }

    #[test]
    fn parses_hostname_lowercased() {
        let addr = EndpointAddress::parse("Studio-PC.local", "8080").unwrap();
        assert_eq!(addr.host, "studio-pc.local");
    }

    #[test]
    fn parses_bracketed_ipv6() {
        let addr = EndpointAddress::parse("[::1]", "54321").unwrap();
        assert_eq!(addr.host, "::1");
        assert_eq!(addr.to_string(), "[::1]:54321");
    }

    #[test]
    fn rejects_empty_host() {
        let err = EndpointAddress::parse("  ", "4455").unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "host"));
    }

    #[test]
    fn rejects_host_with_spaces() {
        assert!(EndpointAddress::parse("obs studio", "4455").is_err());
    }

    #[test]
    fn rejects_out_of_range_ports() {
        for port in ["0", "65536", "-1", "abc", ""] {
            let err = EndpointAddress::parse("127.0.0.1", port).unwrap_err();
            assert!(
                matches!(err, CoreError::Validation { ref field, .. } if field == "port"),
                "port {port:?} should be rejected"
            );
        }
        assert!(EndpointAddress::parse("127.0.0.1", "65535").is_ok());
        assert!(EndpointAddress::parse("127.0.0.1", "1").is_ok());
    }
}
