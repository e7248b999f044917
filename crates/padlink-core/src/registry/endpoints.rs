// ── Software connection registry ──
//
// Connect and disconnect are requests, not state flips. Every request takes
// the next sequence number; a connect resolution only lands if its number is
// still the endpoint's newest. That makes a later disconnect win over an
// earlier connect no matter which finishes first.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::device::normalize_name;
use crate::model::{EndpointAddress, EntityId, PendingRequest, SoftwareEndpoint};
use crate::store::collection::EntityCollection;

/// Snapshot type published to subscribers.
pub type EndpointSnapshot = Arc<Vec<Arc<SoftwareEndpoint>>>;

/// A connect attempt the caller must hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTicket {
    pub id: EntityId,
    pub seq: u64,
    pub address: EndpointAddress,
}

/// What [`EndpointRegistry::request_connect`] decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectDisposition {
    /// Already connected; nothing to do.
    AlreadyConnected,
    /// An earlier connect is still in flight.
    AlreadyPending { seq: u64 },
    /// A new attempt was recorded and should be dispatched.
    Dispatch(ConnectTicket),
}

/// What happened when a connect attempt came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Connected(SoftwareEndpoint),
    Failed {
        endpoint: SoftwareEndpoint,
        error: CoreError,
    },
    /// Superseded by a newer request; the result was discarded.
    Stale { still_wanted: bool },
    /// The endpoint was removed while the attempt was in flight.
    Gone,
}

/// Result of [`EndpointRegistry::request_disconnect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnected {
    pub endpoint: SoftwareEndpoint,
    pub was_connected: bool,
    pub cancelled_seq: Option<u64>,
}

pub struct EndpointRegistry {
    endpoints: EntityCollection<SoftwareEndpoint>,
    next_id: u64,
    next_seq: u64,
    snapshot: watch::Sender<EndpointSnapshot>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            endpoints: EntityCollection::new(),
            next_id: 1,
            next_seq: 0,
            snapshot,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// All endpoints in creation order.
    pub fn list_endpoints(&self) -> Vec<SoftwareEndpoint> {
        self.endpoints.values().map(|e| SoftwareEndpoint::clone(e)).collect()
    }

    pub fn get(&self, id: &EntityId) -> Option<SoftwareEndpoint> {
        self.endpoints.get(id).map(|e| SoftwareEndpoint::clone(e))
    }

    /// First endpoint configured for `address`.
    pub fn find_by_address(&self, address: &EndpointAddress) -> Option<SoftwareEndpoint> {
        self.endpoints
            .values()
            .find(|e| e.host == address.host && e.port == address.port)
            .map(|e| SoftwareEndpoint::clone(e))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id the next added endpoint will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn revision(&self) -> u64 {
        self.endpoints.version()
    }

    pub fn subscribe(&self) -> watch::Receiver<EndpointSnapshot> {
        self.snapshot.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Validate form input and create a disconnected endpoint.
    pub fn add_endpoint(
        &mut self,
        name: &str,
        host: &str,
        port: &str,
    ) -> Result<SoftwareEndpoint, CoreError> {
        let name = normalize_name(name).map_err(|e| match e {
            CoreError::InvalidName { reason } => CoreError::validation("name", reason),
            other => other,
        })?;
        let address = EndpointAddress::parse(host, port)?;

        let id = EntityId::from(self.next_id);
        if self.endpoints.contains(&id) {
            return Err(CoreError::InvalidState {
                message: "no endpoint ids left".into(),
            });
        }
        self.next_id = self.next_id.saturating_add(1);
        let endpoint = SoftwareEndpoint {
            id: id.clone(),
            name,
            host: address.host,
            port: address.port,
            connected: false,
            pending: None,
            latency_ms: None,
            created_at: Utc::now(),
            request_seq: 0,
        };
        self.endpoints.upsert(id, endpoint.clone());
        self.publish();
        Ok(endpoint)
    }

    /// Delete an endpoint. Callers release any transport link first.
    pub fn remove_endpoint(&mut self, id: &EntityId) -> Result<SoftwareEndpoint, CoreError> {
        let removed = self
            .endpoints
            .remove(id)
            .ok_or_else(|| CoreError::endpoint_not_found(id))?;
        self.publish();
        Ok(SoftwareEndpoint::clone(&removed))
    }

    /// Reload a persisted endpoint. Connection state never survives a
    /// restart. Records without a usable address are dropped, but their id
    /// stays reserved; a blank name falls back to the address.
    pub(crate) fn restore(&mut self, mut endpoint: SoftwareEndpoint) -> bool {
        if let Some(n) = endpoint.id.as_numeric() {
            self.next_id = self.next_id.max(n.saturating_add(1));
        }
        let address = match EndpointAddress::new(&endpoint.host, endpoint.port) {
            Ok(address) => address,
            Err(e) => {
                warn!(id = %endpoint.id, error = %e, "skipping stored endpoint");
                return false;
            }
        };
        endpoint.name = normalize_name(&endpoint.name).unwrap_or_else(|_| address.to_string());
        endpoint.host = address.host;
        endpoint.port = address.port;
        endpoint.connected = false;
        endpoint.pending = None;
        endpoint.request_seq = 0;
        self.endpoints.upsert(endpoint.id.clone(), endpoint);
        self.publish();
        true
    }

    pub(crate) fn reserve_ids_from(&mut self, next_id: u64) {
        self.next_id = self.next_id.max(next_id);
    }

    // ── Connection requests ──────────────────────────────────────────

    /// Record a connect request. Connecting an already connected (or
    /// connecting) endpoint is a successful no-op.
    pub fn request_connect(&mut self, id: &EntityId) -> Result<ConnectDisposition, CoreError> {
        let current = self
            .endpoints
            .get(id)
            .ok_or_else(|| CoreError::endpoint_not_found(id))?;
        if current.connected {
            return Ok(ConnectDisposition::AlreadyConnected);
        }
        if let Some(pending) = current.pending {
            return Ok(ConnectDisposition::AlreadyPending { seq: pending.seq() });
        }

        let seq = self.bump_seq();
        let updated = self
            .endpoints
            .update(id, |e| {
                e.request_seq = seq;
                e.pending = Some(PendingRequest::Connecting {
                    seq,
                    since: Utc::now(),
                });
            })
            .ok_or_else(|| CoreError::endpoint_not_found(id))?;
        self.publish();

        Ok(ConnectDisposition::Dispatch(ConnectTicket {
            id: id.clone(),
            seq,
            address: updated.address(),
        }))
    }

    /// Apply the transport's answer to connect attempt `seq`.
    pub fn resolve_connect(
        &mut self,
        id: &EntityId,
        seq: u64,
        outcome: Result<Duration, CoreError>,
    ) -> Resolution {
        let Some(current) = self.endpoints.get(id) else {
            return Resolution::Gone;
        };
        let is_current = current.request_seq == seq
            && current.pending.is_some_and(|p| p.seq() == seq);
        if !is_current {
            debug!(%id, seq, latest = current.request_seq, "discarding stale connect resolution");
            return Resolution::Stale {
                still_wanted: current.connected || current.pending.is_some(),
            };
        }

        let updated = match &outcome {
            Ok(latency) => self.endpoints.update(id, |e| {
                e.pending = None;
                e.connected = true;
                e.latency_ms = Some(duration_ms(*latency));
            }),
            Err(_) => self.endpoints.update(id, |e| {
                e.pending = None;
                e.connected = false;
            }),
        };
        self.publish();

        let Some(endpoint) = updated.map(|e| SoftwareEndpoint::clone(&e)) else {
            return Resolution::Gone;
        };
        match outcome {
            Ok(_) => Resolution::Connected(endpoint),
            Err(error) => Resolution::Failed { endpoint, error },
        }
    }

    /// Drop every connect still in flight, as if each had been superseded.
    /// Returns the abandoned attempts.
    pub fn abandon_pending(&mut self) -> Vec<(EntityId, u64)> {
        let pending: Vec<(EntityId, u64)> = self
            .endpoints
            .values()
            .filter_map(|e| e.pending.map(|p| (e.id.clone(), p.seq())))
            .collect();
        if pending.is_empty() {
            return pending;
        }
        for (id, _) in &pending {
            let seq = self.bump_seq();
            self.endpoints.update(id, |e| {
                e.request_seq = seq;
                e.pending = None;
                e.connected = false;
            });
        }
        self.publish();
        pending
    }

    /// Record a disconnect. Always succeeds locally and supersedes any
    /// connect attempt still in flight.
    pub fn request_disconnect(&mut self, id: &EntityId) -> Result<Disconnected, CoreError> {
        let current = self
            .endpoints
            .get(id)
            .ok_or_else(|| CoreError::endpoint_not_found(id))?;
        let was_connected = current.connected;
        let cancelled_seq = current.pending.map(|p| p.seq());

        let seq = self.bump_seq();
        let updated = self
            .endpoints
            .update(id, |e| {
                e.request_seq = seq;
                e.pending = None;
                e.connected = false;
            })
            .ok_or_else(|| CoreError::endpoint_not_found(id))?;
        self.publish();

        Ok(Disconnected {
            endpoint: SoftwareEndpoint::clone(&updated),
            was_connected,
            cancelled_seq,
        })
    }

    /// Store the round-trip of a successful connection test.
    pub fn record_latency(&mut self, id: &EntityId, latency: Duration) {
        if self
            .endpoints
            .update(id, |e| e.latency_ms = Some(duration_ms(latency)))
            .is_some()
        {
            self.publish();
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn publish(&self) {
        let values: Vec<Arc<SoftwareEndpoint>> = self.endpoints.values().map(Arc::clone).collect();
        self.snapshot.send_replace(Arc::new(values));
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ticket(disposition: ConnectDisposition) -> ConnectTicket {
        match disposition {
            ConnectDisposition::Dispatch(t) => t,
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    fn refused() -> CoreError {
        CoreError::transport("connect", "127.0.0.1:4455", "connection refused")
    }

    #[test]
    fn add_endpoint_round_trips_through_list() {
        let mut reg = EndpointRegistry::new();
        reg.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();

        let list = reg.list_endpoints();
        assert_eq!(list.len(), 1);
        let ep = &list[0];
        assert_eq!(ep.name, "OBS");
        assert_eq!(ep.host, "127.0.0.1");
        assert_eq!(ep.port, 4455);
        assert!(!ep.connected);
        assert!(ep.pending.is_none());
    }

    #[test]
    fn add_endpoint_assigns_fresh_ids() {
        let mut reg = EndpointRegistry::new();
        let a = reg.add_endpoint("A", "127.0.0.1", "1").unwrap();
        let b = reg.add_endpoint("B", "127.0.0.1", "2").unwrap();
        reg.remove_endpoint(&b.id).unwrap();
        let c = reg.add_endpoint("C", "127.0.0.1", "3").unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
    }

    #[test]
    fn invalid_input_does_not_mutate() {
        let mut reg = EndpointRegistry::new();
        assert!(reg.add_endpoint("OBS", "", "4455").is_err());
        assert!(reg.add_endpoint("OBS", "127.0.0.1", "70000").is_err());
        let err = reg.add_endpoint("  ", "127.0.0.1", "4455").unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "name"));
        assert!(reg.is_empty());
        assert_eq!(reg.next_id(), 1);
    }

    #[test]
    fn connect_then_ack_sets_connected() {
        let mut reg = EndpointRegistry::new();
        let ep = reg.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();

        let t = ticket(reg.request_connect(&ep.id).unwrap());
        assert!(reg.get(&ep.id).unwrap().is_pending());
        assert!(!reg.get(&ep.id).unwrap().connected);

        let res = reg.resolve_connect(&t.id, t.seq, Ok(Duration::from_millis(4)));
        assert!(matches!(res, Resolution::Connected(ref e) if e.connected));
        let now = reg.get(&ep.id).unwrap();
        assert!(now.connected);
        assert_eq!(now.latency_ms, Some(4));
        assert!(now.pending.is_none());
    }

    #[test]
    fn connect_is_idempotent_once_connected() {
        let mut reg = EndpointRegistry::new();
        let ep = reg.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let t = ticket(reg.request_connect(&ep.id).unwrap());
        reg.resolve_connect(&t.id, t.seq, Ok(Duration::ZERO));
        let before = reg.get(&ep.id).unwrap();

        assert_eq!(
            reg.request_connect(&ep.id).unwrap(),
            ConnectDisposition::AlreadyConnected
        );
        assert_eq!(reg.get(&ep.id).unwrap(), before);
    }

    #[test]
    fn second_connect_while_pending_is_a_noop() {
        let mut reg = EndpointRegistry::new();
        let ep = reg.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let t = ticket(reg.request_connect(&ep.id).unwrap());
        assert_eq!(
            reg.request_connect(&ep.id).unwrap(),
            ConnectDisposition::AlreadyPending { seq: t.seq }
        );
    }

    #[test]
    fn failed_connect_leaves_disconnected() {
        let mut reg = EndpointRegistry::new();
        let ep = reg.add_endpoint("Streamlabs", "192.168.1.10", "8080").unwrap();
        let t = ticket(reg.request_connect(&ep.id).unwrap());

        let res = reg.resolve_connect(&t.id, t.seq, Err(refused()));
        assert!(matches!(res, Resolution::Failed { .. }));
        let now = reg.get(&ep.id).unwrap();
        assert!(!now.connected);
        assert!(now.pending.is_none());
    }

    #[test]
    fn disconnect_supersedes_in_flight_connect() {
        let mut reg = EndpointRegistry::new();
        let ep = reg.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let t = ticket(reg.request_connect(&ep.id).unwrap());

        let d = reg.request_disconnect(&ep.id).unwrap();
        assert_eq!(d.cancelled_seq, Some(t.seq));
        assert!(!d.was_connected);

        // The connect finishes after the disconnect was issued.
        let res = reg.resolve_connect(&t.id, t.seq, Ok(Duration::from_millis(1)));
        assert_eq!(res, Resolution::Stale { still_wanted: false });
        assert!(!reg.get(&ep.id).unwrap().connected);
    }

    #[test]
    fn stale_resolution_does_not_clobber_newer_attempt() {
        let mut reg = EndpointRegistry::new();
        let ep = reg.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let first = ticket(reg.request_connect(&ep.id).unwrap());
        reg.request_disconnect(&ep.id).unwrap();
        let second = ticket(reg.request_connect(&ep.id).unwrap());
        assert!(second.seq > first.seq);

        // Old failure arrives late: ignored, second attempt still pending.
        let res = reg.resolve_connect(&ep.id, first.seq, Err(refused()));
        assert_eq!(res, Resolution::Stale { still_wanted: true });
        assert!(reg.get(&ep.id).unwrap().is_pending());

        reg.resolve_connect(&ep.id, second.seq, Ok(Duration::ZERO));
        assert!(reg.get(&ep.id).unwrap().connected);
    }

    #[test]
    fn disconnect_is_unconditional_and_idempotent() {
        let mut reg = EndpointRegistry::new();
        let ep = reg.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let t = ticket(reg.request_connect(&ep.id).unwrap());
        reg.resolve_connect(&t.id, t.seq, Ok(Duration::ZERO));

        let first = reg.request_disconnect(&ep.id).unwrap();
        assert!(first.was_connected);
        let second = reg.request_disconnect(&ep.id).unwrap();
        assert!(!second.was_connected);
        assert!(!reg.get(&ep.id).unwrap().connected);
    }

    #[test]
    fn resolution_for_removed_endpoint_is_gone() {
        let mut reg = EndpointRegistry::new();
        let ep = reg.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let t = ticket(reg.request_connect(&ep.id).unwrap());
        reg.remove_endpoint(&ep.id).unwrap();
        assert_eq!(
            reg.resolve_connect(&t.id, t.seq, Ok(Duration::ZERO)),
            Resolution::Gone
        );
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut reg = EndpointRegistry::new();
        let id = EntityId::from(404_u64);
        assert!(matches!(reg.request_connect(&id), Err(CoreError::NotFound { .. })));
        assert!(matches!(reg.request_disconnect(&id), Err(CoreError::NotFound { .. })));
        assert!(matches!(reg.remove_endpoint(&id), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn find_by_address_matches_normalized_host() {
        let mut reg = EndpointRegistry::new();
        reg.add_endpoint("Test", "10.0.0.5", "9999").unwrap();
        let addr = EndpointAddress::parse("10.0.0.5", "9999").unwrap();
        assert_eq!(reg.find_by_address(&addr).unwrap().name, "Test");
    }

    fn stored(id: u64, name: &str, host: &str, port: u16) -> SoftwareEndpoint {
        SoftwareEndpoint {
            id: EntityId::from(id),
            name: name.into(),
            host: host.into(),
            port,
            connected: true,
            pending: None,
            latency_ms: None,
            created_at: Utc::now(),
            request_seq: 7,
        }
    }

    #[test]
    fn restore_drops_unusable_addresses_but_keeps_their_ids() {
        let mut reg = EndpointRegistry::new();
        assert!(!reg.restore(stored(1, "", "", 0)));
        assert!(!reg.restore(stored(2, "Bad", "127.0.0.1", 0)));
        assert!(reg.restore(stored(3, "   ", "127.0.0.1", 4455)));

        let list = reg.list_endpoints();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "127.0.0.1:4455");
        assert!(!list[0].connected);
        assert_eq!(reg.next_id(), 4);
    }

    #[test]
    fn restore_saturates_id_counter() {
        let mut reg = EndpointRegistry::new();
        assert!(reg.restore(stored(u64::MAX, "Max", "localhost", 80)));
        assert_eq!(reg.next_id(), u64::MAX);
        assert!(matches!(
            reg.add_endpoint("Next", "localhost", "81"),
            Err(CoreError::InvalidState { .. })
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn abandoning_pending_connects_makes_their_results_stale() {
        let mut reg = EndpointRegistry::new();
        let obs = reg.add_endpoint("OBS", "127.0.0.1", "4455").unwrap();
        let idle = reg.add_endpoint("Idle", "127.0.0.1", "4456").unwrap();
        let t = ticket(reg.request_connect(&obs.id).unwrap());

        assert_eq!(reg.abandon_pending(), vec![(obs.id.clone(), t.seq)]);
        assert!(reg.abandon_pending().is_empty());
        assert!(!reg.get(&obs.id).unwrap().is_pending());
        assert!(!reg.get(&idle.id).unwrap().is_pending());
        assert_eq!(
            reg.resolve_connect(&t.id, t.seq, Ok(Duration::ZERO)),
            Resolution::Stale {
                still_wanted: false
            }
        );

        // A fresh connect is dispatched again.
        assert!(matches!(
            reg.request_connect(&obs.id).unwrap(),
            ConnectDisposition::Dispatch(_)
        ));
    }
}
