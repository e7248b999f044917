// ── TCP software transport ──
//
// Plain TCP links to software listening on a local port (OBS websocket,
// avatar trackers, ...). Open streams are kept per endpoint id, tagged with
// the attempt that opened them, so that a disconnect closes the right socket
// and a superseded attempt can be dropped without touching a newer one. The
// link table is never locked across an `.await`; a disconnect takes effect at
// call time, not when its future is first polled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::{ProbeOutcome, SoftwareTransport};
use crate::error::CoreError;
use crate::model::{EndpointAddress, EntityId};

struct Link {
    seq: u64,
    stream: TcpStream,
}

type LinkTable = HashMap<EntityId, Link>;

#[derive(Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
    probe_timeout: Duration,
    links: Arc<Mutex<LinkTable>>,
}

impl TcpTransport {
    pub fn new(connect_timeout: Duration, probe_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            probe_timeout,
            links: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of open links.
    pub fn link_count(&self) -> usize {
        lock(&self.links).len()
    }
}

fn lock(links: &Mutex<LinkTable>) -> MutexGuard<'_, LinkTable> {
    links.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(2))
    }
}

impl SoftwareTransport for TcpTransport {
    fn connect(
        &self,
        id: &EntityId,
        seq: u64,
        address: &EndpointAddress,
    ) -> BoxFuture<'static, Result<Duration, CoreError>> {
        let links = Arc::clone(&self.links);
        let id = id.clone();
        let address = address.clone();
        let timeout = self.connect_timeout;

        async move {
            let started = Instant::now();
            let stream = open(&address, timeout, "connect").await?;
            let latency = started.elapsed();
            debug!(%id, seq, %address, ?latency, "software link open");
            let mut links = lock(&links);
            if links.get(&id).is_some_and(|held| held.seq > seq) {
                debug!(%id, seq, "newer link already open");
            } else {
                links.insert(id, Link { seq, stream });
            }
            Ok(latency)
        }
        .boxed()
    }

    fn disconnect(&self, id: &EntityId) -> BoxFuture<'static, ()> {
        if let Some(link) = lock(&self.links).remove(id) {
            drop(link);
            debug!(%id, "software link closed");
        }
        futures::future::ready(()).boxed()
    }

    fn abandon(&self, id: &EntityId, seq: u64) {
        let mut links = lock(&self.links);
        if links.get(id).is_some_and(|held| held.seq == seq) {
            links.remove(id);
            debug!(%id, seq, "superseded software link closed");
        }
    }

    fn probe(&self, address: &EndpointAddress) -> BoxFuture<'static, ProbeOutcome> {
        let address = address.clone();
        let timeout = self.probe_timeout;

        async move {
            let started = Instant::now();
            match open(&address, timeout, "probe").await {
                Ok(stream) => {
                    let latency = started.elapsed();
                    drop(stream);
                    ProbeOutcome::reachable(latency)
                }
                Err(e) => {
                    warn!(%address, error = %e, "probe failed");
                    ProbeOutcome::Unreachable {
                        reason: match e {
                            CoreError::Transport { reason, .. } => reason,
                            other => other.to_string(),
                        },
                    }
                }
            }
        }
        .boxed()
    }
}

async fn open(
    address: &EndpointAddress,
    timeout: Duration,
    operation: &str,
) -> Result<TcpStream, CoreError> {
    let attempt = TcpStream::connect((address.host.as_str(), address.port));
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(CoreError::transport(operation, address, e)),
        Err(_) => Err(CoreError::transport(
            operation,
            address,
            format!("timed out after {}ms", timeout.as_millis()),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn probe_reports_reachable_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let transport = TcpTransport::default();

        let outcome = transport
            .probe(&EndpointAddress::new("127.0.0.1", port).unwrap())
            .await;
        assert!(outcome.is_reachable());
        assert_eq!(transport.link_count(), 0);
    }

    #[tokio::test]
    async fn probe_reports_unreachable_port() {
        let port = closed_port().await;
        let transport = TcpTransport::default();
        let outcome = transport
            .probe(&EndpointAddress::new("127.0.0.1", port).unwrap())
            .await;
        assert!(matches!(outcome, ProbeOutcome::Unreachable { .. }));
    }

    #[tokio::test]
    async fn connect_keeps_link_until_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let transport = TcpTransport::default();
        let id = EntityId::from(1_u64);

        transport
            .connect(&id, 1, &EndpointAddress::new("127.0.0.1", port).unwrap())
            .await
            .unwrap();
        assert_eq!(transport.link_count(), 1);

        transport.disconnect(&id).await;
        assert_eq!(transport.link_count(), 0);
    }

    #[tokio::test]
    async fn connect_failure_is_transport_error() {
        let port = closed_port().await;
        let transport = TcpTransport::default();
        let err = transport
            .connect(
                &EntityId::from(1_u64),
                1,
                &EndpointAddress::new("127.0.0.1", port).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(transport.link_count(), 0);
    }

    #[tokio::test]
    async fn older_attempt_never_displaces_newer_link() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = EndpointAddress::new("127.0.0.1", listener.local_addr().unwrap().port())
            .unwrap();
        let transport = TcpTransport::default();
        let id = EntityId::from(1_u64);

        transport.connect(&id, 3, &address).await.unwrap();
        transport.connect(&id, 1, &address).await.unwrap();
        transport.abandon(&id, 1);
        assert_eq!(transport.link_count(), 1);

        transport.abandon(&id, 3);
        assert_eq!(transport.link_count(), 0);
    }
}
