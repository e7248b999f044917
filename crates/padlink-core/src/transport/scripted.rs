// Scripted `SoftwareTransport` for tests: outcomes are set per address and
// individual connects can be held open until the test releases them.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;

use super::{ProbeOutcome, SoftwareTransport};
use crate::error::CoreError;
use crate::model::{EndpointAddress, EntityId};

#[derive(Default)]
struct Script {
    unreachable: HashSet<EndpointAddress>,
    gates: HashMap<EntityId, oneshot::Receiver<()>>,
    /// Open links and the attempt that opened each.
    open: HashMap<EntityId, u64>,
    connects: Vec<EntityId>,
    disconnects: Vec<EntityId>,
    abandoned: Vec<(EntityId, u64)>,
    probes: Vec<EndpointAddress>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every connect or probe to `address` fails from now on.
    pub(crate) fn refuse(&self, address: &EndpointAddress) {
        self.script.lock().unwrap().unreachable.insert(address.clone());
    }

    /// The next connect for `id` waits until the returned sender fires
    /// (or is dropped).
    pub(crate) fn hold(&self, id: &EntityId) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().gates.insert(id.clone(), rx);
        tx
    }

    pub(crate) fn is_open(&self, id: &EntityId) -> bool {
        self.script.lock().unwrap().open.contains_key(id)
    }

    pub(crate) fn connects(&self) -> Vec<EntityId> {
        self.script.lock().unwrap().connects.clone()
    }

    pub(crate) fn disconnects(&self) -> Vec<EntityId> {
        self.script.lock().unwrap().disconnects.clone()
    }

    pub(crate) fn abandoned(&self) -> Vec<(EntityId, u64)> {
        self.script.lock().unwrap().abandoned.clone()
    }

    pub(crate) fn probes(&self) -> Vec<EndpointAddress> {
        self.script.lock().unwrap().probes.clone()
    }
}

impl SoftwareTransport for ScriptedTransport {
    fn connect(
        &self,
        id: &EntityId,
        seq: u64,
        address: &EndpointAddress,
    ) -> BoxFuture<'static, Result<Duration, CoreError>> {
        let script = Arc::clone(&self.script);
        let id = id.clone();
        let address = address.clone();
        let gate = {
            let mut s = script.lock().unwrap();
            s.connects.push(id.clone());
            s.gates.remove(&id)
        };

        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let mut s = script.lock().unwrap();
            if s.unreachable.contains(&address) {
                return Err(CoreError::transport("connect", &address, "connection refused"));
            }
            let held = s.open.entry(id).or_insert(seq);
            *held = (*held).max(seq);
            Ok(Duration::from_millis(4))
        }
        .boxed()
    }

    fn disconnect(&self, id: &EntityId) -> BoxFuture<'static, ()> {
        let mut s = self.script.lock().unwrap();
        s.disconnects.push(id.clone());
        s.open.remove(id);
        futures::future::ready(()).boxed()
    }

    fn abandon(&self, id: &EntityId, seq: u64) {
        let mut s = self.script.lock().unwrap();
        s.abandoned.push((id.clone(), seq));
        if s.open.get(id) == Some(&seq) {
            s.open.remove(id);
        }
    }

    fn probe(&self, address: &EndpointAddress) -> BoxFuture<'static, ProbeOutcome> {
        let mut s = self.script.lock().unwrap();
        s.probes.push(address.clone());
        let outcome = if s.unreachable.contains(address) {
            ProbeOutcome::Unreachable {
                reason: "connection refused".into(),
            }
        } else {
            ProbeOutcome::reachable(Duration::from_millis(2))
        };
        futures::future::ready(outcome).boxed()
    }
}
