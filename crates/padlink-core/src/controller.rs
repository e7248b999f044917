// ── Controller ──
//
// Async facade over the manager. One command-processor task owns the
// `Manager` and applies requests strictly one at a time. Transport and
// driver calls run as spawned tasks; their results come back on an internal
// channel and are applied by that same task, so a mutation never suspends
// halfway through.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{FutureExt, TryFutureExt};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::command::{Command, CommandEnvelope, CommandResult, ManagerJob, Request};
use crate::config::ManagerConfig;
use crate::error::CoreError;
use crate::manager::{MaintenanceOp, Manager};
use crate::model::{
    Device, EndpointAddress, EntityId, LogEntry, MetricsSnapshot, SoftwareEndpoint,
};
use crate::registry::{ConnectDisposition, DeviceSnapshot, EndpointSnapshot, Resolution};
use crate::status::{LogObserver, SubscriptionId};
use crate::stream::{EntityStream, LogStream};
use crate::transport::{
    DeviceBackup, DeviceEvent, DeviceLink, LoopbackDeviceLink, ProbeOutcome, SoftwareTransport,
    TcpTransport,
};

const COMMAND_CHANNEL_SIZE: usize = 64;
const LOG_CHANNEL_SIZE: usize = 256;

// ── ControllerState ──────────────────────────────────────────────

/// Whether a processor task currently owns the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Stopped,
    Running,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for views.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Snapshots, metrics, and
/// the log feed can be read at any time; commands need a started
/// controller.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ManagerConfig,
    transport: Arc<dyn SoftwareTransport>,
    device_link: Arc<dyn DeviceLink>,
    state: watch::Sender<ControllerState>,
    devices: watch::Receiver<DeviceSnapshot>,
    endpoints: watch::Receiver<EndpointSnapshot>,
    metrics: watch::Receiver<MetricsSnapshot>,
    log_tx: broadcast::Sender<LogEntry>,
    /// The manager while no processor task owns it.
    parked: Mutex<Option<Manager>>,
    request_tx: Mutex<mpsc::Sender<Request>>,
    request_rx: Mutex<Option<mpsc::Receiver<Request>>>,
    cancel: CancellationToken,
    /// Child token for the current run; replaced on every start.
    cancel_child: Mutex<CancellationToken>,
    processor: Mutex<Option<JoinHandle<Manager>>>,
}

impl Controller {
    /// Load state from `config.state_file` and wire up the TCP transport
    /// and the loopback driver. Does NOT start processing; call
    /// [`start()`](Self::start).
    pub fn new(config: ManagerConfig) -> Result<Self, CoreError> {
        let transport = Arc::new(TcpTransport::new(
            config.connect_timeout,
            config.probe_timeout,
        ));
        let manager = Manager::load(config)?;
        Ok(Self::with_backends(
            manager,
            transport,
            Arc::new(LoopbackDeviceLink),
        ))
    }

    /// Build around an existing manager and explicit collaborators.
    pub fn with_backends(
        mut manager: Manager,
        transport: Arc<dyn SoftwareTransport>,
        device_link: Arc<dyn DeviceLink>,
    ) -> Self {
        let (log_tx, _) = broadcast::channel(LOG_CHANNEL_SIZE);
        let forward = log_tx.clone();
        manager
            .status_mut()
            .subscribe(Box::new(move |entry: &LogEntry| {
                let _ = forward.send(entry.clone());
            }));

        let (state, _) = watch::channel(ControllerState::Stopped);
        let (request_tx, request_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config: manager.config().clone(),
                transport,
                device_link,
                state,
                devices: manager.devices().subscribe(),
                endpoints: manager.endpoints().subscribe(),
                metrics: manager.status().subscribe_metrics(),
                log_tx,
                parked: Mutex::new(Some(manager)),
                request_tx: Mutex::new(request_tx),
                request_rx: Mutex::new(Some(request_rx)),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                processor: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Hand the manager to a fresh processor task. Starting a running
    /// controller is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut processor = self.inner.processor.lock().await;
        if processor.is_some() {
            return Ok(());
        }

        let mut parked = self.inner.parked.lock().await;
        let mut request_rx = self.inner.request_rx.lock().await;
        let (Some(manager), Some(rx)) = (parked.take(), request_rx.take()) else {
            return Err(CoreError::Internal(
                "controller was stopped without returning its manager".into(),
            ));
        };

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let worker = Processor::new(
            manager,
            Arc::clone(&self.inner.transport),
            Arc::clone(&self.inner.device_link),
        );
        *processor = Some(tokio::spawn(worker.run(rx, child)));
        self.inner.state.send_replace(ControllerState::Running);
        info!("controller started");
        Ok(())
    }

    /// Stop the processor task, take the manager back, and persist it.
    ///
    /// In-flight transport calls are abandoned; their endpoints are saved
    /// as disconnected. Stopping a stopped controller is a no-op.
    ///
    /// The processor slot stays locked until the manager is parked again,
    /// so a concurrent [`start()`](Self::start) waits for it.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        let mut processor = self.inner.processor.lock().await;
        let Some(handle) = processor.take() else {
            return Ok(());
        };
        self.inner.state.send_replace(ControllerState::Stopped);
        self.inner.cancel_child.lock().await.cancel();

        let manager = handle
            .await
            .map_err(|e| CoreError::Internal(format!("command processor failed: {e}")))?;
        let saved = manager.save();

        let mut parked = self.inner.parked.lock().await;
        *parked = Some(manager);
        // The previous receiver was consumed by the processor task.
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        *self.inner.request_tx.lock().await = tx;
        *self.inner.request_rx.lock().await = Some(rx);
        drop(parked);
        drop(processor);

        info!("controller stopped");
        saved
    }

    pub fn state(&self) -> ControllerState {
        *self.inner.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ControllerState> {
        self.inner.state.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Apply a command and wait for its result.
    ///
    /// Connects return as soon as the attempt is recorded (the endpoint
    /// shows `pending`); use [`await_settled`](Self::await_settled) to wait
    /// for the transport. Probes and device commands reply once their
    /// result has been logged.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(Request::Execute(CommandEnvelope {
            command,
            response_tx: tx,
        }))
        .await?;
        rx.await.map_err(|_| CoreError::ControllerStopped)?
    }

    /// Wait until endpoint `id` has no request in flight.
    pub async fn await_settled(
        &self,
        id: &EntityId,
        timeout: Duration,
    ) -> Result<SoftwareEndpoint, CoreError> {
        let mut stream = self.endpoints();
        let settled = async {
            loop {
                match stream.find(id) {
                    None => return Err(CoreError::endpoint_not_found(id)),
                    Some(endpoint) if !endpoint.is_pending() => {
                        return Ok(SoftwareEndpoint::clone(&endpoint));
                    }
                    Some(_) => {}
                }
                if stream.changed().await.is_none() {
                    return Err(CoreError::ControllerStopped);
                }
            }
        };
        tokio::time::timeout(timeout, settled).await.map_err(|_| {
            CoreError::transport(
                "connect",
                id,
                format!("no result after {}ms", timeout.as_millis()),
            )
        })?
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn devices(&self) -> EntityStream<Device> {
        EntityStream::new(self.inner.devices.clone())
    }

    pub fn endpoints(&self) -> EntityStream<SoftwareEndpoint> {
        EntityStream::new(self.inner.endpoints.clone())
    }

    pub fn devices_snapshot(&self) -> DeviceSnapshot {
        self.inner.devices.borrow().clone()
    }

    pub fn endpoints_snapshot(&self) -> EndpointSnapshot {
        self.inner.endpoints.borrow().clone()
    }

    /// Status entries appended from now on.
    pub fn log_events(&self) -> LogStream {
        LogStream::new(self.inner.log_tx.subscribe())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.borrow().clone()
    }

    pub fn metrics_changes(&self) -> watch::Receiver<MetricsSnapshot> {
        self.inner.metrics.clone()
    }

    /// The `n` most recent status entries, newest first.
    pub async fn tail(&self, n: usize) -> Result<Vec<LogEntry>, CoreError> {
        self.query(move |m| m.status().tail(n)).await
    }

    pub async fn selected_device(&self) -> Result<Option<Device>, CoreError> {
        self.query(|m| m.devices().selected()).await
    }

    /// Register a synchronous observer on the status stream.
    pub async fn subscribe_log(&self, observer: LogObserver) -> Result<SubscriptionId, CoreError> {
        self.query(move |m| m.status_mut().subscribe(observer)).await
    }

    pub async fn unsubscribe_log(&self, id: SubscriptionId) -> Result<bool, CoreError> {
        self.query(move |m| m.status_mut().unsubscribe(id)).await
    }

    /// Persist now, without stopping.
    pub async fn save(&self) -> Result<(), CoreError> {
        self.query(|m| m.save()).await?
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// Load, start, run `f`, then shut down and persist.
    ///
    /// Meant for the CLI, where every invocation is a single short session.
    pub async fn oneshot<F, Fut, T>(config: ManagerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(config)?;
        controller.start().await?;
        let result = f(controller.clone()).await;
        let saved = controller.shutdown().await;
        let value = result?;
        saved?;
        Ok(value)
    }

    // ── Internals ────────────────────────────────────────────────

    /// Route a request to the processor, or run a query directly against
    /// the parked manager. Holding `parked` across the send keeps a
    /// concurrent shutdown from swapping the channel underneath us.
    async fn dispatch(&self, request: Request) -> Result<(), CoreError> {
        let mut parked = self.inner.parked.lock().await;
        if let Some(manager) = parked.as_mut() {
            return match request {
                Request::Query(job) => {
                    job(manager);
                    Ok(())
                }
                Request::Execute(_) => Err(CoreError::ControllerStopped),
            };
        }
        let request_tx = self.inner.request_tx.lock().await.clone();
        request_tx
            .send(request)
            .await
            .map_err(|_| CoreError::ControllerStopped)
    }

    async fn query<R, F>(&self, f: F) -> Result<R, CoreError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Manager) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: ManagerJob = Box::new(move |m: &mut Manager| {
            let _ = tx.send(f(m));
        });
        self.dispatch(Request::Query(job)).await?;
        rx.await.map_err(|_| CoreError::ControllerStopped)
    }
}

// ── Command processor ────────────────────────────────────────────

type Reply = oneshot::Sender<Result<CommandResult, CoreError>>;
type DeviceWork = BoxFuture<'static, Result<Option<DeviceBackup>, CoreError>>;

/// Result of off-task work, applied back on the processor task.
enum Resolved {
    Connect {
        id: EntityId,
        seq: u64,
        outcome: Result<Duration, CoreError>,
    },
    Probe {
        address: EndpointAddress,
        outcome: ProbeOutcome,
        reply: Reply,
    },
    Maintenance {
        id: EntityId,
        op: MaintenanceOp,
        outcome: Result<Option<DeviceBackup>, CoreError>,
        reply: Reply,
    },
}

struct Processor {
    manager: Manager,
    transport: Arc<dyn SoftwareTransport>,
    device_link: Arc<dyn DeviceLink>,
    tasks: JoinSet<()>,
    resolved_tx: mpsc::UnboundedSender<Resolved>,
    resolved_rx: mpsc::UnboundedReceiver<Resolved>,
}

impl Processor {
    fn new(
        manager: Manager,
        transport: Arc<dyn SoftwareTransport>,
        device_link: Arc<dyn DeviceLink>,
    ) -> Self {
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();
        Self {
            manager,
            transport,
            device_link,
            tasks: JoinSet::new(),
            resolved_tx,
            resolved_rx,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Request>, cancel: CancellationToken) -> Manager {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(resolved) = self.resolved_rx.recv() => self.apply(resolved),
                Some(_) = self.tasks.join_next(), if !self.tasks.is_empty() => {}
                request = rx.recv() => {
                    let Some(request) = request else { break };
                    match request {
                        Request::Execute(envelope) => self.route(envelope),
                        Request::Query(job) => job(&mut self.manager),
                    }
                }
            }
        }
        self.tasks.abort_all();
        for (id, seq) in self.manager.abandon_pending_connects() {
            self.transport.abandon(&id, seq);
        }
        debug!("command processor exiting");
        self.manager
    }

    // ── Command routing ──────────────────────────────────────────

    fn route(&mut self, envelope: CommandEnvelope) {
        let CommandEnvelope {
            command,
            response_tx,
        } = envelope;
        debug!(?command, "routing command");

        let result = match command {
            // ── Devices ──────────────────────────────────────────
            Command::SelectDevice { id } => {
                Ok(CommandResult::Selection(self.manager.select_device(&id)))
            }
            Command::BeginRename { id } => self.manager.begin_rename(&id).map(CommandResult::Device),
            Command::CommitRename { id, name } => self
                .manager
                .commit_rename(&id, &name)
                .map(CommandResult::Device),
            Command::CancelRename { id } => self
                .manager
                .cancel_rename(&id)
                .and_then(|_| self.manager.device_for(&id))
                .map(CommandResult::Device),
            Command::UnregisterDevice { id } => self
                .manager
                .unregister_device(&id)
                .map(CommandResult::Device),
            Command::PairDevice(request) => self
                .manager
                .apply_device_event(DeviceEvent::Discovered(request.into()))
                .map(CommandResult::Device),
            Command::DeviceEvent(event) => self
                .manager
                .apply_device_event(event)
                .map(CommandResult::Device),

            Command::CalibrateDevice { id } => {
                return self.maintain(id, MaintenanceOp::Calibrate, response_tx, |link, device| {
                    link.calibrate(device).map_ok(|()| None).boxed()
                });
            }
            Command::BackupDevice { id } => {
                return self.maintain(id, MaintenanceOp::Backup, response_tx, |link, device| {
                    link.backup(device).map_ok(Some).boxed()
                });
            }
            Command::RestoreDevice { id, backup } => {
                return self.maintain(id, MaintenanceOp::Restore, response_tx, move |link, device| {
                    link.restore(device, &backup).map_ok(|()| None).boxed()
                });
            }

            // ── Software ─────────────────────────────────────────
            Command::AddEndpoint(request) => self
                .manager
                .add_endpoint(&request.name, &request.host, &request.port)
                .map(CommandResult::Endpoint),
            Command::RemoveEndpoint { id } => {
                let removed = self.manager.remove_endpoint(&id);
                if removed.is_ok() {
                    self.release(&id);
                }
                removed.map(CommandResult::Endpoint)
            }
            Command::Connect { id } => self.connect(&id),
            Command::Disconnect { id } => {
                let disconnected = self.manager.request_disconnect(&id);
                if disconnected.is_ok() {
                    self.release(&id);
                }
                disconnected.map(|d| CommandResult::Endpoint(d.endpoint))
            }
            Command::TestConnection { host, port } => {
                match self.manager.probe_target(&host, &port) {
                    Ok(address) => return self.probe(address, response_tx),
                    Err(e) => Err(e),
                }
            }

            // ── Status ───────────────────────────────────────────
            Command::AppendLog { level, message } => {
                Ok(CommandResult::Log(self.manager.log(level, message)))
            }
            Command::UpdateMetrics(snapshot) => {
                self.manager.status_mut().update_metrics(snapshot);
                Ok(CommandResult::Ok)
            }
        };

        if let Err(e) = &result {
            debug!(error = %e, "command rejected");
        }
        let _ = response_tx.send(result);
    }

    fn connect(&mut self, id: &EntityId) -> Result<CommandResult, CoreError> {
        match self.manager.request_connect(id)? {
            ConnectDisposition::Dispatch(ticket) => {
                let attempt = self.transport.connect(&ticket.id, ticket.seq, &ticket.address);
                let tx = self.resolved_tx.clone();
                self.tasks.spawn(async move {
                    let outcome = attempt.await;
                    let _ = tx.send(Resolved::Connect {
                        id: ticket.id,
                        seq: ticket.seq,
                        outcome,
                    });
                });
            }
            ConnectDisposition::AlreadyConnected | ConnectDisposition::AlreadyPending { .. } => {
                debug!(%id, "connect is a no-op");
            }
        }
        self.manager
            .endpoints()
            .get(id)
            .map(CommandResult::Endpoint)
            .ok_or_else(|| CoreError::endpoint_not_found(id))
    }

    fn probe(&mut self, address: EndpointAddress, reply: Reply) {
        let probe = self.transport.probe(&address);
        let tx = self.resolved_tx.clone();
        self.tasks.spawn(async move {
            let outcome = probe.await;
            let _ = tx.send(Resolved::Probe {
                address,
                outcome,
                reply,
            });
        });
    }

    fn maintain<F>(&mut self, id: EntityId, op: MaintenanceOp, reply: Reply, start: F)
    where
        F: FnOnce(&dyn DeviceLink, &Device) -> DeviceWork,
    {
        let device = match self.manager.device_for(&id) {
            Ok(device) => device,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };
        debug!(%id, %op, "dispatching device command");
        let work = start(self.device_link.as_ref(), &device);
        let tx = self.resolved_tx.clone();
        self.tasks.spawn(async move {
            let outcome = work.await;
            let _ = tx.send(Resolved::Maintenance {
                id,
                op,
                outcome,
                reply,
            });
        });
    }

    /// Drop the transport link for `id`.
    fn release(&mut self, id: &EntityId) {
        let teardown = self.transport.disconnect(id);
        self.tasks.spawn(teardown);
    }

    // ── Resolutions ──────────────────────────────────────────────

    fn apply(&mut self, resolved: Resolved) {
        match resolved {
            Resolved::Connect { id, seq, outcome } => {
                let linked = outcome.is_ok();
                let resolution = self.manager.resolve_connect(&id, seq, outcome);
                // A superseded attempt's link is never the one the registry
                // tracks, even while a newer attempt is still pending.
                if linked && matches!(resolution, Resolution::Stale { .. } | Resolution::Gone) {
                    self.transport.abandon(&id, seq);
                }
            }
            Resolved::Probe {
                address,
                outcome,
                reply,
            } => {
                self.manager.record_probe(&address, &outcome);
                let _ = reply.send(Ok(CommandResult::Probe { address, outcome }));
            }
            Resolved::Maintenance {
                id,
                op,
                outcome,
                reply,
            } => {
                let logged = outcome.as_ref().map(|_| ()).map_err(Clone::clone);
                self.manager.record_maintenance(&id, op, &logged);
                let result = outcome.map(|b| b.map_or(CommandResult::Ok, CommandResult::Backup));
                let _ = reply.send(result);
            }
        }
    }
}
