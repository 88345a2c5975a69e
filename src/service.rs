//! Wiring and lifecycle: the aggregation pipeline as a runnable service.
//!
//! Three background tasks: an ingress pump draining raw payloads from a
//! flume channel, an interval ticker, and an egress dispatcher. The pump and
//! ticker drive the shared [`WindowController`] through its single lock and
//! broadcast each finished summary inline (non-blocking), then queue it for
//! the dispatcher. One dispatcher serializes egress publishes, so summaries
//! reach the output topic in window order and egress latency never delays
//! local delivery or the next ingress event.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::aggregate::{Summary, WindowController, WindowProgress};
use crate::broadcast::{BroadcastHub, HubError, Subscription};
use crate::config::{AggregationConfig, HubConfig};
use crate::egress::SummaryPublisher;
use crate::event::BroadcastMessage;
use crate::ingress;

/// Owns the controller, the fan-out hub, and the egress handle.
///
/// The hub is an explicitly shared instance: connection handlers subscribe
/// through the service (or a cloned `Arc` of the hub) rather than through
/// any process-global bus.
pub struct AggregatorService {
    controller: Arc<WindowController>,
    hub: Arc<BroadcastHub>,
    egress: Arc<dyn SummaryPublisher>,
    intake: (flume::Sender<String>, flume::Receiver<String>),
    egress_queue: (flume::Sender<Summary>, flume::Receiver<Summary>),
    workers: Mutex<Option<WorkerState>>,
}

impl AggregatorService {
    pub fn new(
        aggregation: &AggregationConfig,
        hub: &HubConfig,
        egress: Arc<dyn SummaryPublisher>,
    ) -> Self {
        Self {
            controller: Arc::new(WindowController::new(aggregation)),
            hub: BroadcastHub::new(hub),
            egress,
            intake: flume::unbounded(),
            egress_queue: flume::unbounded(),
            workers: Mutex::new(None),
        }
    }

    /// Sender the broker ingress adapter pushes raw message bodies into.
    pub fn intake(&self) -> flume::Sender<String> {
        self.intake.0.clone()
    }

    /// Shared fan-out hub, for handing to connection routers.
    pub fn hub(&self) -> Arc<BroadcastHub> {
        Arc::clone(&self.hub)
    }

    /// Register a new live subscriber.
    pub fn subscribe(&self) -> Result<Subscription, HubError> {
        self.hub.subscribe()
    }

    /// Current-window progress for health/status endpoints. Read-only.
    pub fn status(&self) -> WindowProgress {
        self.controller.progress()
    }

    /// Spawn the ingress pump, the interval ticker, and the egress
    /// dispatcher. Idempotent: calling again while running has no effect.
    pub fn start(&self) {
        let mut guard = self.workers.lock().expect("worker state poisoned");
        if guard.is_some() {
            return;
        }

        let (ticker_shutdown, mut ticker_rx) = oneshot::channel();
        let ticker_handle = {
            let controller = Arc::clone(&self.controller);
            let hub = Arc::clone(&self.hub);
            let egress_queue = self.egress_queue.0.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(controller.interval());
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                // An interval yields immediately on first poll; consume that
                // so the first real trigger lands one full period in.
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = &mut ticker_rx => break,
                        _ = ticker.tick() => {
                            if let Some(summary) = controller.tick() {
                                emit_summary(&hub, &egress_queue, summary);
                            }
                        }
                    }
                }
            })
        };

        let (pump_shutdown, mut pump_rx) = oneshot::channel();
        let pump_handle = {
            let controller = Arc::clone(&self.controller);
            let hub = Arc::clone(&self.hub);
            let egress_queue = self.egress_queue.0.clone();
            let receiver = self.intake.1.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = &mut pump_rx => break,
                        recv = receiver.recv_async() => match recv {
                            Err(_) => break,
                            Ok(raw) => handle_raw(&controller, &hub, &egress_queue, &raw),
                        }
                    }
                }
            })
        };

        let (dispatch_shutdown, mut dispatch_rx) = oneshot::channel();
        let dispatch_handle = {
            let egress = Arc::clone(&self.egress);
            let receiver = self.egress_queue.1.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = &mut dispatch_rx => break,
                        recv = receiver.recv_async() => match recv {
                            Err(_) => break,
                            Ok(summary) => {
                                if let Err(err) = egress.publish_summary(&summary).await {
                                    tracing::warn!(
                                        summary_id = %summary.id,
                                        error = %err,
                                        "summary publish failed; already broadcast locally"
                                    );
                                }
                            }
                        }
                    }
                }
            })
        };

        *guard = Some(WorkerState {
            ticker_shutdown,
            ticker_handle,
            pump_shutdown,
            pump_handle,
            dispatch_shutdown,
            dispatch_handle,
        });
    }

    /// Stop all background tasks.
    ///
    /// The ticker is stopped first so it cannot fire against an egress path
    /// that is being torn down, then the pump, then the egress dispatcher.
    /// Whatever is buffered in the open window is discarded; no summary is
    /// drained out on shutdown.
    pub async fn shutdown(&self) {
        let state = {
            let mut guard = self.workers.lock().expect("worker state poisoned");
            guard.take()
        };
        if let Some(state) = state {
            let _ = state.ticker_shutdown.send(());
            let _ = state.ticker_handle.await;
            let _ = state.pump_shutdown.send(());
            let _ = state.pump_handle.await;
            let _ = state.dispatch_shutdown.send(());
            let _ = state.dispatch_handle.await;
        }
    }
}

impl Drop for AggregatorService {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.workers.lock() {
            if let Some(state) = guard.take() {
                let _ = state.ticker_shutdown.send(());
                state.ticker_handle.abort();
                let _ = state.pump_shutdown.send(());
                state.pump_handle.abort();
                let _ = state.dispatch_shutdown.send(());
                state.dispatch_handle.abort();
            }
        }
    }
}

struct WorkerState {
    ticker_shutdown: oneshot::Sender<()>,
    ticker_handle: JoinHandle<()>,
    pump_shutdown: oneshot::Sender<()>,
    pump_handle: JoinHandle<()>,
    dispatch_shutdown: oneshot::Sender<()>,
    dispatch_handle: JoinHandle<()>,
}

/// One delivery from the ingress adapter: parse, fan out the raw event,
/// fold it into the window, and dispatch a summary if the count trigger
/// fired. Synchronous, so deliveries stay strictly one at a time.
fn handle_raw(
    controller: &Arc<WindowController>,
    hub: &Arc<BroadcastHub>,
    egress_queue: &flume::Sender<Summary>,
    raw: &str,
) {
    match ingress::parse_event(raw) {
        Err(err) => {
            tracing::warn!(error = %err, "skipping malformed event payload");
        }
        Ok(event) => {
            hub.publish(BroadcastMessage::Event(event.clone()));
            if let Some(summary) = controller.observe(&event) {
                emit_summary(hub, egress_queue, summary);
            }
        }
    }
}

/// Hand a finished summary to the local hub and the egress dispatcher.
///
/// The broadcast happens inline — it never blocks — so subscribers see the
/// summary immediately and in window order. The egress publish is queued for
/// the single dispatcher task, which keeps the output topic in window order
/// while neither its latency nor its failures reach the emission site.
fn emit_summary(hub: &BroadcastHub, egress_queue: &flume::Sender<Summary>, summary: Summary) {
    hub.publish(BroadcastMessage::Summary(summary.clone()));
    if egress_queue.send(summary).is_err() {
        tracing::warn!("egress dispatcher stopped; summary not published downstream");
    }
}
