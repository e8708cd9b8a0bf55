use lbroker_common::protocol::error::{BrokerError, Result};
use lbroker_common::transport::{Inbound, MessageChannel};
use lbroker_common::{ClientRequest, PeerIdentity, WorkerMessage};
use lbroker_metrics::BrokerMetrics;
use std::future::{self, Future};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::BrokerConfig;
use crate::queue::WorkerQueue;
use crate::router::EnvelopeRouter;
use crate::termination::{BrokerOutcome, RoundTripCounter, TerminationCause};

/// One wake-up of the dispatch loop.
enum Event {
    Shutdown,
    Backend(Result<Inbound>),
    Frontend(Result<Inbound>),
}

/// The load-balancing broker.
///
/// Owns the frontend (client-facing) and backend (worker-facing) channels and
/// runs the dispatch loop over them. Every request goes to exactly one idle
/// worker, chosen strictly in the order workers became available.
///
/// # Dispatch rules
///
/// Each iteration waits on, in priority order:
///
/// 1. **Shutdown**: the future passed to [`Broker::run_until`]
/// 2. **Backend**: always polled; READY admits a worker, a reply is routed to
///    its client and counted as a round-trip
/// 3. **Frontend**: polled only while a worker is idle and no request is
///    held, so requests stay unread in the channel until someone can take them
///
/// A dispatched worker is out of the queue until it sends READY again. A queued
/// worker that has disconnected is skipped and the request goes to the next
/// one; when no queued worker is reachable the request is held for the next
/// READY.
///
/// # Errors
///
/// Per-message problems (malformed envelopes, a full queue, duplicate READY,
/// peers that went away) are logged and dropped. Only a failing channel or a
/// broken queue invariant ends the loop with an error.
pub struct Broker<F, B> {
    frontend: F,
    backend: B,
    queue: WorkerQueue,
    counter: RoundTripCounter,
    metrics: Arc<BrokerMetrics>,
    held: Option<ClientRequest>,
}

impl<F, B> Broker<F, B>
where
    F: MessageChannel,
    B: MessageChannel,
{
    /// Creates a broker over already-bound channels.
    ///
    /// # Arguments
    /// * `frontend` - Channel clients are connected to
    /// * `backend` - Channel workers are connected to
    /// * `config` - Capacity and termination policy (addresses are ignored)
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the configuration does not validate
    pub fn new(frontend: F, backend: B, config: &BrokerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            frontend,
            backend,
            queue: WorkerQueue::new(config.worker_capacity),
            counter: RoundTripCounter::new(config.termination),
            metrics: Arc::new(BrokerMetrics::new()),
            held: None,
        })
    }

    pub fn metrics(&self) -> Arc<BrokerMetrics> {
        self.metrics.clone()
    }

    /// Runs until the termination policy is satisfied or a channel fails.
    pub async fn run(self) -> Result<BrokerOutcome> {
        self.run_until(future::pending()).await
    }

    /// Runs until the termination policy is satisfied, `shutdown` completes or
    /// a channel fails.
    ///
    /// Consumes the broker. Both channels are closed, flushing replies already
    /// routed, before this returns.
    ///
    /// # Errors
    /// - `ChannelFailure` if either channel cannot be read
    /// - `QueueEmpty` if a request was read with no idle worker
    pub async fn run_until<S>(mut self, shutdown: S) -> Result<BrokerOutcome>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            capacity = self.queue.capacity(),
            policy = ?self.counter.policy(),
            "Broker running"
        );

        let result = loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => Event::Shutdown,
                inbound = self.backend.recv() => Event::Backend(inbound),
                inbound = self.frontend.recv(), if self.accepts_requests() => Event::Frontend(inbound),
            };

            match event {
                Event::Shutdown => {
                    info!("Shutdown requested");
                    break Ok(TerminationCause::Shutdown);
                }
                Event::Backend(inbound) => match self.handle_backend(inbound).await {
                    Ok(true) => {
                        info!(
                            round_trips = self.counter.completed(),
                            in_flight = self.metrics.snapshot().in_flight(),
                            "Round-trip target reached"
                        );
                        break Ok(TerminationCause::TargetReached);
                    }
                    Ok(false) => {}
                    Err(e) => break Err(e),
                },
                Event::Frontend(inbound) => {
                    if let Err(e) = self.handle_frontend(inbound).await {
                        break Err(e);
                    }
                }
            }
        };

        self.frontend.close().await;
        self.backend.close().await;

        let snapshot = self.metrics.snapshot().to_json();
        match result {
            Ok(cause) => {
                info!(cause = ?cause, metrics = %snapshot, "Broker terminated");
                Ok(BrokerOutcome {
                    cause,
                    round_trips: self.counter.completed(),
                })
            }
            Err(e) => {
                error!(error = %e, metrics = %snapshot, "Broker terminated abnormally");
                Err(e)
            }
        }
    }

    /// Handles one backend message. Returns `true` when the round-trip target
    /// has been reached.
    async fn handle_backend(&mut self, inbound: Result<Inbound>) -> Result<bool> {
        let (worker, message) = match EnvelopeRouter::decode_worker(inbound?) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.drop_malformed("backend", e);
                return Ok(false);
            }
        };

        match message {
            WorkerMessage::Ready => {
                self.admit(worker);
                if let Some(request) = self.held.take() {
                    self.dispatch(request).await?;
                }
                Ok(false)
            }
            WorkerMessage::Reply(reply) => {
                let client = reply.client.clone();
                let (to, frames) = EnvelopeRouter::to_frontend(reply).into_outbound()?;
                debug!(worker = %worker, client = %client, "Forwarding reply");

                let sent = self.frontend.send(&to, frames).await;
                self.settle_send(sent, &to)?;

                self.metrics.record_reply();
                let reached = self.counter.record();
                debug!(remaining = ?self.counter.remaining(), "Round-trip completed");
                Ok(reached)
            }
        }
    }

    fn admit(&mut self, worker: PeerIdentity) {
        match self.queue.enqueue(worker.clone()) {
            Ok(()) => {
                debug!(worker = %worker, idle = self.queue.len(), "Worker ready");
                self.metrics.record_ready();
                self.metrics.set_idle_workers(self.queue.len());
            }
            Err(BrokerError::AlreadyQueued(_)) => {
                warn!(worker = %worker, "Duplicate READY ignored");
                self.metrics.record_duplicate_ready();
            }
            Err(e) => {
                warn!(worker = %worker, error = %e, "READY rejected");
                self.metrics.record_capacity_rejection();
            }
        }
    }

    fn accepts_requests(&self) -> bool {
        self.held.is_none() && !self.queue.is_empty()
    }

    /// Handles one frontend message by handing it to the front worker.
    async fn handle_frontend(&mut self, inbound: Result<Inbound>) -> Result<()> {
        let request = match EnvelopeRouter::decode_client(inbound?) {
            Ok(request) => request,
            Err(e) => {
                self.drop_malformed("frontend", e);
                return Ok(());
            }
        };
        self.metrics.record_request();

        if self.queue.is_empty() {
            return Err(BrokerError::QueueEmpty);
        }
        self.dispatch(request).await
    }

    /// Hands `request` to the longest-idle worker that still accepts it.
    ///
    /// Workers that have gone away (or stopped reading) are skipped. If the
    /// queue runs out the request is held until the next READY.
    async fn dispatch(&mut self, request: ClientRequest) -> Result<()> {
        while !self.queue.is_empty() {
            let worker = self.queue.dequeue_front()?;
            self.metrics.set_idle_workers(self.queue.len());
            debug!(client = %request.client, worker = %worker, "Dispatching request");

            let (to, frames) = EnvelopeRouter::to_backend(worker, request.clone()).into_outbound()?;
            match self.backend.send(&to, frames).await {
                Ok(()) => {
                    self.metrics.record_dispatch();
                    return Ok(());
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(worker = %to, error = %e, "Worker unreachable, trying next");
                    self.metrics.record_undeliverable();
                }
            }
        }

        debug!(client = %request.client, "No reachable worker, holding request");
        self.held = Some(request);
        Ok(())
    }

    /// Applies the reply send policy: a vanished or stalled client loses the
    /// message, anything fatal stops the loop.
    fn settle_send(&self, sent: Result<()>, to: &PeerIdentity) -> Result<()> {
        match sent {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(peer = %to, error = %e, "Message dropped");
                self.metrics.record_undeliverable();
                Ok(())
            }
        }
    }

    fn drop_malformed(&self, side: &str, e: BrokerError) {
        warn!(channel = side, error = %e, "Dropping malformed message");
        self.metrics.record_malformed();
    }
}
