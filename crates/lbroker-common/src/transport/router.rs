use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::protocol::envelope::Frame;
use crate::protocol::error::{BrokerError, Result};
use crate::protocol::identity::PeerIdentity;
use crate::transport::channel::{Inbound, MessageChannel};
use crate::transport::codec::FrameCodec;

/// Capacity of the shared inbox all connections feed.
///
/// When the broker stops reading an endpoint, connection readers block on this
/// queue and TCP flow control pushes back on the peers.
const INBOX_CAPACITY: usize = 1024;

/// Capacity of each peer's outbound queue.
///
/// A message for a peer whose queue is full is dropped with `PeerBackpressure`.
pub(crate) const PEER_QUEUE_CAPACITY: usize = 256;

/// How long [`MessageChannel::close`] waits for queued messages to be written.
const LINGER: Duration = Duration::from_secs(1);

type PeerTable = Arc<RwLock<HashMap<PeerIdentity, mpsc::Sender<Vec<Frame>>>>>;

/// Identity-addressed TCP endpoint.
///
/// `TcpRouter` binds a listener and accepts any number of peers. Every peer
/// opens its connection with a one-frame handshake announcing its identity
/// (or an empty frame to have one generated). After that:
///
/// - Messages received from a peer are delivered through [`MessageChannel::recv`]
///   tagged with that peer's identity.
/// - [`MessageChannel::send`] routes a message to the peer with the given
///   identity, or fails with `UnknownPeer`. It never waits: a peer that stops
///   reading fills its queue and further messages fail with `PeerBackpressure`.
///
/// Connections are served by background tasks. [`MessageChannel::close`]
/// writes out what is still queued before closing; dropping the router
/// closes every connection at once.
///
/// # Example
///
/// ```no_run
/// use lbroker_common::transport::{MessageChannel, TcpRouter};
///
/// # #[tokio::main]
/// # async fn main() -> lbroker_common::Result<()> {
/// let mut frontend = TcpRouter::bind("frontend", "127.0.0.1:5555").await?;
///
/// let inbound = frontend.recv().await?;
/// frontend.send(&inbound.identity, inbound.frames).await?;
/// # Ok(())
/// # }
/// ```
pub struct TcpRouter {
    name: String,
    local_addr: SocketAddr,
    inbox: mpsc::Receiver<Result<Inbound>>,
    peers: PeerTable,
    accept_task: JoinHandle<()>,
    stop_accepting: Option<oneshot::Sender<()>>,
}

impl TcpRouter {
    /// Binds a new endpoint.
    ///
    /// # Arguments
    /// * `name` - Label used in logs (e.g. "frontend")
    /// * `bind_addr` - The address to bind to (e.g. "0.0.0.0:5555")
    pub async fn bind(name: &str, bind_addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            BrokerError::Connection(format!("Failed to bind {} to {}: {}", name, bind_addr, e))
        })?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| BrokerError::Connection(format!("Failed to get local addr: {}", e)))?;

        let (inbox_tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let peers: PeerTable = Arc::new(RwLock::new(HashMap::new()));

        let acceptor = Acceptor {
            name: name.to_string(),
            peers: peers.clone(),
            inbox: inbox_tx,
            next_id: Arc::new(AtomicU32::new(0)),
        };
        let (stop_accepting, stop) = oneshot::channel();
        let accept_task = tokio::spawn(acceptor.run(listener, stop));

        info!(channel = name, addr = %local_addr, "Channel bound");

        Ok(Self {
            name: name.to_string(),
            local_addr,
            inbox,
            peers,
            accept_task,
            stop_accepting: Some(stop_accepting),
        })
    }

    /// Gets the actual bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of peers currently connected.
    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }
}

#[async_trait]
impl MessageChannel for TcpRouter {
    async fn recv(&mut self) -> Result<Inbound> {
        match self.inbox.recv().await {
            Some(inbound) => inbound,
            None => Err(BrokerError::ChannelFailure(format!(
                "{} channel closed",
                self.name
            ))),
        }
    }

    async fn send(&mut self, to: &PeerIdentity, frames: Vec<Frame>) -> Result<()> {
        let sender = self
            .peers
            .read()
            .await
            .get(to)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownPeer(to.clone()))?;

        sender.try_send(frames).map_err(|e| match e {
            TrySendError::Full(_) => BrokerError::PeerBackpressure(to.clone()),
            TrySendError::Closed(_) => BrokerError::UnknownPeer(to.clone()),
        })
    }

    async fn close(&mut self) {
        let Some(stop) = self.stop_accepting.take() else {
            return;
        };

        // Dropping the senders lets each writer drain its queue and finish.
        self.peers.write().await.clear();
        let _ = stop.send(());

        if tokio::time::timeout(LINGER, &mut self.accept_task).await.is_err() {
            warn!(channel = %self.name, "Connections still open after linger period");
        }
        info!(channel = %self.name, "Channel closed");
    }
}

impl Drop for TcpRouter {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// State shared by the accept loop and every connection it spawns.
#[derive(Clone)]
struct Acceptor {
    name: String,
    peers: PeerTable,
    inbox: mpsc::Sender<Result<Inbound>>,
    next_id: Arc<AtomicU32>,
}

impl Acceptor {
    /// Accepts connections until `stop` fires, the listener fails or the task
    /// is aborted.
    ///
    /// Connection tasks live in a `JoinSet` owned by this future, so aborting
    /// the accept task tears every connection down with it. After `stop` the
    /// listener is closed and the remaining connections are awaited.
    async fn run(self, listener: TcpListener, mut stop: oneshot::Receiver<()>) {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut stop => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        debug!(channel = %self.name, addr = %peer_addr, "Connection accepted");
                        connections.spawn(self.clone().serve(stream, peer_addr));
                    }
                    Err(e) => {
                        error!(channel = %self.name, error = %e, "Accept failed");
                        let failure = BrokerError::ChannelFailure(format!(
                            "{} failed to accept connections: {}",
                            self.name, e
                        ));
                        let _ = self.inbox.send(Err(failure)).await;
                        return;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        while connections.join_next().await.is_some() {}
    }

    /// Serves one connection: handshake, then read and write until either side stops.
    async fn serve(self, stream: TcpStream, peer_addr: SocketAddr) {
        let _ = stream.set_nodelay(true);
        let (mut reader, mut writer) = stream.into_split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<Frame>>(PEER_QUEUE_CAPACITY);
        let identity = match self.handshake(&mut reader, outbound_tx).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(channel = %self.name, addr = %peer_addr, error = %e, "Handshake rejected");
                return;
            }
        };

        info!(channel = %self.name, peer = %identity, addr = %peer_addr, "Peer connected");

        let read_loop = async {
            loop {
                match FrameCodec::read_message(&mut reader).await {
                    Ok(Some(frames)) => {
                        let inbound = Inbound {
                            identity: identity.clone(),
                            frames,
                        };
                        if self.inbox.send(Ok(inbound)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(channel = %self.name, peer = %identity, error = %e, "Read failed");
                        break;
                    }
                }
            }
        };

        let write_loop = async {
            while let Some(frames) = outbound_rx.recv().await {
                if let Err(e) = FrameCodec::write_message(&mut writer, &frames).await {
                    warn!(channel = %self.name, peer = %identity, error = %e, "Write failed");
                    break;
                }
            }
        };

        tokio::select! {
            _ = read_loop => {}
            _ = write_loop => {}
        }

        self.peers.write().await.remove(&identity);
        info!(channel = %self.name, peer = %identity, "Peer disconnected");
    }

    /// Reads the identity announcement and registers the peer.
    ///
    /// An empty announcement gets a generated identity. Announced identities
    /// may not use the generated-identity marker and may not shadow a peer that
    /// is still connected.
    async fn handshake(
        &self,
        reader: &mut OwnedReadHalf,
        outbound: mpsc::Sender<Vec<Frame>>,
    ) -> Result<PeerIdentity> {
        let frames = FrameCodec::read_message(reader)
            .await?
            .ok_or_else(|| BrokerError::Handshake("connection closed before handshake".to_string()))?;

        if frames.len() != 1 {
            return Err(BrokerError::Handshake(format!(
                "expected a single identity frame, got {} frames",
                frames.len()
            )));
        }

        let announced = PeerIdentity::from(frames[0].clone());
        if announced.is_generated() {
            return Err(BrokerError::Handshake(format!(
                "identity {} uses the reserved generated prefix",
                announced
            )));
        }

        let mut peers = self.peers.write().await;

        let identity = if announced.is_empty() {
            loop {
                let candidate = PeerIdentity::generated(self.next_id.fetch_add(1, Ordering::Relaxed));
                if !peers.contains_key(&candidate) {
                    break candidate;
                }
            }
        } else if peers.contains_key(&announced) {
            return Err(BrokerError::Handshake(format!(
                "identity {} is already connected",
                announced
            )));
        } else {
            announced
        };

        peers.insert(identity.clone(), outbound);
        Ok(identity)
    }
}
