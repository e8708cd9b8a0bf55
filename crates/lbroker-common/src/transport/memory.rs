use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::protocol::envelope::Frame;
use crate::protocol::error::{BrokerError, Result};
use crate::protocol::identity::PeerIdentity;
use crate::transport::channel::{Inbound, MessageChannel};

type PeerTable = Arc<Mutex<HashMap<PeerIdentity, mpsc::UnboundedSender<Vec<Frame>>>>>;

fn lock(peers: &PeerTable) -> MutexGuard<'_, HashMap<PeerIdentity, mpsc::UnboundedSender<Vec<Frame>>>> {
    peers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Creates an in-process channel and the connector used to attach peers to it.
///
/// The channel side goes to the broker; the connector stays with whoever plays
/// clients and workers (usually a test).
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use lbroker_common::transport::{memory, MessageChannel};
///
/// # #[tokio::main]
/// # async fn main() -> lbroker_common::Result<()> {
/// let (mut channel, connector) = memory::channel();
/// let mut peer = connector.connect("W1")?;
///
/// peer.send(vec![Bytes::new(), Bytes::from_static(b"READY")])?;
/// let inbound = channel.recv().await?;
/// assert_eq!(inbound.identity.to_string(), "W1");
///
/// channel.send(&inbound.identity, vec![Bytes::from_static(b"hi")]).await?;
/// assert_eq!(peer.recv().await, Some(vec![Bytes::from_static(b"hi")]));
/// # Ok(())
/// # }
/// ```
pub fn channel() -> (MemoryChannel, MemoryConnector) {
    let (inbox_tx, inbox) = mpsc::unbounded_channel();
    let peers: PeerTable = Arc::new(Mutex::new(HashMap::new()));

    let channel = MemoryChannel {
        inbox,
        peers: peers.clone(),
    };
    let connector = MemoryConnector {
        inbox: inbox_tx,
        peers,
    };

    (channel, connector)
}

/// Broker side of an in-process channel.
pub struct MemoryChannel {
    inbox: mpsc::UnboundedReceiver<Result<Inbound>>,
    peers: PeerTable,
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    async fn recv(&mut self) -> Result<Inbound> {
        match self.inbox.recv().await {
            Some(inbound) => inbound,
            None => Err(BrokerError::ChannelFailure(
                "memory channel has no connectors left".to_string(),
            )),
        }
    }

    async fn send(&mut self, to: &PeerIdentity, frames: Vec<Frame>) -> Result<()> {
        let sender = lock(&self.peers)
            .get(to)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownPeer(to.clone()))?;

        sender
            .send(frames)
            .map_err(|_| BrokerError::UnknownPeer(to.clone()))
    }
}

/// Attaches peers to a [`MemoryChannel`].
#[derive(Clone)]
pub struct MemoryConnector {
    inbox: mpsc::UnboundedSender<Result<Inbound>>,
    peers: PeerTable,
}

impl MemoryConnector {
    /// Connects a peer with the given identity.
    ///
    /// # Errors
    ///
    /// Returns `Handshake` if a peer with the same identity is still connected.
    pub fn connect(&self, identity: impl Into<PeerIdentity>) -> Result<MemoryPeer> {
        let identity = identity.into();
        let (outbound_tx, outbound) = mpsc::unbounded_channel();

        let mut peers = lock(&self.peers);
        if peers.contains_key(&identity) {
            return Err(BrokerError::Handshake(format!(
                "identity {} is already connected",
                identity
            )));
        }
        peers.insert(identity.clone(), outbound_tx);

        Ok(MemoryPeer {
            identity,
            inbox: self.inbox.clone(),
            outbound,
            peers: self.peers.clone(),
        })
    }

    /// Makes the channel's next `recv` report a transport failure.
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self
            .inbox
            .send(Err(BrokerError::ChannelFailure(reason.into())));
    }
}

/// A peer attached to a [`MemoryChannel`]. Dropping it disconnects the peer.
pub struct MemoryPeer {
    identity: PeerIdentity,
    inbox: mpsc::UnboundedSender<Result<Inbound>>,
    outbound: mpsc::UnboundedReceiver<Vec<Frame>>,
    peers: PeerTable,
}

impl MemoryPeer {
    pub fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    /// Sends raw frames to the channel.
    pub fn send(&self, frames: Vec<Frame>) -> Result<()> {
        let inbound = Inbound {
            identity: self.identity.clone(),
            frames,
        };
        self.inbox
            .send(Ok(inbound))
            .map_err(|_| BrokerError::ChannelFailure("memory channel dropped".to_string()))
    }

    /// Sends `[empty][payload]+`.
    pub fn send_envelope(&self, payload: Vec<Frame>) -> Result<()> {
        let mut frames = Vec::with_capacity(payload.len() + 1);
        frames.push(Bytes::new());
        frames.extend(payload);
        self.send(frames)
    }

    /// Waits for the next message addressed to this peer.
    pub async fn recv(&mut self) -> Option<Vec<Frame>> {
        self.outbound.recv().await
    }

    /// Returns a message if one is already waiting.
    pub fn try_recv(&mut self) -> Option<Vec<Frame>> {
        self.outbound.try_recv().ok()
    }
}

impl Drop for MemoryPeer {
    fn drop(&mut self) {
        lock(&self.peers).remove(&self.identity);
    }
}
