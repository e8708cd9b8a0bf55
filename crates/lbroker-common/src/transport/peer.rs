use bytes::Bytes;
use tokio::net::TcpStream;

use crate::protocol::envelope::{Envelope, Frame};
use crate::protocol::error::{BrokerError, Result};
use crate::protocol::identity::PeerIdentity;
use crate::transport::codec::FrameCodec;

/// Peer side of a [`TcpRouter`](crate::transport::TcpRouter) endpoint.
///
/// Clients and workers use this to talk to the broker. The connection
/// announces its identity on connect; the router attaches it to everything
/// the peer sends.
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use lbroker_common::transport::PeerConnection;
///
/// # #[tokio::main]
/// # async fn main() -> lbroker_common::Result<()> {
/// let mut conn = PeerConnection::connect("127.0.0.1:5555", None).await?;
///
/// conn.send_envelope(vec![Bytes::from_static(b"HELLO")]).await?;
/// let reply = conn.recv_envelope().await?;
/// # Ok(())
/// # }
/// ```
pub struct PeerConnection {
    identity: Option<PeerIdentity>,
    stream: TcpStream,
}

impl PeerConnection {
    /// Connects to an endpoint and performs the identity handshake.
    ///
    /// # Arguments
    ///
    /// * `addr` - The address to connect to (e.g., "127.0.0.1:5555")
    /// * `identity` - Identity to announce, or `None` to let the endpoint generate one
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The address cannot be resolved
    /// - Connection fails to all resolved addresses
    /// - The handshake cannot be written
    pub async fn connect(addr: &str, identity: Option<PeerIdentity>) -> Result<Self> {
        let socket_addrs = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| BrokerError::Connection(format!("Invalid address '{}': {}", addr, e)))?;

        // Try each resolved address until one succeeds
        let mut last_err = None;
        let mut connected = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect(socket_addr).await {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(e) => {
                    last_err = Some(e);
                }
            }
        }

        let stream = connected.ok_or_else(|| {
            BrokerError::Connection(format!(
                "Failed to connect to {}: {}",
                addr,
                last_err
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Unknown error".to_string())
            ))
        })?;
        let _ = stream.set_nodelay(true);

        let mut conn = Self { identity, stream };
        let announced = conn
            .identity
            .as_ref()
            .map(PeerIdentity::to_frame)
            .unwrap_or_default();
        conn.send(&[announced]).await?;

        Ok(conn)
    }

    /// The identity announced at connect, if any.
    pub fn identity(&self) -> Option<&PeerIdentity> {
        self.identity.as_ref()
    }

    /// Sends raw frames.
    pub async fn send(&mut self, frames: &[Frame]) -> Result<()> {
        FrameCodec::write_message(&mut self.stream, frames).await
    }

    /// Receives raw frames.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the endpoint closed the connection.
    pub async fn recv(&mut self) -> Result<Vec<Frame>> {
        FrameCodec::read_message(&mut self.stream)
            .await?
            .ok_or_else(|| BrokerError::Connection("connection closed by broker".to_string()))
    }

    /// Sends `[empty][payload]+`, the request/reply framing.
    pub async fn send_envelope(&mut self, payload: Vec<Frame>) -> Result<()> {
        let mut frames = Vec::with_capacity(payload.len() + 1);
        frames.push(Bytes::new());
        frames.extend(payload);
        self.send(&frames).await
    }

    /// Receives `[empty][payload]+` and returns the payload.
    pub async fn recv_envelope(&mut self) -> Result<Vec<Frame>> {
        let frames = self.recv().await?;
        let (_, payload) = Envelope::parse_hops(frames, 0)?.into_parts();
        Ok(payload)
    }
}
