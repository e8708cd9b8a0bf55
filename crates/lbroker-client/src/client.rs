use lbroker_common::protocol::error::Result;
use lbroker_common::transport::PeerConnection;
use lbroker_common::{Frame, PeerIdentity};
use tracing::debug;

/// Request/reply client for a broker's frontend.
///
/// Requests on one client are strictly sequential: each `request` waits for
/// its reply before returning. Use one client per concurrent caller.
pub struct RequestClient {
    addr: String,
    conn: PeerConnection,
}

impl RequestClient {
    /// Connects to a broker frontend
    ///
    /// # Arguments
    /// * `addr` - Frontend address (e.g., "127.0.0.1:5555")
    /// * `identity` - Identity to announce, or `None` to have one generated
    pub async fn connect(addr: impl Into<String>, identity: Option<PeerIdentity>) -> Result<Self> {
        let addr = addr.into();
        let conn = PeerConnection::connect(&addr, identity).await?;
        Ok(Self { addr, conn })
    }

    /// Sends a request and waits for the reply payload
    ///
    /// # Errors
    /// - `Connection` if the broker closes the connection first
    /// - `MalformedEnvelope` if the reply is not `[empty][payload]+`
    pub async fn request(&mut self, payload: Vec<Frame>) -> Result<Vec<Frame>> {
        debug!(broker = %self.addr, frames = payload.len(), "Sending request");
        self.conn.send_envelope(payload).await?;
        self.conn.recv_envelope().await
    }

    pub fn identity(&self) -> Option<&PeerIdentity> {
        self.conn.identity()
    }

    pub fn broker_addr(&self) -> &str {
        &self.addr
    }
}
