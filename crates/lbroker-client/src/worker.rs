use bytes::Bytes;
use lbroker_common::protocol::error::{BrokerError, Result};
use lbroker_common::transport::PeerConnection;
use lbroker_common::{Envelope, Frame, PeerIdentity, WorkerMessage, WorkerReply};
use tracing::{debug, info, warn};

/// Worker peer for a broker's backend.
///
/// The worker signals READY, waits for one request, answers it and signals
/// READY again. The broker never hands it a second request before that.
pub struct Worker {
    addr: String,
    conn: PeerConnection,
}

impl Worker {
    /// Connects to a broker backend
    ///
    /// # Arguments
    /// * `addr` - Backend address (e.g., "127.0.0.1:5556")
    /// * `identity` - Identity to announce, or `None` to have one generated
    pub async fn connect(addr: impl Into<String>, identity: Option<PeerIdentity>) -> Result<Self> {
        let addr = addr.into();
        let conn = PeerConnection::connect(&addr, identity).await?;
        Ok(Self { addr, conn })
    }

    pub fn identity(&self) -> Option<&PeerIdentity> {
        self.conn.identity()
    }

    /// Serves requests until `max_jobs` are done or the broker goes away.
    ///
    /// `handler` gets the request payload and returns the reply payload. After
    /// the last job no READY is sent, so the broker will not route anything
    /// else here.
    ///
    /// # Arguments
    /// * `handler` - Maps a request payload to a reply payload
    /// * `max_jobs` - Stop after this many replies, or `None` to serve forever
    ///
    /// # Returns
    /// The number of requests served. A broker that closes the connection ends
    /// the loop normally.
    pub async fn run<H>(&mut self, mut handler: H, max_jobs: Option<u64>) -> Result<u64>
    where
        H: FnMut(Vec<Frame>) -> Vec<Frame>,
    {
        let mut served = 0;
        info!(broker = %self.addr, "Worker started");

        while max_jobs.map_or(true, |max| served < max) {
            let next = match self.conn.send(&WorkerMessage::Ready.encode()).await {
                Ok(()) => self.conn.recv().await,
                Err(e) => Err(e),
            };

            let frames = match next {
                Ok(frames) => frames,
                Err(BrokerError::Connection(reason)) => {
                    info!(served, reason = %reason, "Broker went away");
                    return Ok(served);
                }
                Err(e) => return Err(e),
            };

            let (client, request) = match decode_job(frames) {
                Ok(job) => job,
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed job");
                    continue;
                }
            };
            debug!(client = %client, "Serving request");

            let mut payload = handler(request);
            if payload.is_empty() {
                payload.push(Bytes::new());
            }

            let reply = WorkerMessage::Reply(WorkerReply { client, payload });
            self.conn.send(&reply.encode()).await?;
            served += 1;
        }

        info!(served, "Worker finished");
        Ok(served)
    }
}

/// Splits `[empty][client][empty][request]+` into the client and the request.
fn decode_job(frames: Vec<Frame>) -> Result<(PeerIdentity, Vec<Frame>)> {
    let (_, inner) = Envelope::parse_hops(frames, 0)?.into_parts();
    let (route, request) = Envelope::parse_hops(inner, 1)?.into_parts();
    let client = route.into_iter().next().ok_or_else(|| {
        BrokerError::MalformedEnvelope("job carries no client address".to_string())
    })?;
    Ok((client, request))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_job() {
        let frames = vec![
            Bytes::new(),
            Bytes::from_static(b"C1"),
            Bytes::new(),
            Bytes::from_static(b"HELLO"),
        ];
        let (client, request) = decode_job(frames).unwrap();
        assert_eq!(client, PeerIdentity::from("C1"));
        assert_eq!(request, vec![Bytes::from_static(b"HELLO")]);
    }

    #[test]
    fn test_decode_job_rejects_bare_payload() {
        let frames = vec![Bytes::new(), Bytes::from_static(b"HELLO")];
        assert!(matches!(decode_job(frames), Err(BrokerError::MalformedEnvelope(_))));
    }
}
