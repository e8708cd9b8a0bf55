use lbroker_common::protocol::error::Result;
use lbroker_common::transport::Inbound;
use lbroker_common::{ClientRequest, Envelope, PeerIdentity, WorkerMessage, WorkerReply};

/// Translates between the frontend and backend envelope shapes.
///
/// Clients and workers both speak `[empty][payload]+`; the channels attach
/// (and consume) the peer identity. The router only has to splice the client's
/// address into the worker-bound payload and take it back out of the reply:
///
/// ```text
/// frontend in:  [client][empty][request]+
/// backend out:  [worker][empty][client][empty][request]+
/// backend in:   [worker][empty][client][empty][reply]+   or   [worker][empty][READY]
/// frontend out: [client][empty][reply]+
/// ```
pub struct EnvelopeRouter;

impl EnvelopeRouter {
    /// Decodes a message read from the frontend
    ///
    /// # Errors
    ///
    /// Returns `MalformedEnvelope` if the delimiter is missing, non-empty or
    /// out of position, or if no payload follows it.
    pub fn decode_client(inbound: Inbound) -> Result<ClientRequest> {
        ClientRequest::decode(inbound.identity, inbound.frames)
    }

    /// Decodes a message read from the backend, keeping the sender's identity
    pub fn decode_worker(inbound: Inbound) -> Result<(PeerIdentity, WorkerMessage)> {
        let message = WorkerMessage::decode(inbound.frames)?;
        Ok((inbound.identity, message))
    }

    /// Builds the envelope that hands `request` to `worker`.
    ///
    /// The whole client envelope becomes the payload section.
    pub fn to_backend(worker: PeerIdentity, request: ClientRequest) -> Envelope {
        Envelope::addressed(worker, request.into_envelope().into_frames())
    }

    /// Builds the envelope that returns `reply` to the client that asked for it.
    pub fn to_frontend(reply: WorkerReply) -> Envelope {
        Envelope::addressed(reply.client, reply.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use lbroker_common::BrokerError;

    fn frames(parts: &[&'static [u8]]) -> Vec<Bytes> {
        parts.iter().map(|p| Bytes::from_static(p)).collect()
    }

    fn inbound(identity: &str, parts: &[&'static [u8]]) -> Inbound {
        Inbound {
            identity: PeerIdentity::from(identity),
            frames: frames(parts),
        }
    }

    #[test]
    fn test_client_request_to_backend() {
        let request = EnvelopeRouter::decode_client(inbound("C1", &[b"", b"HELLO"])).unwrap();
        assert_eq!(request.client, PeerIdentity::from("C1"));

        let (to, rest) = EnvelopeRouter::to_backend(PeerIdentity::from("W1"), request)
            .into_outbound()
            .unwrap();

        assert_eq!(to, PeerIdentity::from("W1"));
        assert_eq!(rest, frames(&[b"", b"C1", b"", b"HELLO"]));
    }

    #[test]
    fn test_worker_reply_to_frontend() {
        let (worker, message) =
            EnvelopeRouter::decode_worker(inbound("W1", &[b"", b"C1", b"", b"OK"])).unwrap();
        assert_eq!(worker, PeerIdentity::from("W1"));

        let reply = match message {
            WorkerMessage::Reply(reply) => reply,
            other => panic!("Expected Reply, got {:?}", other),
        };

        let (to, rest) = EnvelopeRouter::to_frontend(reply).into_outbound().unwrap();
        assert_eq!(to, PeerIdentity::from("C1"));
        assert_eq!(rest, frames(&[b"", b"OK"]));
    }

    #[test]
    fn test_multi_frame_payload_preserved() {
        let request =
            EnvelopeRouter::decode_client(inbound("C1", &[b"", b"part-1", b"part-2"])).unwrap();
        let (_, rest) = EnvelopeRouter::to_backend(PeerIdentity::from("W1"), request)
            .into_outbound()
            .unwrap();
        assert_eq!(rest, frames(&[b"", b"C1", b"", b"part-1", b"part-2"]));

        let (_, message) =
            EnvelopeRouter::decode_worker(inbound("W1", &[b"", b"C1", b"", b"a", b"b"])).unwrap();
        match message {
            WorkerMessage::Reply(reply) => assert_eq!(reply.payload, frames(&[b"a", b"b"])),
            other => panic!("Expected Reply, got {:?}", other),
        }
    }

    #[test]
    fn test_worker_ready() {
        let (worker, message) =
            EnvelopeRouter::decode_worker(inbound("W2", &[b"", b"READY"])).unwrap();
        assert_eq!(worker, PeerIdentity::from("W2"));
        assert_eq!(message, WorkerMessage::Ready);
    }

    #[test]
    fn test_malformed_client_request() {
        let result = EnvelopeRouter::decode_client(inbound("C1", &[b"HELLO"]));
        assert!(matches!(result, Err(BrokerError::MalformedEnvelope(_))));

        let result = EnvelopeRouter::decode_client(inbound("C1", &[b""]));
        assert!(matches!(result, Err(BrokerError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_malformed_worker_reply() {
        // reply without the inner delimiter
        let result = EnvelopeRouter::decode_worker(inbound("W1", &[b"", b"C1", b"OK"]));
        assert!(matches!(result, Err(BrokerError::MalformedEnvelope(_))));

        // reply without payload
        let result = EnvelopeRouter::decode_worker(inbound("W1", &[b"", b"C1", b""]));
        assert!(matches!(result, Err(BrokerError::MalformedEnvelope(_))));
    }
}
