//! Tests for envelope parsing and worker/client message decoding.

#[cfg(test)]
mod tests {
    use crate::protocol::{BrokerError, ClientRequest, Envelope, PeerIdentity, WorkerMessage, WorkerReply};
    use bytes::Bytes;

    fn frames(parts: &[&'static [u8]]) -> Vec<Bytes> {
        parts.iter().map(|p| Bytes::from_static(p)).collect()
    }

    fn assert_malformed<T: std::fmt::Debug>(result: crate::protocol::Result<T>) {
        match result {
            Err(BrokerError::MalformedEnvelope(_)) => {}
            other => panic!("Expected MalformedEnvelope, got {:?}", other),
        }
    }

    // ============================================================================
    // Envelope
    // ============================================================================

    #[test]
    fn test_parse_hops_single_hop() {
        let (route, payload) = Envelope::parse_hops(frames(&[b"client", b"", b"HELLO"]), 1)
            .unwrap()
            .into_parts();
        assert_eq!(route, vec![PeerIdentity::from("client")]);
        assert_eq!(payload, frames(&[b"HELLO"]));
    }

    #[test]
    fn test_parse_hops_without_route() {
        let (route, payload) = Envelope::parse_hops(frames(&[b"", b"a", b"b"]), 0)
            .unwrap()
            .into_parts();
        assert!(route.is_empty());
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_parse_hops_keeps_nested_envelope_in_payload() {
        let (route, payload) =
            Envelope::parse_hops(frames(&[b"worker", b"", b"client", b"", b"OK"]), 1)
                .unwrap()
                .into_parts();
        assert_eq!(route, vec![PeerIdentity::from("worker")]);
        assert_eq!(payload, frames(&[b"client", b"", b"OK"]));
    }

    #[test]
    fn test_parse_hops_no_payload() {
        assert_malformed(Envelope::parse_hops(frames(&[b"client", b""]), 1));
    }

    #[test]
    fn test_parse_hops_non_empty_delimiter() {
        assert_malformed(Envelope::parse_hops(frames(&[b"client", b"x", b"HELLO"]), 1));
    }

    #[test]
    fn test_parse_hops_delimiter_out_of_position() {
        assert_malformed(Envelope::parse_hops(frames(&[b"", b"client", b"", b"HELLO"]), 2));
    }

    #[test]
    fn test_parse_hops_too_short() {
        assert_malformed(Envelope::parse_hops(frames(&[b"client"]), 1));
        assert_malformed(Envelope::parse_hops(Vec::new(), 0));
    }

    #[test]
    fn test_into_frames_layout() {
        let envelope = Envelope::addressed(
            PeerIdentity::from("client"),
            frames(&[b"part-1", b"part-2"]),
        );
        assert_eq!(
            envelope.into_frames(),
            frames(&[b"client", b"", b"part-1", b"part-2"])
        );
    }

    #[test]
    fn test_into_outbound_splits_destination() {
        let envelope = Envelope::addressed(
            PeerIdentity::from("worker"),
            frames(&[b"client", b"", b"HELLO"]),
        );
        let (destination, rest) = envelope.into_outbound().unwrap();
        assert_eq!(destination, PeerIdentity::from("worker"));
        assert_eq!(rest, frames(&[b"", b"client", b"", b"HELLO"]));
    }

    #[test]
    fn test_into_outbound_without_route() {
        let envelope = Envelope::parse_hops(frames(&[b"", b"orphan"]), 0).unwrap();
        assert_malformed(envelope.into_outbound());
    }

    // ============================================================================
    // Client and worker messages
    // ============================================================================

    #[test]
    fn test_client_request_decode() {
        let request = ClientRequest::decode(PeerIdentity::from("C1"), frames(&[b"", b"HELLO"])).unwrap();
        assert_eq!(request.client, PeerIdentity::from("C1"));
        assert_eq!(request.payload, frames(&[b"HELLO"]));
    }

    #[test]
    fn test_client_request_without_delimiter() {
        assert_malformed(ClientRequest::decode(PeerIdentity::from("C1"), frames(&[b"HELLO"])));
    }

    #[test]
    fn test_worker_ready_decode() {
        let message = WorkerMessage::decode(frames(&[b"", b"READY"])).unwrap();
        assert_eq!(message, WorkerMessage::Ready);
    }

    #[test]
    fn test_worker_reply_decode() {
        let message = WorkerMessage::decode(frames(&[b"", b"C1", b"", b"OK"])).unwrap();
        assert_eq!(
            message,
            WorkerMessage::Reply(WorkerReply {
                client: PeerIdentity::from("C1"),
                payload: frames(&[b"OK"]),
            })
        );
    }

    #[test]
    fn test_worker_reply_keeps_multi_frame_payload() {
        let message = WorkerMessage::decode(frames(&[b"", b"C1", b"", b"a", b"b", b"c"])).unwrap();
        match message {
            WorkerMessage::Reply(reply) => assert_eq!(reply.payload, frames(&[b"a", b"b", b"c"])),
            other => panic!("Expected reply, got {:?}", other),
        }
    }

    #[test]
    fn test_ready_with_extra_frames_is_not_ready() {
        // READY followed by more frames is read as a reply and fails its shape check
        assert_malformed(WorkerMessage::decode(frames(&[b"", b"READY", b"extra"])));
    }

    #[test]
    fn test_worker_reply_missing_inner_delimiter() {
        assert_malformed(WorkerMessage::decode(frames(&[b"", b"C1", b"OK"])));
    }

    #[test]
    fn test_worker_message_encode() {
        assert_eq!(WorkerMessage::Ready.encode(), frames(&[b"", b"READY"]));

        let reply = WorkerMessage::Reply(WorkerReply {
            client: PeerIdentity::from("C1"),
            payload: frames(&[b"OK"]),
        });
        assert_eq!(reply.encode(), frames(&[b"", b"C1", b"", b"OK"]));
    }
}
