use bytes::Bytes;

use crate::protocol::envelope::{Envelope, Frame};
use crate::protocol::error::{BrokerError, Result};
use crate::protocol::identity::PeerIdentity;

/// Control signal a worker sends when it can take a request.
pub const READY: &[u8] = b"READY";

/// A client request read from the frontend channel.
///
/// On the wire the client sends `[empty][payload]+`; the channel supplies the
/// client's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    pub client: PeerIdentity,
    pub payload: Vec<Frame>,
}

impl ClientRequest {
    pub fn decode(client: PeerIdentity, frames: Vec<Frame>) -> Result<Self> {
        let (_, payload) = Envelope::parse_hops(frames, 0)?.into_parts();
        Ok(Self { client, payload })
    }

    /// The client's own envelope, `[client][empty][payload]+`.
    pub fn into_envelope(self) -> Envelope {
        Envelope::addressed(self.client, self.payload)
    }
}

/// A finished reply, still addressed to the client that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReply {
    pub client: PeerIdentity,
    pub payload: Vec<Frame>,
}

/// What a worker can say on the backend channel.
///
/// Decoded once at the channel boundary. Workers send either
/// `[empty][READY]` or `[empty][client][empty][reply]+`, so the variant is
/// decided by the envelope shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    Ready,
    Reply(WorkerReply),
}

impl WorkerMessage {
    pub fn decode(frames: Vec<Frame>) -> Result<Self> {
        let (_, payload) = Envelope::parse_hops(frames, 0)?.into_parts();

        if payload.len() == 1 && payload[0].as_ref() == READY {
            return Ok(WorkerMessage::Ready);
        }

        let (route, payload) = Envelope::parse_hops(payload, 1)?.into_parts();
        let client = route.into_iter().next().ok_or_else(|| {
            BrokerError::MalformedEnvelope("reply carries no client address".to_string())
        })?;

        Ok(WorkerMessage::Reply(WorkerReply { client, payload }))
    }

    /// Frames a worker writes for this message.
    pub fn encode(self) -> Vec<Frame> {
        match self {
            WorkerMessage::Ready => vec![Bytes::new(), Bytes::from_static(READY)],
            WorkerMessage::Reply(reply) => {
                let mut frames = vec![Bytes::new()];
                frames.extend(Envelope::addressed(reply.client, reply.payload).into_frames());
                frames
            }
        }
    }
}
