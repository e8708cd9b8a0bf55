use bytes::Bytes;

use crate::protocol::error::{BrokerError, Result};
use crate::protocol::identity::PeerIdentity;

/// A single frame of a multi-frame message.
pub type Frame = Bytes;

/// Routing envelope: address frames, an empty delimiter, then the payload.
///
/// ```text
/// [address]* [empty] [payload]+
/// ```
///
/// The route is stored outermost hop first, so the destination of an outbound
/// envelope is its first hop. Payload frames are kept exactly as received; the
/// broker never merges, splits or reorders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    route: Vec<PeerIdentity>,
    payload: Vec<Frame>,
}

impl Envelope {
    /// Creates a single-hop envelope addressed to `to`.
    pub fn addressed(to: PeerIdentity, payload: Vec<Frame>) -> Self {
        Self {
            route: vec![to],
            payload,
        }
    }

    /// Parses an envelope that must carry exactly `hops` address frames.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEnvelope` if:
    /// - The message is too short to hold the delimiter (missing)
    /// - An empty frame appears among the address frames (out of position)
    /// - The frame at index `hops` is not empty (non-empty delimiter)
    /// - No payload frame follows the delimiter
    pub fn parse_hops(frames: Vec<Frame>, hops: usize) -> Result<Self> {
        if frames.len() <= hops {
            return Err(BrokerError::MalformedEnvelope(format!(
                "missing delimiter: expected it at frame {}, message has {} frames",
                hops,
                frames.len()
            )));
        }

        if let Some(position) = frames[..hops].iter().position(|frame| frame.is_empty()) {
            return Err(BrokerError::MalformedEnvelope(format!(
                "delimiter out of position: found at frame {}, expected at frame {}",
                position, hops
            )));
        }

        if !frames[hops].is_empty() {
            return Err(BrokerError::MalformedEnvelope(format!(
                "delimiter frame {} is not empty ({} bytes)",
                hops,
                frames[hops].len()
            )));
        }

        Self::split_at(frames, hops)
    }

    fn split_at(mut frames: Vec<Frame>, delimiter: usize) -> Result<Self> {
        let payload = frames.split_off(delimiter + 1);
        if payload.is_empty() {
            return Err(BrokerError::MalformedEnvelope(
                "no payload frames after delimiter".to_string(),
            ));
        }

        frames.truncate(delimiter);
        let route = frames.into_iter().map(PeerIdentity::from).collect();

        Ok(Self { route, payload })
    }

    /// Removes and returns the outermost hop.
    fn pop_hop(&mut self) -> Option<PeerIdentity> {
        if self.route.is_empty() {
            None
        } else {
            Some(self.route.remove(0))
        }
    }

    pub fn into_parts(self) -> (Vec<PeerIdentity>, Vec<Frame>) {
        (self.route, self.payload)
    }

    /// Flattens the envelope into wire frames: route, delimiter, payload.
    pub fn into_frames(self) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(self.route.len() + 1 + self.payload.len());
        frames.extend(self.route.into_iter().map(PeerIdentity::into_bytes));
        frames.push(Bytes::new());
        frames.extend(self.payload);
        frames
    }

    /// Splits off the outermost hop as the channel destination.
    ///
    /// Returns the destination and the frames to hand to the channel's
    /// `send`, which consumes the destination itself.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEnvelope` if the envelope has no route.
    pub fn into_outbound(mut self) -> Result<(PeerIdentity, Vec<Frame>)> {
        let destination = self.pop_hop().ok_or_else(|| {
            BrokerError::MalformedEnvelope("envelope has no destination".to_string())
        })?;
        Ok((destination, self.into_frames()))
    }
}
