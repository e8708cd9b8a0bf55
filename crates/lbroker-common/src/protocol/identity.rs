use bytes::Bytes;
use std::fmt;

/// Marker byte that prefixes identities generated by a channel.
///
/// Peers announcing their own identity may not use it, so generated and
/// announced identities can never collide.
pub const GENERATED_MARKER: u8 = 0x00;

/// Opaque routing token for a connected peer.
///
/// Identities are assigned (or accepted) by the channel when a peer connects
/// and stay unique for the lifetime of that connection. The broker never looks
/// inside them; it only copies them between envelopes and the worker queue.
/// Cloning is cheap since the bytes are reference counted.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerIdentity(Bytes);

impl PeerIdentity {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        PeerIdentity(bytes.into())
    }

    /// Builds a channel-generated identity: the marker byte followed by a
    /// big-endian counter.
    pub fn generated(counter: u32) -> Self {
        let mut bytes = Vec::with_capacity(5);
        bytes.push(GENERATED_MARKER);
        bytes.extend_from_slice(&counter.to_be_bytes());
        PeerIdentity(Bytes::from(bytes))
    }

    pub fn is_generated(&self) -> bool {
        self.0.first() == Some(&GENERATED_MARKER)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the identity as a frame, ready to be placed in an envelope.
    pub fn to_frame(&self) -> Bytes {
        self.0.clone()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printable = !self.0.is_empty() && self.0.iter().all(|b| (0x20..=0x7e).contains(b));
        if printable {
            // Checked above, every byte is ASCII
            f.write_str(&String::from_utf8_lossy(&self.0))
        } else {
            write!(f, "0x{}", hex::encode(&self.0))
        }
    }
}

impl fmt::Debug for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerIdentity({})", self)
    }
}

impl From<Bytes> for PeerIdentity {
    fn from(bytes: Bytes) -> Self {
        PeerIdentity(bytes)
    }
}

impl From<Vec<u8>> for PeerIdentity {
    fn from(bytes: Vec<u8>) -> Self {
        PeerIdentity(Bytes::from(bytes))
    }
}

impl From<&str> for PeerIdentity {
    fn from(s: &str) -> Self {
        PeerIdentity(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for PeerIdentity {
    fn from(s: String) -> Self {
        PeerIdentity(Bytes::from(s))
    }
}
