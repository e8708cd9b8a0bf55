use async_trait::async_trait;

use crate::protocol::envelope::Frame;
use crate::protocol::error::Result;
use crate::protocol::identity::PeerIdentity;

/// A message received on a channel, tagged with its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub identity: PeerIdentity,
    pub frames: Vec<Frame>,
}

/// Identity-addressed, multi-frame message channel.
///
/// This is the seam between the broker and its transport. The channel attaches
/// the sender's identity to every message it receives and consumes the
/// destination identity of every message it sends, so the frames passed in and
/// out never contain the outermost hop.
///
/// # Cancel safety
///
/// The broker waits on several channels at once with `tokio::select!`, which
/// drops the futures that did not complete. `recv` must therefore be cancel
/// safe: dropping an unfinished `recv` future must not lose a message.
#[async_trait]
pub trait MessageChannel: Send {
    /// Waits for the next message from any connected peer.
    ///
    /// # Errors
    ///
    /// Returns `ChannelFailure` when the channel can no longer deliver
    /// messages. Callers treat this as fatal.
    async fn recv(&mut self) -> Result<Inbound>;

    /// Sends `frames` to the peer identified by `to`.
    ///
    /// # Errors
    ///
    /// - `UnknownPeer` if no peer with that identity is connected
    /// - `PeerBackpressure` if the peer's outbound queue is full
    ///
    /// Implementations must not wait for a slow peer.
    async fn send(&mut self, to: &PeerIdentity, frames: Vec<Frame>) -> Result<()>;

    /// Stops accepting peers and flushes messages already handed to `send`.
    ///
    /// Called once when the broker stops. The default does nothing.
    async fn close(&mut self) {}
}
