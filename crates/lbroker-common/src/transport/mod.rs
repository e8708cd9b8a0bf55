//! lbroker Transport Layer
//!
//! This module provides the identity-addressed, multi-frame channels the broker
//! reads from and writes to.
//!
//! # Architecture
//!
//! - **Codec**: length-prefixed frames linked into messages by a `MORE` flag
//! - **Channel**: the [`MessageChannel`] trait the broker consumes
//! - **Wire Format**: `[flags u8][length u32 big-endian][data]` per frame
//!
//! # Components
//!
//! - **[`FrameCodec`]**: Encode/decode multi-frame messages
//! - **[`MessageChannel`]** / **[`Inbound`]**: Channel seam used by the broker
//! - **[`TcpRouter`]**: TCP endpoint that accepts many identified peers
//! - **[`PeerConnection`]**: Client/worker side of a `TcpRouter`
//! - **[`memory`]**: In-process channel for tests and embedding
//!
//! # Frame Size Limits
//!
//! All readers enforce a maximum frame size of 100 MB, a maximum total
//! message size of 100 MB and at most 1024 frames per message.

pub mod channel;
pub mod codec;
pub mod memory;
pub mod peer;
pub mod router;

pub use channel::{Inbound, MessageChannel};
pub use codec::{FrameCodec, MessageLimits, MAX_FRAMES, MAX_FRAME_SIZE, MAX_MESSAGE_SIZE};
pub use memory::{MemoryChannel, MemoryConnector, MemoryPeer};
pub use peer::PeerConnection;
pub use router::TcpRouter;
