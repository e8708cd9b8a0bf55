//! lbroker Common Types and Transport
//!
//! This crate provides the protocol definitions and the multi-frame transport
//! layer shared by the lbroker broker, its clients and its workers.
//!
//! # Overview
//!
//! lbroker is a load-balancing request/reply broker. Clients connect to a
//! *frontend* endpoint, workers connect to a *backend* endpoint, and the broker
//! hands every client request to exactly one idle worker:
//!
//! - **Protocol Layer**: peer identities, envelopes, worker/client messages, errors
//! - **Transport Layer**: identity-addressed multi-frame channels over TCP or memory
//!
//! # Architecture
//!
//! The wire protocol is deliberately small:
//! - **Transport**: TCP, one long-lived connection per peer
//! - **Message Format**: a sequence of frames, each `[flags u8][length u32 big-endian][data]`
//! - **Addressing**: the channel attaches the sender's identity on receipt and
//!   consumes the destination identity on send
//! - **Max Frame Size**: 100 MB (prevents memory exhaustion)
//! - **Max Message Size**: 100 MB across at most 1024 frames
//!
//! # Components
//!
//! - [`protocol`] - Identities, envelopes, control signals and errors
//! - [`transport`] - Frame codec, channel trait and its implementations
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use lbroker_common::{Envelope, PeerIdentity};
//!
//! let client = PeerIdentity::from("client-1");
//! let envelope = Envelope::addressed(client.clone(), vec![Bytes::from_static(b"HELLO")]);
//!
//! let frames = envelope.into_frames();
//! assert_eq!(frames.len(), 3);
//! assert!(frames[1].is_empty());
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
