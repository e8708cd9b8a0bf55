use thiserror::Error;

use crate::protocol::identity::PeerIdentity;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Worker queue at capacity ({0} workers)")]
    CapacityExceeded(usize),

    #[error("Worker {0} is already queued")]
    AlreadyQueued(PeerIdentity),

    #[error("Worker queue is empty")]
    QueueEmpty,

    #[error("Channel failure: {0}")]
    ChannelFailure(String),

    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerIdentity),

    #[error("Peer {0} is not reading, message dropped")]
    PeerBackpressure(PeerIdentity),

    #[error("Handshake error: {0}")]
    Handshake(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Frame too large: {size} bytes (max {max} bytes)")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrokerError {
    /// Errors that end the dispatch loop rather than a single message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrokerError::ChannelFailure(_) | BrokerError::QueueEmpty)
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
