pub mod envelope;
pub mod error;
pub mod identity;
pub mod messages;

#[cfg(test)]
mod tests;

pub use envelope::{Envelope, Frame};
pub use error::{BrokerError, Result};
pub use identity::PeerIdentity;
pub use messages::{ClientRequest, WorkerMessage, WorkerReply, READY};
