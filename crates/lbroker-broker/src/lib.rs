//! lbroker Broker
//!
//! The load-balancing broker: a frontend channel for clients, a backend
//! channel for workers and a single dispatch loop between them.
//!
//! # Components
//!
//! - [`WorkerQueue`] - bounded FIFO of idle worker identities
//! - [`EnvelopeRouter`] - frontend/backend envelope translation
//! - [`Broker`] - the dispatch loop, generic over [`MessageChannel`]s
//! - [`TerminationPolicy`] / [`RoundTripCounter`] - when the loop stops
//! - [`BrokerServer`] - a [`Broker`] bound to two TCP endpoints
//!
//! [`MessageChannel`]: lbroker_common::transport::MessageChannel

pub mod config;
pub mod dispatch;
pub mod queue;
pub mod router;
pub mod server;
pub mod termination;

pub use config::BrokerConfig;
pub use dispatch::Broker;
pub use queue::WorkerQueue;
pub use router::EnvelopeRouter;
pub use server::BrokerServer;
pub use termination::{BrokerOutcome, RoundTripCounter, TerminationCause, TerminationPolicy};
