//! lbroker Peers
//!
//! The two kinds of peers that connect to an lbroker broker:
//!
//! - [`RequestClient`] connects to the frontend, sends a request and waits
//!   for its reply
//! - [`Worker`] connects to the backend, announces READY and serves the
//!   requests the broker hands it, one at a time

pub mod client;
pub mod worker;

pub use client::RequestClient;
pub use worker::Worker;
