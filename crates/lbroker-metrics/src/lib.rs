//! lbroker Metrics Collection
//!
//! This crate provides lock-free counters for the broker's dispatch loop and a
//! serializable snapshot of their current values.
//!
//! # Architecture
//!
//! - [`BrokerMetrics`]: Atomic counters and gauges, shared behind an `Arc`
//! - [`MetricsSnapshot`]: Serializable point-in-time copy of every counter
//!
//! The dispatch loop is the only writer. Readers (tests, the CLI, anything
//! holding the `Arc`) take snapshots at any time without blocking it.
//!
//! # Usage Example
//!
//! ```rust
//! use lbroker_metrics::BrokerMetrics;
//!
//! let metrics = BrokerMetrics::new();
//! metrics.record_ready();
//! metrics.record_dispatch();
//! metrics.record_reply();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.round_trips, 1);
//! ```

mod registry;
mod snapshot;

pub use registry::BrokerMetrics;
pub use snapshot::MetricsSnapshot;
