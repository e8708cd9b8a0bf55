// Copyright 2025 lbroker Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::snapshot::MetricsSnapshot;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

/// Counters for one broker instance.
///
/// Every method takes `&self` and uses relaxed atomics: the counters are
/// independent and only ever read as a snapshot.
#[derive(Debug)]
pub struct BrokerMetrics {
    start_time: Instant,
    ready_signals: AtomicU64,
    duplicate_ready: AtomicU64,
    capacity_rejections: AtomicU64,
    requests_received: AtomicU64,
    requests_dispatched: AtomicU64,
    round_trips: AtomicU64,
    malformed_dropped: AtomicU64,
    undeliverable: AtomicU64,
    idle_workers: AtomicUsize,
}

impl BrokerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            ready_signals: AtomicU64::new(0),
            duplicate_ready: AtomicU64::new(0),
            capacity_rejections: AtomicU64::new(0),
            requests_received: AtomicU64::new(0),
            requests_dispatched: AtomicU64::new(0),
            round_trips: AtomicU64::new(0),
            malformed_dropped: AtomicU64::new(0),
            undeliverable: AtomicU64::new(0),
            idle_workers: AtomicUsize::new(0),
        }
    }

    /// A worker was admitted to the availability queue.
    pub fn record_ready(&self) {
        self.ready_signals.fetch_add(1, Ordering::Relaxed);
    }

    /// A READY arrived from a worker that was already queued.
    pub fn record_duplicate_ready(&self) {
        self.duplicate_ready.fetch_add(1, Ordering::Relaxed);
    }

    /// A READY was turned away because the queue was full.
    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// A well-formed client request was read from the frontend.
    pub fn record_request(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    /// A request was handed to a worker.
    pub fn record_dispatch(&self) {
        self.requests_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// A reply was forwarded to its client, completing a round-trip.
    pub fn record_reply(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// A message was dropped because its destination had disconnected.
    pub fn record_undeliverable(&self) {
        self.undeliverable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_idle_workers(&self, count: usize) {
        self.idle_workers.store(count, Ordering::Relaxed);
    }

    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    pub fn ready_signals(&self) -> u64 {
        self.ready_signals.load(Ordering::Relaxed)
    }

    pub fn requests_received(&self) -> u64 {
        self.requests_received.load(Ordering::Relaxed)
    }

    pub fn idle_workers(&self) -> usize {
        self.idle_workers.load(Ordering::Relaxed)
    }

    /// Takes a snapshot of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_ms: self.start_time.elapsed().as_millis() as u64,
            ready_signals: self.ready_signals.load(Ordering::Relaxed),
            duplicate_ready: self.duplicate_ready.load(Ordering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(Ordering::Relaxed),
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_dispatched: self.requests_dispatched.load(Ordering::Relaxed),
            round_trips: self.round_trips.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            undeliverable: self.undeliverable.load(Ordering::Relaxed),
            idle_workers: self.idle_workers.load(Ordering::Relaxed),
        }
    }
}

impl Default for BrokerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
