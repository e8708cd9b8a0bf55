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

use serde::{Deserialize, Serialize};

/// Point-in-time copy of a broker's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Milliseconds since the metrics were created
    pub uptime_ms: u64,
    /// READY signals that admitted a worker to the queue
    pub ready_signals: u64,
    /// READY signals from workers that were already queued
    pub duplicate_ready: u64,
    /// READY signals rejected because the queue was full
    pub capacity_rejections: u64,
    /// Client requests read from the frontend
    pub requests_received: u64,
    /// Requests handed to a worker
    pub requests_dispatched: u64,
    /// Replies forwarded to clients
    pub round_trips: u64,
    /// Messages dropped for a malformed envelope
    pub malformed_dropped: u64,
    /// Sends that failed because the destination peer was gone or not reading
    pub undeliverable: u64,
    /// Workers waiting in the availability queue
    pub idle_workers: usize,
}

impl MetricsSnapshot {
    /// Requests handed to workers that have not come back yet.
    pub fn in_flight(&self) -> u64 {
        self.requests_dispatched.saturating_sub(self.round_trips)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
