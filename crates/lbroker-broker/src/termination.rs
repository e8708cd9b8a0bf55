/// When the dispatch loop stops on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationPolicy {
    /// Stop after this many replies have been forwarded.
    AfterRoundTrips(u64),
    /// Run until the shutdown signal fires; round-trips are only counted.
    #[default]
    UntilShutdown,
}

/// Counts completed round-trips against the termination policy.
///
/// For `AfterRoundTrips(n)` it starts at `n` outstanding requests and counts
/// down once per forwarded reply.
#[derive(Debug, Clone)]
pub struct RoundTripCounter {
    policy: TerminationPolicy,
    completed: u64,
}

impl RoundTripCounter {
    pub fn new(policy: TerminationPolicy) -> Self {
        Self {
            policy,
            completed: 0,
        }
    }

    /// Records one forwarded reply. Returns `true` once the target is reached.
    pub fn record(&mut self) -> bool {
        self.completed += 1;
        self.is_reached()
    }

    pub fn is_reached(&self) -> bool {
        match self.policy {
            TerminationPolicy::AfterRoundTrips(target) => self.completed >= target,
            TerminationPolicy::UntilShutdown => false,
        }
    }

    /// Round-trips still expected, or `None` when running until shutdown.
    pub fn remaining(&self) -> Option<u64> {
        match self.policy {
            TerminationPolicy::AfterRoundTrips(target) => Some(target.saturating_sub(self.completed)),
            TerminationPolicy::UntilShutdown => None,
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn policy(&self) -> TerminationPolicy {
        self.policy
    }
}

/// Why the dispatch loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationCause {
    /// The configured number of round-trips completed.
    TargetReached,
    /// The shutdown signal fired.
    Shutdown,
}

/// Result of a dispatch loop that terminated normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerOutcome {
    pub cause: TerminationCause,
    pub round_trips: u64,
}
