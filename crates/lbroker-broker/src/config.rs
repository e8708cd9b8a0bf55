use lbroker_common::protocol::error::{BrokerError, Result};

use crate::termination::TerminationPolicy;

/// Default address clients connect to.
pub const DEFAULT_FRONTEND_ADDR: &str = "127.0.0.1:5555";

/// Default address workers connect to.
pub const DEFAULT_BACKEND_ADDR: &str = "127.0.0.1:5556";

/// Default worker-pool capacity.
pub const DEFAULT_WORKER_CAPACITY: usize = 10;

/// Broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Address the frontend (client-facing) endpoint binds to
    ///
    /// Default: 127.0.0.1:5555
    pub frontend_addr: String,
    /// Address the backend (worker-facing) endpoint binds to
    ///
    /// Default: 127.0.0.1:5556
    pub backend_addr: String,
    /// Maximum number of idle workers the availability queue holds
    ///
    /// A READY beyond this is rejected and logged.
    /// Default: 10
    pub worker_capacity: usize,
    /// When the broker stops on its own
    ///
    /// Default: run until shutdown
    pub termination: TerminationPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            frontend_addr: DEFAULT_FRONTEND_ADDR.to_string(),
            backend_addr: DEFAULT_BACKEND_ADDR.to_string(),
            worker_capacity: DEFAULT_WORKER_CAPACITY,
            termination: TerminationPolicy::UntilShutdown,
        }
    }
}

impl BrokerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frontend_addr(mut self, addr: impl Into<String>) -> Self {
        self.frontend_addr = addr.into();
        self
    }

    pub fn with_backend_addr(mut self, addr: impl Into<String>) -> Self {
        self.backend_addr = addr.into();
        self
    }

    pub fn with_worker_capacity(mut self, capacity: usize) -> Self {
        self.worker_capacity = capacity;
        self
    }

    /// Stop after `count` round-trips instead of running until shutdown.
    pub fn with_round_trips(mut self, count: u64) -> Self {
        self.termination = TerminationPolicy::AfterRoundTrips(count);
        self
    }

    pub fn with_termination(mut self, termination: TerminationPolicy) -> Self {
        self.termination = termination;
        self
    }

    /// Checks the configuration before anything is bound.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if:
    /// - Either address is empty, or both are the same
    /// - The worker capacity is zero
    /// - The round-trip target is zero
    pub fn validate(&self) -> Result<()> {
        if self.frontend_addr.trim().is_empty() {
            return Err(BrokerError::InvalidConfig("frontend address is empty".to_string()));
        }
        if self.backend_addr.trim().is_empty() {
            return Err(BrokerError::InvalidConfig("backend address is empty".to_string()));
        }
        if self.frontend_addr == self.backend_addr && !self.frontend_addr.ends_with(":0") {
            return Err(BrokerError::InvalidConfig(format!(
                "frontend and backend share address {}",
                self.frontend_addr
            )));
        }
        if self.worker_capacity == 0 {
            return Err(BrokerError::InvalidConfig(
                "worker capacity must be at least 1".to_string(),
            ));
        }
        if self.termination == TerminationPolicy::AfterRoundTrips(0) {
            return Err(BrokerError::InvalidConfig(
                "round-trip target must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BrokerConfig::default();
        assert_eq!(config.frontend_addr, "127.0.0.1:5555");
        assert_eq!(config.backend_addr, "127.0.0.1:5556");
        assert_eq!(config.worker_capacity, 10);
        assert_eq!(config.termination, TerminationPolicy::UntilShutdown);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builders() {
        let config = BrokerConfig::new()
            .with_frontend_addr("0.0.0.0:7000")
            .with_backend_addr("0.0.0.0:7001")
            .with_worker_capacity(3)
            .with_round_trips(30);

        assert_eq!(config.frontend_addr, "0.0.0.0:7000");
        assert_eq!(config.backend_addr, "0.0.0.0:7001");
        assert_eq!(config.worker_capacity, 3);
        assert_eq!(config.termination, TerminationPolicy::AfterRoundTrips(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        let config = BrokerConfig::new().with_worker_capacity(0);
        assert!(matches!(config.validate(), Err(BrokerError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_zero_round_trips() {
        let config = BrokerConfig::new().with_round_trips(0);
        assert!(matches!(config.validate(), Err(BrokerError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_empty_address() {
        let config = BrokerConfig::new().with_frontend_addr("  ");
        assert!(matches!(config.validate(), Err(BrokerError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_shared_address() {
        let config = BrokerConfig::new()
            .with_frontend_addr("127.0.0.1:6000")
            .with_backend_addr("127.0.0.1:6000");
        assert!(matches!(config.validate(), Err(BrokerError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_allows_ephemeral_ports() {
        let config = BrokerConfig::new()
            .with_frontend_addr("127.0.0.1:0")
            .with_backend_addr("127.0.0.1:0");
        assert!(config.validate().is_ok());
    }
}
