use lbroker_common::protocol::error::Result;
use lbroker_common::transport::TcpRouter;
use lbroker_metrics::BrokerMetrics;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::config::BrokerConfig;
use crate::dispatch::Broker;
use crate::termination::BrokerOutcome;

/// A broker bound to its two TCP endpoints.
///
/// Binding happens up front so callers can learn the actual addresses
/// (useful with port 0) before the dispatch loop starts.
pub struct BrokerServer {
    broker: Broker<TcpRouter, TcpRouter>,
    frontend_addr: SocketAddr,
    backend_addr: SocketAddr,
}

impl BrokerServer {
    /// Validates `config` and binds the frontend and backend endpoints.
    ///
    /// # Errors
    /// - `InvalidConfig` if the configuration does not validate
    /// - `Io` if either address cannot be bound
    pub async fn bind(config: BrokerConfig) -> Result<Self> {
        config.validate()?;

        let frontend = TcpRouter::bind("frontend", &config.frontend_addr).await?;
        let backend = TcpRouter::bind("backend", &config.backend_addr).await?;
        let frontend_addr = frontend.local_addr();
        let backend_addr = backend.local_addr();

        info!(frontend = %frontend_addr, backend = %backend_addr, "Broker listening");

        Ok(Self {
            broker: Broker::new(frontend, backend, &config)?,
            frontend_addr,
            backend_addr,
        })
    }

    pub fn frontend_addr(&self) -> SocketAddr {
        self.frontend_addr
    }

    pub fn backend_addr(&self) -> SocketAddr {
        self.backend_addr
    }

    pub fn metrics(&self) -> Arc<BrokerMetrics> {
        self.broker.metrics()
    }

    /// Runs the dispatch loop until the termination policy is satisfied or
    /// the channels fail.
    pub async fn run(self) -> Result<BrokerOutcome> {
        self.broker.run().await
    }

    /// Like [`BrokerServer::run`], also stopping when `shutdown` completes.
    pub async fn run_until<S>(self, shutdown: S) -> Result<BrokerOutcome>
    where
        S: Future<Output = ()>,
    {
        self.broker.run_until(shutdown).await
    }
}
