//! Reachability probing.

use core::future::Future;
use core::time::Duration;
use std::io;

use thiserror::Error as ThisError;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::config::MonitorConfig;

/// Error raised by probe implementations that can fail internally.
///
/// The production [`TcpProbe`] folds every I/O outcome into its boolean result
/// and never raises this. The watchdog maps an error to "unstable" plus a
/// short backoff, so no implementation can take the loop down.
#[derive(Debug, ThisError)]
#[error("reachability probe failed: {0}")]
pub(crate) struct ProbeError(#[from] io::Error);

/// A single bounded-latency connectivity check.
pub(crate) trait ReachabilityProbe {
    /// Returns whether the network is currently reachable. Must complete
    /// within a bounded time regardless of network condition.
    fn probe(&self) -> impl Future<Output = Result<bool, ProbeError>> + Send;
}

/// Probes reachability by opening a TCP connection to a fixed endpoint.
///
/// Timeouts, refusals and resolution failures all map to `Ok(false)`.
#[derive(Debug, Clone)]
pub(crate) struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub(crate) fn from_config(cfg: &MonitorConfig) -> Self {
        Self {
            addr: format!("{}:{}", cfg.probe_host, cfg.probe_port),
            timeout: Duration::from_millis(cfg.probe_timeout_ms),
        }
    }
}

impl ReachabilityProbe for TcpProbe {
    async fn probe(&self) -> Result<bool, ProbeError> {
        let reachable = matches!(
            timeout(self.timeout, TcpStream::connect(&self.addr)).await,
            Ok(Ok(_))
        );
        debug!(addr = %self.addr, reachable, "Probed reachability");
        Ok(reachable)
    }
}
