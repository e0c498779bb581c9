//! TCP reachability check

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Default connect timeout for port checks
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Answers "does something accept connections on this port?"
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PortChecker: Send + Sync {
    async fn is_open(&self, port: u16) -> bool;
}

/// Connects to `host:port` with a bounded timeout
#[derive(Debug, Clone)]
pub struct TcpPortChecker {
    host: IpAddr,
    timeout: Duration,
}

impl TcpPortChecker {
    pub fn new(host: IpAddr, timeout: Duration) -> Self {
        Self { host, timeout }
    }
}

impl Default for TcpPortChecker {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT_TIMEOUT)
    }
}

#[async_trait]
impl PortChecker for TcpPortChecker {
    async fn is_open(&self, port: u16) -> bool {
        match timeout(self.timeout, TcpStream::connect((self.host, port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!("Port {}:{} refused: {}", self.host, port, e);
                false
            }
            Err(_) => {
                debug!("Port {}:{} timed out after {:?}", self.host, port, self.timeout);
                false
            }
        }
    }
}
