// ABOUTME: Reachability probe for the cluster API endpoint.
// ABOUTME: Opens a TCP connection to the endpoint with a bounded timeout.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

#[derive(Debug, thiserror::Error)]
pub enum ConnectivityError {
    #[error("connection to {address} failed: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[error("connection to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },
}

/// One observation-only reachability attempt. Safe to repeat.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self, endpoint: &str) -> Result<(), ConnectivityError>;
}

/// Connects to `endpoint:port` and immediately closes the connection.
#[derive(Debug, Clone)]
pub struct TcpConnectivityProbe {
    port: u16,
    timeout: Duration,
}

impl Default for TcpConnectivityProbe {
    fn default() -> Self {
        Self {
            port: 443,
            timeout: Duration::from_secs(10),
        }
    }
}

impl TcpConnectivityProbe {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn probe(&self, endpoint: &str) -> Result<(), ConnectivityError> {
        let address = format!("{}:{}", endpoint, self.port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_stream)) => {
                tracing::debug!(%address, "endpoint reachable");
                Ok(())
            }
            Ok(Err(source)) => Err(ConnectivityError::Connect { address, source }),
            Err(_) => Err(ConnectivityError::Timeout {
                address,
                timeout: self.timeout,
            }),
        }
    }
}
