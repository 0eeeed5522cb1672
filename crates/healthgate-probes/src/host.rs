//! TCP reachability probes.

use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use healthgate_core::config::DEFAULT_HOST_TIMEOUT;
use healthgate_health::Probe;

/// Whether a TCP connection to `host:port` opens within `timeout`.
pub async fn is_host_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(%host, port, error = %e, "host connection failed");
            false
        }
        Err(_) => {
            debug!(%host, port, "host connection timed out");
            false
        }
    }
}

/// Passes when `host:port` accepts a TCP connection.
#[derive(Debug, Clone)]
pub struct HostProbe {
    name: String,
    host: String,
    port: u16,
    timeout: Duration,
}

impl HostProbe {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            timeout: DEFAULT_HOST_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Probe for HostProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> anyhow::Result<String> {
        if !is_host_reachable(&self.host, self.port, self.timeout).await {
            bail!("host '{}' at port {} is not reachable", self.host, self.port);
        }
        Ok(format!("{}:{} -> reachable", self.host, self.port))
    }
}

/// Passes when `host:port` refuses or ignores TCP connections.
#[derive(Debug, Clone)]
pub struct NoHostProbe {
    name: String,
    host: String,
    port: u16,
    timeout: Duration,
}

impl NoHostProbe {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            timeout: DEFAULT_HOST_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Probe for NoHostProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> anyhow::Result<String> {
        if is_host_reachable(&self.host, self.port, self.timeout).await {
            bail!("host '{}' at port {} is reachable", self.host, self.port);
        }
        Ok(format!("{}:{} -> unreachable", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = HostProbe::new("local", "127.0.0.1", port);
        assert_eq!(
            probe.run().await.unwrap(),
            format!("127.0.0.1:{port} -> reachable")
        );

        let inverse = NoHostProbe::new("local", "127.0.0.1", port);
        let err = inverse.run().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("host '127.0.0.1' at port {port} is reachable")
        );
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = HostProbe::new("gone", "127.0.0.1", port).timeout(Duration::from_millis(500));
        let err = probe.run().await.unwrap_err();
        assert!(err.to_string().contains("is not reachable"));

        let inverse =
            NoHostProbe::new("gone", "127.0.0.1", port).timeout(Duration::from_millis(500));
        assert_eq!(
            inverse.run().await.unwrap(),
            format!("127.0.0.1:{port} -> unreachable")
        );
    }
}
