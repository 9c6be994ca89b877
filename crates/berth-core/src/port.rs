//! Free-port discovery on the host's own address.
//!
//! A port is free when a TCP connect to it is refused. A successful connect
//! or a timeout means something owns it. This is a liveness probe, not a
//! reservation: two concurrent allocations can pick the same port.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use berth_common::constants::PORT_PROBE_TIMEOUT;
use berth_common::error::{BerthError, Result};
use tokio::net::TcpStream;

/// Outcome of probing one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// Connection refused: nothing is listening.
    Free,
    /// Something accepted the connection, or the probe timed out or failed.
    Taken,
}

/// Scans `[low, high)` on one host address for the first free port.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    host: IpAddr,
    low: u16,
    high: u16,
    timeout: Duration,
}

impl PortAllocator {
    /// Creates an allocator for `[low, high)` on `host`.
    #[must_use]
    pub const fn new(host: IpAddr, low: u16, high: u16) -> Self {
        Self {
            host,
            low,
            high,
            timeout: PORT_PROBE_TIMEOUT,
        }
    }

    /// Overrides the per-port connect timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the probed host address.
    #[must_use]
    pub const fn host(&self) -> IpAddr {
        self.host
    }

    /// Returns the first port in range whose probe is refused.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::PortExhausted`] when no port in the range is free.
    pub async fn allocate(&self) -> Result<u16> {
        for port in self.low..self.high {
            if self.probe(port).await == PortState::Free {
                tracing::debug!(host = %self.host, port, "free port found");
                return Ok(port);
            }
        }
        tracing::warn!(host = %self.host, low = self.low, high = self.high, "port range exhausted");
        Err(BerthError::PortExhausted {
            host: self.host.to_string(),
            low: self.low,
            high: self.high,
        })
    }

    /// Probes a single port.
    pub async fn probe(&self, port: u16) -> PortState {
        let addr = SocketAddr::new(self.host, port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => PortState::Free,
            Ok(Ok(_)) => {
                tracing::trace!(port, "port in use");
                PortState::Taken
            }
            Ok(Err(e)) => {
                tracing::debug!(port, error = %e, "probe failed, treating port as taken");
                PortState::Taken
            }
            Err(_) => {
                tracing::trace!(port, "probe timed out");
                PortState::Taken
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use tokio::net::TcpListener;

    use super::*;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// Returns a port that was free a moment ago.
    async fn released_port() -> u16 {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn listening_port_is_taken() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let allocator = PortAllocator::new(LOCALHOST, port, port + 1);
        assert_eq!(allocator.probe(port).await, PortState::Taken);
    }

    #[tokio::test]
    async fn occupied_range_is_exhausted() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let allocator = PortAllocator::new(LOCALHOST, port, port + 1);
        let err = allocator.allocate().await.unwrap_err();
        assert!(matches!(err, BerthError::PortExhausted { low, .. } if low == port));
    }

    #[tokio::test]
    async fn refused_port_is_allocated() {
        let port = released_port().await;
        let allocator = PortAllocator::new(LOCALHOST, port, port + 1);
        assert_eq!(allocator.allocate().await.unwrap(), port);
    }

    #[tokio::test]
    async fn empty_range_is_exhausted() {
        let allocator = PortAllocator::new(LOCALHOST, 9000, 9000);
        assert!(allocator.allocate().await.is_err());
    }

    #[tokio::test]
    async fn allocation_skips_busy_ports() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let busy = listener.local_addr().unwrap().port();
        // The neighbour is almost always free on a test host; skip if not.
        let Some(high) = busy.checked_add(2) else {
            return;
        };
        let next = busy + 1;
        let allocator = PortAllocator::new(LOCALHOST, busy, high);
        if allocator.probe(next).await == PortState::Free {
            assert_eq!(allocator.allocate().await.unwrap(), next);
        }
    }
}
