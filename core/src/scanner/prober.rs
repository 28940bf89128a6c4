use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Transport used by the port scanner.
///
/// A refused connection and a timed out one are both reported as closed.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Resolves `host` to the IPv4 address every probe will dial.
    async fn resolve(&self, host: &str) -> Option<IpAddr>;

    async fn probe(&self, addr: SocketAddr) -> bool;
}

/// Plain TCP connect probe. No data is exchanged.
#[derive(Debug, Clone)]
pub struct TcpProber {
    connect_timeout: Duration,
}

impl TcpProber {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn resolve(&self, host: &str) -> Option<IpAddr> {
        // Probing is IPv4 only, literals included.
        if let Ok(ip) = host.parse::<IpAddr>() {
            return ip.is_ipv4().then_some(ip);
        }
        let addrs = tokio::net::lookup_host((host, 0)).await.ok()?;
        addrs.map(|addr| addr.ip()).find(IpAddr::is_ipv4)
    }

    async fn probe(&self, addr: SocketAddr) -> bool {
        match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(%addr, error = %e, "connect failed");
                false
            }
            Err(_elapsed) => false,
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, TcpListener};

    #[tokio::test]
    async fn probe_should_find_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let prober = TcpProber::new(Duration::from_secs(1));
        assert!(prober.probe(addr).await);
    }

    #[tokio::test]
    async fn probe_should_report_refused_as_closed() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let prober = TcpProber::new(Duration::from_secs(1));
        assert!(!prober.probe(addr).await);
    }

    #[tokio::test]
    async fn resolve_should_pass_ip_literals_through() {
        let prober = TcpProber::new(Duration::from_secs(1));
        assert_eq!(
            prober.resolve("127.0.0.1").await,
            Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
        );
    }

    #[tokio::test]
    async fn resolve_should_reject_ipv6_literals() {
        let prober = TcpProber::new(Duration::from_secs(1));
        assert_eq!(prober.resolve("::1").await, None);
        assert_eq!(prober.resolve("2001:db8::7").await, None);
    }

    #[tokio::test]
    #[ignore]
    async fn probe_should_timeout_on_unreachable_ip() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1)), 443);
        let prober = TcpProber::new(Duration::from_millis(100));
        assert!(!prober.probe(addr).await);
    }
}
