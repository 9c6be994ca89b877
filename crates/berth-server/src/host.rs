//! Host identity: the name advertised in application URLs and the address
//! probed for free ports.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use berth_common::config::BerthConfig;

/// Name and address of the container host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    /// Host name used in application URLs.
    pub name: String,
    /// Address used for port probing and, by default, for listening.
    pub ip: IpAddr,
}

impl HostIdentity {
    /// Discovers the identity, preferring `HOST` and `HOSTIP` from config.
    ///
    /// Falls back to the OS host name and its DNS resolution; an unresolvable
    /// name yields the loopback address.
    pub async fn discover(config: &BerthConfig) -> Self {
        let name = config.host.clone().unwrap_or_else(local_hostname);
        let ip = match config.host_ip {
            Some(ip) => ip,
            None => resolve(&name).await,
        };
        tracing::info!(host = %name, %ip, "host identity");
        Self { name, ip }
    }
}

fn local_hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "cannot read host name, using localhost");
            "localhost".to_string()
        }
    }
}

/// First IPv4 address of `name`, else its first address, else loopback.
async fn resolve(name: &str) -> IpAddr {
    match tokio::net::lookup_host((name, 0)).await {
        Ok(addrs) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            addrs
                .iter()
                .find(|a| a.is_ipv4())
                .or_else(|| addrs.first())
                .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), SocketAddr::ip)
        }
        Err(e) => {
            tracing::warn!(host = %name, error = %e, "cannot resolve host name, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn configured_identity_wins() {
        let config = BerthConfig {
            host: Some("node7.example.com".into()),
            host_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))),
            ..BerthConfig::default()
        };
        let identity = HostIdentity::discover(&config).await;
        assert_eq!(identity.name, "node7.example.com");
        assert_eq!(identity.ip, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)));
    }

    #[tokio::test]
    async fn localhost_resolves_to_loopback() {
        assert!(resolve("localhost").await.is_loopback());
    }

    #[test]
    fn os_host_name_is_not_empty() {
        assert!(!local_hostname().is_empty());
    }
}
