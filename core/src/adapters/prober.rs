//! TCP bind/close prober.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::TcpListener;
use tracing::trace;

use crate::ports::{PortProber, Probe};

/// Probes a port by binding a listener on it and dropping it right away.
///
/// The default prober binds the IPv6 wildcard (dual-stack where the host
/// allows it) and then the IPv4 wildcard, so a service listening on either
/// family makes the port busy.
#[derive(Debug, Clone)]
pub struct TcpProber {
    hosts: Vec<IpAddr>,
}

impl TcpProber {
    /// Create a prober bound to the IPv6 and IPv4 wildcard addresses.
    pub fn new() -> Self {
        Self {
            hosts: vec![
                IpAddr::V6(Ipv6Addr::UNSPECIFIED),
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ],
        }
    }

    /// Create a prober that binds on a single local address.
    pub fn with_host(host: IpAddr) -> Self {
        Self { hosts: vec![host] }
    }

    /// Addresses the prober binds on, in order.
    pub fn hosts(&self) -> &[IpAddr] {
        &self.hosts
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new()
    }
}

async fn bind_once(addr: SocketAddr) -> Probe {
    match TcpListener::bind(addr).await {
        // Dropping the listener closes it before we report success.
        Ok(listener) => {
            drop(listener);
            Probe::Free
        }
        Err(e) if e.kind() == ErrorKind::AddrInUse => Probe::Busy,
        Err(e) => Probe::Failed(e.kind()),
    }
}

impl PortProber for TcpProber {
    async fn probe(&self, port: u16) -> Probe {
        // Binding port 0 would hand out an ephemeral port, not test one.
        if port == 0 {
            return Probe::Failed(ErrorKind::InvalidInput);
        }

        // Busy on any address wins. Otherwise one free address is enough,
        // since a host without IPv6 fails the first bind.
        let mut outcome = None;
        for &host in &self.hosts {
            let probe = bind_once(SocketAddr::new(host, port)).await;
            trace!(port = port, host = %host, result = %probe, "probed port");
            match probe {
                Probe::Busy => return Probe::Busy,
                Probe::Free => outcome = Some(Probe::Free),
                failed => {
                    outcome.get_or_insert(failed);
                }
            }
        }
        outcome.unwrap_or(Probe::Failed(ErrorKind::AddrNotAvailable))
    }
}
