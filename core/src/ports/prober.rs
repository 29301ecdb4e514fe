//! Port prober port (interface).

use std::io::ErrorKind;

/// Outcome of probing one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The port could be bound and was released again.
    Free,
    /// Something else holds the port.
    Busy,
    /// Binding failed for another reason (permission denied, invalid port, ...).
    ///
    /// Callers treat this the same as `Busy`.
    Failed(ErrorKind),
}

impl Probe {
    /// Check if the probe found the port free.
    pub fn is_free(&self) -> bool {
        matches!(self, Probe::Free)
    }
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Probe::Free => f.write_str("free"),
            Probe::Busy => f.write_str("busy"),
            Probe::Failed(kind) => write!(f, "error ({})", kind),
        }
    }
}

/// Port for testing whether a local TCP port is currently free.
///
/// Probing is check-then-act: a port reported free may be taken by someone
/// else before the caller binds it.
pub trait PortProber: Send + Sync {
    /// Probe a single port.
    fn probe(&self, port: u16) -> impl std::future::Future<Output = Probe> + Send;
}
