//! Claim domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A named service's reservation of one port.
///
/// Name and port never change once claimed. The registry owns the live
/// record; values handed to callers are read-only copies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier of this claim instance.
    pub id: Uuid,
    /// Service name, unique among live claims.
    pub name: String,
    /// The claimed port.
    pub port: u16,
    /// Heartbeat period in milliseconds, if a watchdog revalidates the port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_ms: Option<u64>,
}

impl Claim {
    pub(crate) fn new(name: impl Into<String>, port: u16, heartbeat_ms: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            port,
            heartbeat_ms,
        }
    }

    /// Get the formatted port number for display (e.g., ":4201").
    pub fn display_port(&self) -> String {
        format!(":{}", self.port)
    }
}

impl std::fmt::Display for Claim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.name, self.port)
    }
}

/// How a release request identifies the claim to drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// Lookup by service name.
    ByName(String),
    /// Lookup by claimed port.
    ByPort(u16),
    /// Lookup by the name carried in a claim handle.
    ByHandle(Claim),
}

impl Release {
    /// Reject identifiers that can never match a claim.
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Release::ByName(name) if name.is_empty() => {
                Err(Error::InvalidArgument("release by empty name".to_string()))
            }
            Release::ByPort(0) => Err(Error::InvalidArgument("release by port 0".to_string())),
            Release::ByHandle(claim) if claim.name.is_empty() => {
                Err(Error::InvalidArgument("release by handle without name".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Check if a live claim is the one this request points at.
    pub fn matches(&self, claim: &Claim) -> bool {
        match self {
            Release::ByName(name) => claim.name == *name,
            Release::ByPort(port) => claim.port == *port,
            Release::ByHandle(handle) => claim.name == handle.name,
        }
    }
}

impl From<&str> for Release {
    fn from(name: &str) -> Self {
        Release::ByName(name.to_string())
    }
}

impl From<String> for Release {
    fn from(name: String) -> Self {
        Release::ByName(name)
    }
}

impl From<u16> for Release {
    fn from(port: u16) -> Self {
        Release::ByPort(port)
    }
}

impl From<&Claim> for Release {
    fn from(claim: &Claim) -> Self {
        Release::ByHandle(claim.clone())
    }
}

impl From<Claim> for Release {
    fn from(claim: Claim) -> Self {
        Release::ByHandle(claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let claim = Claim::new("http", 4201, None);
        assert_eq!(claim.to_string(), "http -> 4201");
        assert_eq!(claim.display_port(), ":4201");
    }

    #[test]
    fn test_release_matches() {
        let claim = Claim::new("http", 4201, Some(500));
        assert!(Release::from("http").matches(&claim));
        assert!(Release::from(4201u16).matches(&claim));
        assert!(Release::from(&claim).matches(&claim));
        assert!(!Release::from("https").matches(&claim));
        assert!(!Release::from(4202u16).matches(&claim));
    }

    #[test]
    fn test_handle_matches_by_name_only() {
        let live = Claim::new("http", 4201, None);
        let stale = Claim::new("http", 4300, None);
        assert!(Release::from(stale).matches(&live));
    }

    #[test]
    fn test_release_validate() {
        assert!(Release::from("").validate().is_err());
        assert!(Release::from(0u16).validate().is_err());
        assert!(Release::from("http").validate().is_ok());
        assert!(Release::from(80u16).validate().is_ok());
    }

    #[test]
    fn test_heartbeat_skipped_when_none() {
        let json = serde_json::to_value(Claim::new("http", 4201, None)).unwrap();
        assert!(json.get("heartbeat_ms").is_none());
        assert_eq!(json["port"], 4201);
    }
}
