//! Lifecycle notifications emitted by the registry.

use serde::Serialize;

use super::Claim;

/// The three notification kinds a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// A claim succeeded (or an existing claim was re-claimed).
    Claim,
    /// A claim was released.
    Release,
    /// A claim found no free candidate.
    Unavailable,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [EventKind; 3] = [EventKind::Claim, EventKind::Release, EventKind::Unavailable];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Claim => "claim",
            EventKind::Release => "release",
            EventKind::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification delivered to registry listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PortEvent {
    /// Emitted once per successful claim, including idempotent re-claims.
    Claim(Claim),
    /// Emitted once per successful release.
    Release(Claim),
    /// Emitted when a claim exhausted its candidates.
    Unavailable {
        /// Name of the service that asked.
        name: String,
        /// The preferred port, if one was requested.
        #[serde(skip_serializing_if = "Option::is_none")]
        port: Option<u16>,
        /// Rendered error (`"no free port available"`).
        error: String,
    },
}

impl PortEvent {
    /// Kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            PortEvent::Claim(_) => EventKind::Claim,
            PortEvent::Release(_) => EventKind::Release,
            PortEvent::Unavailable { .. } => EventKind::Unavailable,
        }
    }

    /// The claim carried by `Claim` and `Release` events.
    pub fn claim(&self) -> Option<&Claim> {
        match self {
            PortEvent::Claim(claim) | PortEvent::Release(claim) => Some(claim),
            PortEvent::Unavailable { .. } => None,
        }
    }
}

impl std::fmt::Display for PortEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortEvent::Claim(claim) | PortEvent::Release(claim) => {
                write!(f, "{} {}", self.kind(), claim)
            }
            PortEvent::Unavailable { name, error, .. } => {
                write!(f, "unavailable {}: {}", name, error)
            }
        }
    }
}
