//! Domain layer - Pure business logic and data models.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no I/O dependencies and can be tested in isolation.

mod claim;
mod event;
mod range;

// Re-export all domain types
pub use claim::{Claim, Release};
pub use event::{EventKind, PortEvent};
pub use range::{available, expand, PortRange, DEFAULT_RANGE, MAX_PORT};
