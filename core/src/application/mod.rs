//! Application layer - Use case services.
//!
//! This module contains the services that orchestrate domain logic and
//! the prober port:
//! - `resolver`: probe candidates in order, first free wins
//! - `notifier`: claim/release/unavailable listeners
//! - `watchdog`: per-claim heartbeat task
//! - `registry`: the allocation registry tying them together

mod notifier;
mod registry;
mod resolver;
mod watchdog;

pub use notifier::{Notifier, SubscriptionId};
pub use registry::{PendingClaim, PortRegistry, PortsSnapshot};
pub use resolver::resolve;
pub use watchdog::Watchdog;
