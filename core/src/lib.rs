//! PortClaim Core Library
//!
//! In-process TCP port allocation for named services.
//! Provides functionality to:
//! - Declare a pool of candidate ports (included ranges minus excluded ranges)
//! - Claim the first free port for a service name, or a preferred port
//! - Release claims by name, port or handle
//! - Re-probe claimed ports on a heartbeat and auto-release lost ones
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure business logic and data models
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: Use case services
//!
//! # Example
//! ```no_run
//! use portclaim_core::{EventKind, PortRegistry, RegistryConfig};
//!
//! # async fn run() -> portclaim_core::Result<()> {
//! let registry = PortRegistry::new(RegistryConfig::new().with_heartbeat_ms(500))?;
//! registry.include(Some(4200), Some(4205))?.exclude(Some(4203), None)?;
//!
//! let pending = registry.claim("http", None)?;
//! registry.subscribe(EventKind::Release, |event| println!("{}", event));
//!
//! let claim = pending.await?;
//! println!("http listens on {}", claim.port);
//! # Ok(())
//! # }
//! ```

// Hexagonal architecture layers
pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub mod config;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{Claim, EventKind, PortEvent, PortRange, Release, DEFAULT_RANGE, MAX_PORT};

// Re-export other commonly used types
pub use adapters::TcpProber;
pub use application::{PendingClaim, PortRegistry, PortsSnapshot, SubscriptionId};
pub use config::{ConfigStore, RegistryConfig};
pub use error::{Error, Result};
pub use ports::{PortProber, Probe};
