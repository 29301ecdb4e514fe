//! Example: Claim ports for a few services and watch the heartbeat.

use std::time::Duration;

use portclaim_core::{PortRegistry, RegistryConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> portclaim_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = PortRegistry::new(RegistryConfig::new().with_heartbeat_ms(500))?;
    registry.include(Some(4200), Some(4210))?;

    registry.subscribe_all(|event| println!("event: {}", event));

    let web = registry.claim("web", None)?;
    let api = registry.claim("api", None)?;
    let web = web.await?;
    let api = api.await?;

    // Only `web` actually binds its port; `api` will be released by the heartbeat.
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", web.port)).await?;
    println!("web listening on {}, api assigned {}", web.port, api.port);

    tokio::time::sleep(Duration::from_millis(1200)).await;

    println!("\n{:<10} PORT", "SERVICE");
    println!("{}", "-".repeat(16));
    for claim in registry.services() {
        println!("{:<10} {}", claim.name, claim.port);
    }

    drop(listener);
    registry.release_all();
    Ok(())
}
