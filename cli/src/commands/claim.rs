//! Claim command - reserve ports for named services.

use anyhow::{bail, Result};
use portclaim_core::{Claim, EventKind, PortRegistry, RegistryConfig};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Serialize)]
struct ClaimRow {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run(
    config: RegistryConfig,
    names: &[String],
    port: Option<i64>,
    hold: bool,
    json: bool,
) -> Result<()> {
    if port.is_some() && names.len() > 1 {
        bail!("--port can only be used with a single service name");
    }

    let registry = PortRegistry::new(config)?;

    // Issue every claim before awaiting any: they resolve in this order.
    let mut pending = Vec::with_capacity(names.len());
    for name in names {
        pending.push(registry.claim(name.as_str(), port)?);
    }

    let mut rows = Vec::with_capacity(pending.len());
    let mut failed = 0;
    for claim in pending {
        let name = claim.name().to_string();
        match claim.await {
            Ok(claim) => rows.push(ClaimRow {
                name,
                port: Some(claim.port),
                error: None,
            }),
            Err(e) => {
                failed += 1;
                rows.push(ClaimRow {
                    name,
                    port: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    print_rows(&rows, json)?;

    if hold && failed < rows.len() {
        hold_claims(&registry, json).await?;
    }

    if failed > 0 {
        bail!("{} of {} claims failed", failed, rows.len());
    }
    Ok(())
}

fn print_rows(rows: &[ClaimRow], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    println!("{:<20} {:<6} ERROR", "SERVICE", "PORT");
    println!("{}", "-".repeat(48));
    for row in rows {
        let port = row.port.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<6} {}",
            row.name,
            port,
            row.error.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Keep claims alive until Ctrl-C, reporting heartbeat releases as they happen.
async fn hold_claims(registry: &PortRegistry, json: bool) -> Result<()> {
    let subscription = registry.subscribe(EventKind::Release, move |event| {
        if json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to encode event: {}", e),
            }
        } else {
            println!("{}", event);
        }
    });

    info!("Holding {} claims, press Ctrl-C to release", registry.services().len());
    tokio::signal::ctrl_c().await?;

    registry.unsubscribe(subscription);
    let released: Vec<Claim> = registry.release_all();
    info!("Released {} claims", released.len());
    Ok(())
}
