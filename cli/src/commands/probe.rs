//! Probe command - report whether ports are free right now.

use anyhow::Result;
use portclaim_core::{PortProber, TcpProber};
use serde::Serialize;

#[derive(Serialize)]
struct ProbeRow {
    port: u16,
    free: bool,
    status: String,
}

pub async fn run(ports: &[u16], json: bool) -> Result<()> {
    let prober = TcpProber::new();

    let mut rows = Vec::with_capacity(ports.len());
    for &port in ports {
        let probe = prober.probe(port).await;
        rows.push(ProbeRow {
            port,
            free: probe.is_free(),
            status: probe.to_string(),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<6} STATUS", "PORT");
    println!("{}", "-".repeat(24));
    for row in &rows {
        println!("{:<6} {}", row.port, row.status);
    }

    let free = rows.iter().filter(|r| r.free).count();
    println!("\nFree: {} of {}", free, rows.len());
    Ok(())
}

