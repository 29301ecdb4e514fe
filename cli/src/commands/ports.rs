//! Ports command - show the pool a registry would draw from.

use anyhow::{bail, Context, Result};
use portclaim_core::{ConfigStore, PortRange, PortRegistry, RegistryConfig};
use tracing::info;

pub fn run(config: RegistryConfig, json: bool) -> Result<()> {
    let registry = PortRegistry::new(config)?;
    let snapshot = registry.ports();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let mut included = format!(
        "{} ({} ports)",
        join(&snapshot.included),
        snapshot.included_ports().len()
    );
    if snapshot.defaulted {
        included.push_str(" (default)");
    }

    let excluded = if snapshot.excluded.is_empty() {
        join(&snapshot.excluded)
    } else {
        format!(
            "{} ({} ports)",
            join(&snapshot.excluded),
            snapshot.excluded_ports().len()
        )
    };

    println!("{:<10} {}", "INCLUDED", included);
    println!("{:<10} {}", "EXCLUDED", excluded);
    println!("{:<10} {}", "AVAILABLE", summarize(&snapshot.available));
    Ok(())
}

/// Persist the pool settings so later runs pick them up without flags.
pub async fn save(store: Option<&ConfigStore>, config: &RegistryConfig) -> Result<()> {
    let Some(store) = store else {
        bail!("no config location; pass --config <PATH>");
    };

    store
        .save(config)
        .await
        .with_context(|| format!("saving {}", store.path().display()))?;
    info!(path = %store.path().display(), "saved config");
    Ok(())
}

fn join(ranges: &[PortRange]) -> String {
    if ranges.is_empty() {
        return "-".to_string();
    }
    ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collapse an ascending port list into runs, e.g. `4200-4202, 4205 (4 ports)`.
fn summarize(ports: &[u16]) -> String {
    if ports.is_empty() {
        return "none".to_string();
    }

    let mut runs: Vec<(u16, u16)> = Vec::new();
    for &port in ports {
        match runs.last_mut() {
            Some((_, end)) if u32::from(*end) + 1 == u32::from(port) => *end = port,
            _ => runs.push((port, port)),
        }
    }

    let text = runs
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}-{}", start, end)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("{} ({} ports)", text, ports.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_runs() {
        assert_eq!(summarize(&[]), "none");
        assert_eq!(summarize(&[80]), "80 (1 ports)");
        assert_eq!(
            summarize(&[4200, 4201, 4202, 4205, 4207, 4208]),
            "4200-4202, 4205, 4207-4208 (6 ports)"
        );
    }

    #[tokio::test]
    async fn test_save_round_trips_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::with_path(dir.path().join("config.json"));
        let config = RegistryConfig::new().with_include("4200-4205".parse().unwrap());

        save(Some(&store), &config).await.unwrap();
        assert_eq!(store.load().await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_save_without_location_fails() {
        assert!(save(None, &RegistryConfig::default()).await.is_err());
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&[]), "-");
        let ranges = ["4200-4205".parse().unwrap(), "4300".parse().unwrap()];
        assert_eq!(join(&ranges), "4200-4205, 4300");
    }
}
