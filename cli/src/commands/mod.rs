//! Subcommand implementations.

pub mod claim;
pub mod ports;
pub mod probe;

use std::path::PathBuf;

use anyhow::{Context, Result};
use portclaim_core::{ConfigStore, RegistryConfig};
use tracing::debug;

use crate::PoolArgs;

/// Config store for `--config`, or the default location when there is one.
pub fn config_store(path: Option<PathBuf>) -> Option<ConfigStore> {
    match path {
        Some(path) => Some(ConfigStore::with_path(path)),
        None => ConfigStore::new().ok(),
    }
}

/// Load the registry config, then layer command-line pool options on top.
///
/// Command-line ranges replace the file's ranges rather than adding to them.
pub async fn load_config(store: Option<&ConfigStore>, pool: &PoolArgs) -> Result<RegistryConfig> {
    let mut config = match store {
        Some(store) => {
            debug!(path = %store.path().display(), "loading config");
            store
                .load()
                .await
                .with_context(|| format!("loading {}", store.path().display()))?
        }
        None => RegistryConfig::default(),
    };

    if !pool.include.is_empty() {
        config.include = pool.include.clone();
    }
    if !pool.exclude.is_empty() {
        config.exclude = pool.exclude.clone();
    }
    if let Some(ms) = pool.heartbeat_ms {
        config.heartbeat_ms = ms;
    }

    // Fail early on a bad heartbeat with a CLI-friendly message.
    config.heartbeat().context("invalid --heartbeat-ms")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portclaim_core::PortRange;

    #[tokio::test]
    async fn test_cli_ranges_replace_file_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"include": [{"from": 5000, "to": 5010}], "heartbeatMs": 100}"#)
            .unwrap();

        let pool = PoolArgs {
            include: vec!["4200-4205".parse().unwrap()],
            ..PoolArgs::default()
        };
        let store = ConfigStore::with_path(path);
        let config = load_config(Some(&store), &pool).await.unwrap();
        assert_eq!(config.include, vec![PortRange::new(4200, 4205).unwrap()]);
        assert_eq!(config.heartbeat_ms, 100);
    }

    #[tokio::test]
    async fn test_negative_heartbeat_rejected() {
        let pool = PoolArgs {
            heartbeat_ms: Some(-1),
            ..PoolArgs::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.json");
        let store = config_store(Some(missing));
        assert!(load_config(store.as_ref(), &pool).await.is_err());
    }
}
