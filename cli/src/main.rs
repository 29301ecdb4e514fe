//! PortClaim CLI - Claim and probe local TCP ports
//!
//! A command-line front end for the port registry: probe ports,
//! inspect a port pool, and claim ports for named services.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use portclaim_core::PortRange;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "portclaim")]
#[command(author, version, about = "Claim and probe local TCP ports")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry config file (defaults to ~/.portclaim/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Pool options shared by commands that build a registry.
#[derive(Args, Debug, Clone, Default)]
pub struct PoolArgs {
    /// Include a port or range (e.g. 4200 or 4200-4205); repeatable
    #[arg(short, long = "include", value_name = "RANGE")]
    pub include: Vec<PortRange>,

    /// Exclude a port or range; repeatable
    #[arg(short = 'x', long = "exclude", value_name = "RANGE")]
    pub exclude: Vec<PortRange>,

    /// Heartbeat period in milliseconds (0 disables)
    #[arg(long, value_name = "MS")]
    pub heartbeat_ms: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether ports are free right now
    Probe {
        /// Ports to probe
        #[arg(required = true)]
        ports: Vec<u16>,
    },

    /// Show included, excluded and available ports
    Ports {
        #[command(flatten)]
        pool: PoolArgs,

        /// Write the resulting pool settings back to the config file
        #[arg(long)]
        save: bool,
    },

    /// Claim a port for each named service
    Claim {
        /// Service names
        #[arg(required = true)]
        names: Vec<String>,

        /// Preferred port (single service only)
        #[arg(short, long)]
        port: Option<i64>,

        /// Keep the claims until Ctrl-C, reporting releases
        #[arg(long)]
        hold: bool,

        #[command(flatten)]
        pool: PoolArgs,
    },
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("portclaim=debug,portclaim_core=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portclaim=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Probe { ports } => {
            commands::probe::run(&ports, cli.json).await?;
        }
        Commands::Ports { pool, save } => {
            let store = commands::config_store(cli.config);
            let config = commands::load_config(store.as_ref(), &pool).await?;
            if save {
                commands::ports::save(store.as_ref(), &config).await?;
            }
            commands::ports::run(config, cli.json)?;
        }
        Commands::Claim {
            names,
            port,
            hold,
            pool,
        } => {
            let store = commands::config_store(cli.config);
            let config = commands::load_config(store.as_ref(), &pool).await?;
            commands::claim::run(config, &names, port, hold, cli.json).await?;
        }
    }

    Ok(())
}
