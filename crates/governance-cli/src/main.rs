//! Governance CLI
//!
//! Runs proposals, open positions and agent histories through the trade
//! governance engine from JSON files and prints the decisions as JSON.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use governance_core::EngineConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "governance-cli",
    author,
    version,
    about = "Trade governance and risk adaptation engine"
)]
struct Cli {
    /// Engine configuration file. Falls back to GOVERNANCE_* environment
    /// variables when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Router configuration file (JSON). Defaults to long/short engines
    /// with both directions enabled.
    #[arg(long, global = true)]
    router: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate proposals through admission and execution routing
    Evaluate {
        /// JSON file holding one request or an array of requests
        #[arg(long)]
        requests: PathBuf,

        /// Agent stats (JSON array) to resolve before evaluating
        #[arg(long)]
        agents: Option<PathBuf>,
    },

    /// Score open positions
    Health {
        /// JSON file holding one health input or an array of them
        #[arg(long)]
        positions: PathBuf,
    },

    /// Resolve agent tiers from aggregated stats or closed trades
    ResolveTiers {
        /// JSON array of per-agent stats
        #[arg(long, conflicts_with = "trades", required_unless_present = "trades")]
        stats: Option<PathBuf>,

        /// JSON array of closed trades
        #[arg(long)]
        trades: Option<PathBuf>,
    },

    /// Check the router against pairs and agents; exits non-zero on violation
    ValidateRouter {
        /// Comma-separated pairs
        #[arg(long, value_delimiter = ',', default_value = "EUR_USD")]
        pairs: Vec<String>,

        /// Comma-separated agent ids
        #[arg(long, value_delimiter = ',')]
        agents: Vec<String>,
    },

    /// Evaluate the ensemble rollback for a performance reading
    Rollback {
        #[arg(long)]
        current: f64,

        #[arg(long)]
        baseline: f64,

        /// Start from an active rollback
        #[arg(long)]
        active: bool,
    },

    /// Print the effective engine configuration
    Config,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "governance_cli=info,trade_governance=info,risk_manager=warn,trading_engine=warn,agent_tracker=info".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::from_env()?,
    };
    let router = match &cli.router {
        Some(path) => commands::read_json(path)?,
        None => Default::default(),
    };

    info!(command = ?cli.command, "Starting governance CLI");

    let output = match cli.command {
        Commands::Evaluate { requests, agents } => {
            let requests = commands::read_one_or_many(&requests)?;
            let agents = match agents {
                Some(path) => commands::read_json(&path)?,
                None => Vec::new(),
            };
            commands::evaluate(config, router, &agents, &requests)?
        }
        Commands::Health { positions } => {
            let inputs = commands::read_one_or_many(&positions)?;
            commands::health(&config, &inputs)
        }
        Commands::ResolveTiers { stats, trades } => {
            let source = match (stats, trades) {
                (Some(path), _) => commands::TierSource::Stats(commands::read_json(&path)?),
                (None, Some(path)) => commands::TierSource::Trades(commands::read_json(&path)?),
                (None, None) => anyhow::bail!("either --stats or --trades is required"),
            };
            commands::resolve_tiers(&config, source)?
        }
        Commands::ValidateRouter { pairs, agents } => {
            commands::validate_router(&router, &pairs, &agents)?
        }
        Commands::Rollback {
            current,
            baseline,
            active,
        } => commands::rollback(&config, current, baseline, active),
        Commands::Config => serde_json::to_value(&config)?,
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["governance-cli", "config", "--json-logs", "--pretty"]).unwrap();
        assert!(cli.json_logs);
        assert!(cli.pretty);
        assert!(matches!(cli.command, Commands::Config));

        let cli = Cli::try_parse_from(["governance-cli", "config"]).unwrap();
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_resolve_tiers_needs_a_source() {
        assert!(Cli::try_parse_from(["governance-cli", "resolve-tiers"]).is_err());
        assert!(Cli::try_parse_from([
            "governance-cli",
            "resolve-tiers",
            "--stats",
            "a.json",
            "--trades",
            "b.json"
        ])
        .is_err());
    }
}
