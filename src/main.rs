//! dexscan - DexScreener new-token scanner
//!
//! Polls freshly profiled tokens, scores them and alerts on the promising
//! ones. Nothing here is financial advice: most new tokens go to zero.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use dex_token_scanner::cli::commands::{self, InspectTarget};
use dex_token_scanner::config::Config;

/// DexScreener token scanner
#[derive(Parser)]
#[command(name = "dexscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "scanner.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scan loop until Ctrl-C
    Scan {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Fetch, analyze and evaluate a single token without exporting
    Inspect {
        /// Chain id, e.g. "solana"
        #[arg(long)]
        chain: String,

        /// Token address (uses its primary pair)
        #[arg(long, conflicts_with = "pair", required_unless_present = "pair")]
        token: Option<String>,

        /// Pair address
        #[arg(long)]
        pair: Option<String>,
    },

    /// Show current configuration
    Config,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("dex_token_scanner=info".parse()?)
        .add_directive("dexscan=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        builder.json().init();
    } else {
        builder.with_file(true).with_line_number(true).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Scan { once } => commands::scan(&config, once).await,
        Commands::Inspect { chain, token, pair } => match (token, pair) {
            (Some(token), _) => commands::inspect(&config, &chain, InspectTarget::Token(&token)).await,
            (None, Some(pair)) => commands::inspect(&config, &chain, InspectTarget::Pair(&pair)).await,
            (None, None) => Err(anyhow::anyhow!("either --token or --pair is required")),
        },
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
