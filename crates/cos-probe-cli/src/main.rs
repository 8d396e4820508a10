use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "cos-probe")]
#[command(about = "Check clipboard sync storage connectivity and layout", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check bucket connectivity and list the oplog and snapshot prefixes
    Check {
        /// Path to the storage configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Sync user whose prefixes are checked
        #[arg(short, long, default_value = cos_probe_core::DEFAULT_USER_ID)]
        user_id: String,

        /// Maximum objects listed per prefix
        #[arg(long, default_value_t = cos_probe_core::DEFAULT_MAX_KEYS)]
        max_keys: usize,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show storage usage for a sync user
    Stats {
        /// Path to the storage configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Sync user to report on
        #[arg(short, long, default_value = cos_probe_core::DEFAULT_USER_ID)]
        user_id: String,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the region derived from an endpoint
    Region {
        /// COS endpoint, e.g. https://cos.ap-chengdu.myqcloud.com
        endpoint: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    // Priority: RUST_LOG env var > verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let success = match cli.command {
        Commands::Check {
            config,
            user_id,
            max_keys,
            format,
        } => {
            commands::check::run(
                config,
                &user_id,
                max_keys,
                OutputFormat::from(format.as_str()),
            )
            .await?
        }
        Commands::Stats {
            config,
            user_id,
            format,
        } => commands::stats::run(config, &user_id, OutputFormat::from(format.as_str())).await?,
        Commands::Region { endpoint } => {
            commands::region::run(&endpoint);
            true
        }
    };

    if !success {
        std::process::exit(1);
    }

    Ok(())
}
