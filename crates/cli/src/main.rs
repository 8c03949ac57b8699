//! LocalStock CLI - ad-hoc searches and signature debugging.
//!
//! # Usage
//!
//! ```bash
//! # Unified search, printed as JSON
//! localstock search "airpods pro" --zip 10001
//!
//! # Second page of results
//! localstock search "airpods pro" --zip 10001 --page 2
//!
//! # Print Walmart signed headers for the configured credentials
//! localstock walmart-headers --timestamp 1700000000000
//! ```
//!
//! # Commands
//!
//! - `search` - Run the unified retailer search
//! - `walmart-headers` - Print the signed Walmart request headers
//!
//! Configuration is read from the same environment variables as the
//! service (see `localstock_storefront::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "localstock")]
#[command(author, version, about = "LocalStock CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every retailer and print the merged results
    Search {
        /// Search text
        query: String,

        /// Postal code for in-store availability
        #[arg(short, long)]
        zip: Option<String>,

        /// Result page (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Print signed Walmart headers for the configured credentials
    WalmartHeaders {
        /// Sign this timestamp (epoch millis) instead of the current time
        #[arg(short, long)]
        timestamp: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays pipeable JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "localstock_storefront=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Search { query, zip, page } => {
            commands::search::run(&query, zip.as_deref(), page).await?;
        }
        Commands::WalmartHeaders { timestamp } => {
            commands::walmart::print_headers(timestamp).await?;
        }
    }
    Ok(())
}
