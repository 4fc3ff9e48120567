//! Dealbird CLI - weekly deals ingestion and digest delivery.
//!
//! # Usage
//!
//! ```bash
//! # Ingest the weekly deals feed
//! dealbird ingest --deals ./data/deals.json
//!
//! # Seed subscribers
//! dealbird seed --users ./data/users.json
//!
//! # Full weekly run: ingest, then compose and deliver every digest
//! dealbird send
//!
//! # Preview one user's rendered digest without sending
//! dealbird preview -u jane@example.com -o preview.html
//!
//! # Throw away local storage
//! dealbird reset
//! ```
//!
//! # Commands
//!
//! - `ingest` - Upsert the deals feed into storage
//! - `seed` - Upsert subscribers into storage
//! - `send` - Compose and deliver the weekly digest to every subscriber
//! - `preview` - Write one user's rendered digest HTML to a file
//! - `reset` - Drop all stored data

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dealbird")]
#[command(author, version, about = "Dealbird weekly deals automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the weekly deals feed into storage
    Ingest {
        /// Path to the deals JSON file
        #[arg(short, long, default_value = "./data/deals.json")]
        deals: PathBuf,
    },
    /// Seed subscribers into storage
    Seed {
        /// Path to the users JSON file
        #[arg(short, long, default_value = "./data/users.json")]
        users: PathBuf,
    },
    /// Ingest, then compose and deliver the weekly digest to every subscriber
    Send {
        /// Path to the deals JSON file
        #[arg(short, long, default_value = "./data/deals.json")]
        deals: PathBuf,

        /// Skip the ingestion step
        #[arg(long)]
        skip_ingest: bool,

        /// Skip the delivery step (ingest only)
        #[arg(long)]
        skip_send: bool,

        /// Force the console channel instead of the configured provider
        #[arg(long)]
        dry_run: bool,
    },
    /// Write one user's rendered digest HTML to a file
    Preview {
        /// User email to preview (defaults to the first user)
        #[arg(short, long)]
        user: Option<String>,

        /// Output HTML file path
        #[arg(short, long, default_value = "./preview.html")]
        output: PathBuf,

        /// Ingest this deals file first, so the preview has data
        #[arg(short, long)]
        deals: Option<PathBuf>,
    },
    /// Drop all stored data
    Reset,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Ingest { deals } => commands::ingest::run(&deals).await?,
        Commands::Seed { users } => commands::seed::run(&users).await?,
        Commands::Send {
            deals,
            skip_ingest,
            skip_send,
            dry_run,
        } => commands::send::run(&deals, skip_ingest, skip_send, dry_run).await?,
        Commands::Preview {
            user,
            output,
            deals,
        } => commands::preview::run(user.as_deref(), &output, deals.as_deref()).await?,
        Commands::Reset => commands::reset::run().await?,
    }
    Ok(())
}
