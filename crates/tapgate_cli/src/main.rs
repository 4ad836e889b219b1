//! Tapgate CLI
//!
//! Operator and debugging tools for a device's local store.
//!
//! # Commands
//!
//! - `inspect` - Display store statistics and sync backlog
//! - `verify` - Verify the integrity of the event and rule logs
//! - `dump-events` - Dump recorded access events
//! - `simulate` - Run one loopback credential/reader transaction

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tapgate device store tools.
#[derive(Parser)]
#[command(name = "tapgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the device store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store statistics and sync backlog
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify the integrity of the event and rule logs
    Verify,

    /// Dump recorded access events
    DumpEvents {
        /// Only show events for this holder
        #[arg(long)]
        holder: Option<u64>,

        /// Only show events not yet accepted by the authority
        #[arg(long)]
        unsynced_only: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run one loopback credential/reader transaction offline
    Simulate {
        /// Credential id presented by the emulated card
        #[arg(long, default_value = "1")]
        credential: u64,

        /// Holder id presented by the emulated card
        #[arg(long, default_value = "1")]
        holder: u64,

        /// Control point the emulated reader guards
        #[arg(long, default_value = "1")]
        control_point: u64,

        /// Seed a weekday 09:00-17:00 rule for this holder first
        /// (replaces the cached rule set)
        #[arg(long)]
        seed_weekday_rule: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::DumpEvents {
            holder,
            unsynced_only,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for dump-events")?;
            commands::dump_events::run(&path, holder, unsynced_only, &format)?;
        }
        Commands::Simulate {
            credential,
            holder,
            control_point,
            seed_weekday_rule,
        } => {
            let path = cli.path.ok_or("Store path required for simulate")?;
            commands::simulate::run(&path, credential, holder, control_point, seed_weekday_rule)?;
        }
        Commands::Version => {
            println!("Tapgate CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
