//! Command-line client for the nbconvert capability server.
//!
//! Commands:
//! - formats: List export formats and their output media types
//! - cache: Inspect or clear the server's capability cache
//!
//! Configuration via environment:
//! - NBCONVERT_URL: Base URL of the server (default: http://localhost:8888)
//! - NBCONVERT_TOKEN: JWT Bearer token for authentication

mod commands;

use clap::{Parser, Subcommand};

use commands::{cache::CacheArgs, formats::FormatsArgs};

/// nbconvert capability CLI
///
/// Query which document export formats a notebook server offers. Prints
/// JSON by default; pass --human for formatted output.
#[derive(Parser)]
#[command(name = "nbconvert")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output human-readable formatted text instead of JSON
    #[arg(long, global = true)]
    human: bool,

    /// Capability server URL
    #[arg(
        long,
        env = "NBCONVERT_URL",
        default_value = "http://localhost:8888",
        global = true
    )]
    url: String,

    /// JWT Bearer token for authentication
    #[arg(long, env = "NBCONVERT_TOKEN", global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available export formats
    Formats(FormatsArgs),

    /// Inspect or clear the server's capability cache
    Cache(CacheArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let client = match commands::build_client(cli.token.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Formats(args) => {
            commands::formats::execute(&client, &cli.url, cli.human, args).await
        }
        Commands::Cache(args) => commands::cache::execute(&client, &cli.url, cli.human, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
