//! CACHE command - Inspect or clear the server's capability cache.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::{HumanReadable, make_request, output, send_request};

/// Arguments for the cache command.
#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    action: CacheAction,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show whether capabilities are cached
    Status,
    /// Drop cached capabilities so the next request rediscovers exporters
    Clear,
}

/// Response from `GET /api/nbconvert/cache`.
#[derive(Debug, Deserialize, Serialize)]
pub struct CacheStatus {
    pub policy: String,
    pub populated: bool,
    pub exporters: usize,
    pub age_secs: Option<u64>,
}

impl HumanReadable for CacheStatus {
    fn print_human(&self) {
        println!("{}", "Capability Cache".green().bold());
        println!("{}", "=".repeat(60));
        println!("  {} {}", "Policy:".cyan(), self.policy);
        if self.populated {
            println!("  {} {} exporters", "Cached:".cyan(), self.exporters);
            if let Some(age) = self.age_secs {
                println!("  {} {}s", "Age:".cyan(), age);
            }
        } else {
            println!("  {} {}", "Cached:".cyan(), "no".dimmed());
        }
    }
}

/// Confirmation printed after clearing.
#[derive(Debug, Serialize)]
struct Cleared {
    cleared: bool,
}

impl HumanReadable for Cleared {
    fn print_human(&self) {
        println!("{}", "Capability cache cleared".green());
    }
}

/// Execute the cache command.
pub async fn execute(
    client: &reqwest::Client,
    base_url: &str,
    human: bool,
    args: CacheArgs,
) -> Result<()> {
    let url = format!("{}/api/nbconvert/cache", base_url.trim_end_matches('/'));

    match args.action {
        CacheAction::Status => {
            let status: CacheStatus = make_request(client.get(&url)).await?;
            output(&status, human)
        }
        CacheAction::Clear => {
            send_request(client.delete(&url)).await?;
            output(&Cleared { cleared: true }, human)
        }
    }
}
