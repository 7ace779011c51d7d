//! FORMATS command - List export formats offered by the server.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use nbconvert_core::CapabilityMap;
use serde::Serialize;

use super::{HumanReadable, make_request, output};

/// Arguments for the formats command.
#[derive(Args)]
pub struct FormatsArgs {
    /// Only show formats whose output media type contains this text
    #[arg(long)]
    mimetype: Option<String>,
}

/// Export formats as returned by `GET /api/nbconvert`.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct FormatList(pub CapabilityMap);

impl FormatList {
    /// Keep only formats whose media type contains `needle`.
    pub fn filter_mimetype(self, needle: &str) -> Self {
        let mut filtered = CapabilityMap::new();
        for (name, record) in self.0.iter() {
            if record.output_mimetype.contains(needle) {
                filtered.insert(&nbconvert_core::ExporterDescriptor::new(
                    name,
                    record.output_mimetype.clone(),
                ));
            }
        }
        Self(filtered)
    }
}

impl HumanReadable for FormatList {
    fn print_human(&self) {
        println!("{}", "Export Formats".green().bold());
        println!("{}", "=".repeat(60));
        println!();

        if self.0.is_empty() {
            println!("  {}", "(No exporters available)".dimmed());
            return;
        }

        let width = self.0.names().map(str::len).max().unwrap_or(0);
        for (name, record) in self.0.iter() {
            let mimetype = if record.output_mimetype.is_empty() {
                "(multiple files)".dimmed()
            } else {
                record.output_mimetype.cyan()
            };
            println!("  {:width$}  {}", name.bold(), mimetype, width = width);
        }

        println!();
        println!("  {} {}", "Total:".cyan(), self.0.len());
    }
}

/// Execute the formats command.
pub async fn execute(
    client: &reqwest::Client,
    base_url: &str,
    human: bool,
    args: FormatsArgs,
) -> Result<()> {
    let url = format!("{}/api/nbconvert", base_url.trim_end_matches('/'));

    let capabilities: CapabilityMap = make_request(client.get(&url)).await?;
    let mut formats = FormatList(capabilities);
    if let Some(needle) = args.mimetype.as_deref() {
        formats = formats.filter_mimetype(needle);
    }

    output(&formats, human)
}
