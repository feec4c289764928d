//! Health command - probe backend health endpoints.

use std::time::Duration;

use anyhow::Result;
use aubergiste_client::check_endpoints;
use serde_json::json;
use tracing::info;

use crate::output::print_json;
use crate::{Cli, OutputFormat};

/// Arguments for the health command.
#[derive(clap::Args)]
pub struct HealthArgs {
    /// Health endpoint URL(s).
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Keep probing on an interval.
    #[arg(long)]
    pub watch: bool,

    /// Seconds between probes in watch mode.
    #[arg(long, default_value_t = 60)]
    pub interval: u64,
}

/// Runs the health command.
pub async fn run(cli: &Cli, args: &HealthArgs) -> Result<()> {
    info!("Probing {} endpoint(s)", args.urls.len());
    let client = super::build_client(cli)?;

    if args.watch {
        loop {
            sweep(cli, &client, &args.urls).await?;
            tokio::time::sleep(Duration::from_secs(args.interval)).await;
        }
    }

    sweep(cli, &client, &args.urls).await
}

async fn sweep(
    cli: &Cli,
    client: &aubergiste_client::ApiClient,
    urls: &[String],
) -> Result<()> {
    let statuses = check_endpoints(client, urls).await;

    match cli.format {
        OutputFormat::Text => {
            for (url, status) in urls.iter().zip(&statuses) {
                let verdict = if status.is_online { "UP  " } else { "DOWN" };
                println!("{verdict}  {url}");
                if let Some(error) = &status.error {
                    println!("      {error}");
                }
            }
        }
        OutputFormat::Json => {
            let report: Vec<_> = urls
                .iter()
                .zip(&statuses)
                .map(|(url, status)| json!({ "url": url, "status": status }))
                .collect();
            print_json(&report, cli.pretty)?;
        }
    }

    Ok(())
}
