//! Cors command - run the CORS diagnostic probe.

use anyhow::Result;
use aubergiste_client::CorsProbeResult;
use tracing::info;

use crate::output::print_json;
use crate::{Cli, OutputFormat};

/// Arguments for the cors command.
#[derive(clap::Args)]
pub struct CorsArgs {
    /// URL to diagnose.
    pub url: String,
}

/// Runs the cors command.
pub async fn run(cli: &Cli, args: &CorsArgs) -> Result<()> {
    info!("Running CORS diagnostic for {}", args.url);
    let client = super::build_client(cli)?;

    let report = client.test_cors_config(&args.url).await;

    match cli.format {
        OutputFormat::Json => print_json(&report, cli.pretty)?,
        OutputFormat::Text => {
            if report.success {
                println!("CORS probes completed for {}", args.url);
                if let Some(basic) = &report.basic {
                    print_probe("Basic GET", basic);
                }
                if let Some(preflight) = &report.preflight {
                    print_probe("OPTIONS preflight", preflight);
                }
            } else {
                println!(
                    "CORS diagnostic failed{}",
                    if report.is_cors { " (cross-origin)" } else { "" }
                );
                if let Some(error) = &report.error {
                    println!("  {error}");
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_probe(label: &str, probe: &CorsProbeResult) {
    println!();
    println!("{label}: {} ({})", probe.status, if probe.ok { "ok" } else { "failed" });
    for (name, value) in &probe.headers {
        match value {
            Some(value) => println!("  {name}: {value}"),
            None => println!("  {name}: <absent>"),
        }
    }
}
