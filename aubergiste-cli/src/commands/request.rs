//! Request command - send an ad-hoc request through the executor.

use std::time::Duration;

use anyhow::{Context, Result};
use aubergiste_core::{Method, RequestDescriptor};
use tracing::info;

use crate::output::{format_envelope, print_json};
use crate::{Cli, OutputFormat};

/// Arguments for the request command.
#[derive(clap::Args)]
pub struct RequestArgs {
    /// HTTP method (get, post, put, patch, delete).
    pub method: String,

    /// Target URL.
    pub url: String,

    /// JSON body.
    #[arg(long)]
    pub body: Option<String>,

    /// Extra header as `name:value`. Repeatable.
    #[arg(long, short = 'H')]
    pub header: Vec<String>,

    /// Skip the automatic retry loop.
    #[arg(long)]
    pub no_retry: bool,

    /// Deadline in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Runs the request command.
pub async fn run(cli: &Cli, args: &RequestArgs) -> Result<()> {
    let method: Method = args
        .method
        .parse()
        .with_context(|| format!("unsupported method: {}", args.method))?;

    let mut builder = RequestDescriptor::builder(method, args.url.clone());

    if let Some(raw) = &args.body {
        let body = serde_json::from_str(raw).context("--body must be valid JSON")?;
        builder = builder.json(body);
    }
    for header in &args.header {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header must be name:value, got: {header}"))?;
        builder = builder.header(name.trim(), value.trim());
    }
    if args.no_retry {
        builder = builder.skip_retry();
    }
    if let Some(seconds) = args.timeout {
        builder = builder.timeout(Duration::from_secs(seconds));
    }

    info!("Sending {} {}", method, args.url);
    let client = super::build_client(cli)?;
    let envelope = client.request(builder.build()).await;

    match cli.format {
        OutputFormat::Json => print_json(&envelope, cli.pretty)?,
        OutputFormat::Text => println!("{}", format_envelope(&envelope)),
    }

    if !envelope.success {
        std::process::exit(1);
    }
    Ok(())
}
