//! Queue command - inspect or clear the persisted offline queue.

use anyhow::Result;
use aubergiste_core::QueueStore;
use aubergiste_store::FileQueueStore;
use clap::Subcommand;
use tracing::info;

use crate::output::print_json;
use crate::{Cli, OutputFormat};

/// Queue subcommands.
#[derive(Subcommand)]
pub enum QueueCommand {
    /// List pending offline requests.
    List,
    /// Remove all pending offline requests.
    Clear,
}

/// Runs the queue command.
pub async fn run(cli: &Cli, command: &QueueCommand) -> Result<()> {
    let store = FileQueueStore::at_default_path();

    match command {
        QueueCommand::List => {
            let pending = store.load().await?;

            match cli.format {
                OutputFormat::Json => print_json(&pending, cli.pretty)?,
                OutputFormat::Text => {
                    if pending.is_empty() {
                        println!("No pending requests");
                    } else {
                        println!("{} pending request(s)", pending.len());
                        for entry in &pending {
                            println!(
                                "  {}  {} {}  (enqueued {})",
                                entry.id,
                                entry.method,
                                entry.url,
                                entry.enqueued_at.to_rfc3339()
                            );
                        }
                    }
                }
            }
        }
        QueueCommand::Clear => {
            let pending = store.load().await?;
            store.save(&[]).await?;
            info!("Cleared offline queue");
            println!("Cleared {} pending request(s)", pending.len());
        }
    }

    Ok(())
}
