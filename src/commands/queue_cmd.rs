use clap::{Args, Subcommand};

use super::{confirm, OutputFormat};
use crate::db::PendingQueue;

#[derive(Args)]
pub struct QueueCommand {
    #[command(subcommand)]
    pub command: QueueSubcommand,
}

#[derive(Subcommand)]
pub enum QueueSubcommand {
    /// List changes waiting to be replayed
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Drop every queued change without applying it
    Discard {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl QueueCommand {
    pub async fn run(&self, queue: &PendingQueue) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            QueueSubcommand::List { format } => {
                let pending = queue.list().await?;
                if pending.is_empty() {
                    println!("No pending changes");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        let operations: Vec<_> = pending.iter().map(|q| &q.operation).collect();
                        println!("{}", serde_json::to_string_pretty(&operations)?);
                    }
                    OutputFormat::Text => {
                        println!("{:>6}  {:<25}  OPERATION", "ID", "QUEUED AT");
                        println!("{}", "-".repeat(60));
                        for queued in &pending {
                            println!(
                                "{:>6}  {:<25}  {}",
                                queued.id,
                                queued.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                                queued.operation
                            );
                        }
                        println!("\nTotal: {} change(s)", pending.len());
                    }
                }
                Ok(())
            }

            QueueSubcommand::Discard { force } => {
                if !force && !confirm("Discard all pending changes?")? {
                    println!("Cancelled.");
                    return Ok(());
                }

                let dropped = queue.drain_all().await?;
                for queued in &dropped {
                    tracing::info!(id = queued.id, operation = %queued.operation, "discarded pending change");
                }
                println!("Discarded {} change(s)", dropped.len());
                Ok(())
            }
        }
    }
}
