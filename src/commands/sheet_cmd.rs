use clap::{Args, Subcommand};

use super::confirm;
use crate::sheet::SheetsTransport;
use crate::sync::SyncEngine;

#[derive(Args)]
pub struct SheetCommand {
    #[command(subcommand)]
    pub command: SheetSubcommand,
}

#[derive(Subcommand)]
pub enum SheetSubcommand {
    /// Delete every data row in the sheet and all local data
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Write the column names into row 1
    InitHeader,
}

impl SheetCommand {
    pub async fn run<T: SheetsTransport>(
        &self,
        engine: &SyncEngine<T>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SheetSubcommand::Clear { force } => {
                let range = engine.client().layout().data_range();
                if !force
                    && !confirm(&format!(
                        "Permanently clear {} and all local data?",
                        range
                    ))?
                {
                    println!("Cancelled.");
                    return Ok(());
                }

                if engine.clear_all_data().await? {
                    println!("Cleared {} and local data.", range);
                } else {
                    println!("Local data cleared. Sheet not reachable, left untouched.");
                }
                Ok(())
            }

            SheetSubcommand::InitHeader => {
                engine.write_header().await?;
                println!(
                    "Wrote header to {}",
                    engine.client().layout().header_range()
                );
                Ok(())
            }
        }
    }
}
