use clap::{Args, Subcommand};

use super::confirm;
use crate::sheet::SheetsTransport;
use crate::sync::SyncEngine;

#[derive(Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

#[derive(Subcommand)]
pub enum CacheSubcommand {
    /// Remove cached words and pending changes; the sheet is untouched
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl CacheCommand {
    pub async fn run<T: SheetsTransport>(
        &self,
        engine: &SyncEngine<T>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CacheSubcommand::Clear { force } => {
                let pending = engine.pending_count().await?;
                if !force {
                    let prompt = if pending > 0 {
                        format!("Clear the cache and drop {} unsynced change(s)?", pending)
                    } else {
                        "Clear the local cache?".to_string()
                    };
                    if !confirm(&prompt)? {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }

                engine.clear_cache().await?;
                println!("Local cache cleared.");
                Ok(())
            }
        }
    }
}
