//! Sync CLI commands for reconciling the cache with the sheet.

use clap::{Args, Subcommand};

use crate::sheet::SheetsTransport;
use crate::sync::SyncEngine;

/// Replay queued changes and refresh the cache
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show connectivity, sign-in state and pending changes
    Status,
}

impl SyncCommand {
    pub async fn run<T: SheetsTransport>(
        &self,
        engine: &SyncEngine<T>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync(engine).await,
            Some(SyncSubcommand::Status) => self.status(engine).await,
        }
    }

    async fn sync<T: SheetsTransport>(
        &self,
        engine: &SyncEngine<T>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Syncing with sheet...");
        println!();

        let report = engine.process_pending_queue().await?;
        if report.replayed > 0 || report.discarded > 0 {
            println!("  ✓ replayed {} queued change(s)", report.replayed);
        }
        if report.discarded > 0 {
            println!(
                "  ! discarded {} change(s) for words missing from the sheet",
                report.discarded
            );
        }
        if report.conflicts > 0 {
            println!(
                "  ! {} offline add(s) already existed in the sheet; kept the sheet's copy",
                report.conflicts
            );
        }
        if report.remaining > 0 {
            println!("  ✗ {} change(s) still queued", report.remaining);
            if let Some(error) = &report.error {
                return Err(error.clone().into());
            }
        } else if let Some(error) = &report.error {
            println!("    {}", error);
        }

        let count = engine.sync_cache_with_sheet().await?;
        println!("  ✓ cached {} word(s)", count);
        println!();
        println!("Sync complete.");
        Ok(())
    }

    async fn status<T: SheetsTransport>(
        &self,
        engine: &SyncEngine<T>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let client = engine.client();

        println!("Sync Status");
        println!("===========");
        println!();
        println!(
            "Connectivity: {}",
            if engine.is_online() { "online" } else { "offline" }
        );
        println!(
            "Signed in:    {}",
            if client.is_signed_in().await { "yes" } else { "no" }
        );
        println!("Client:       {}", client.state());
        println!("Sheet:        {}", client.layout().data_range());
        println!();
        println!("Cached words:    {}", engine.cache().count().await?);
        println!("Pending changes: {}", engine.pending_count().await?);

        if let Some(error) = engine.last_error().await {
            println!();
            println!("Last error: {}", error);
        }
        Ok(())
    }
}
