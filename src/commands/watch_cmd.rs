use clap::Args;
use std::time::Duration;

use crate::config::Config;
use crate::sheet::SheetsTransport;
use crate::sync::SyncEngine;

/// Probe connectivity and replay queued changes whenever the sheet comes back
#[derive(Args)]
pub struct WatchCommand {
    /// Seconds between reachability probes (overrides config)
    #[arg(long)]
    pub interval: Option<u64>,
}

impl WatchCommand {
    pub async fn run<T: SheetsTransport>(
        &self,
        engine: &SyncEngine<T>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let seconds = self
            .interval
            .unwrap_or(config.connectivity.probe_interval_secs)
            .max(1);
        let probe_url = config.connectivity.probe_url.as_str();

        println!(
            "Watching connectivity every {}s ({} pending). Press Ctrl+C to stop.",
            seconds,
            engine.pending_count().await?
        );

        let probing = async {
            let mut ticker = tokio::time::interval(Duration::from_secs(seconds));
            loop {
                ticker.tick().await;
                engine.connectivity().refresh(probe_url).await;
            }
        };

        tokio::select! {
            _ = engine.watch_connectivity() => {}
            _ = probing => {}
            result = tokio::signal::ctrl_c() => {
                result?;
                println!();
                println!("Stopped. {} change(s) pending.", engine.pending_count().await?);
            }
        }
        Ok(())
    }
}
