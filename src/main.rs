use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vocasync::app::{build_engine, load_credentials, Reachability};
use vocasync::commands::{
    AuthCommand, CacheCommand, ConfigCommand, QueueCommand, SheetCommand, SyncCommand,
    WatchCommand, WordsCommand,
};
use vocasync::config::Config;
use vocasync::db::{init_db, PendingQueue};

#[derive(Parser)]
#[command(name = "vocasync")]
#[command(version)]
#[command(about = "Offline-first vocabulary flashcards backed by Google Sheets", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Skip the reachability probe and work from the local cache
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse, add, update, delete and review words
    Words(WordsCommand),

    /// Replay queued changes and refresh the cache
    Sync(SyncCommand),

    /// Inspect or discard changes made while offline
    Queue(QueueCommand),

    /// Manage the local cache
    Cache(CacheCommand),

    /// Maintain the spreadsheet itself
    Sheet(SheetCommand),

    /// Manage the Sheets API access token
    Auth(AuthCommand),

    /// Replay queued changes whenever connectivity returns
    Watch(WatchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vocasync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;
    let reachability = if cli.offline {
        Reachability::Offline
    } else {
        Reachability::Probe
    };

    match cli.command {
        Some(Commands::Words(cmd)) => {
            let engine = build_engine(&config, reachability).await?;
            cmd.run(&engine).await?;
        }
        Some(Commands::Sync(cmd)) => {
            let engine = build_engine(&config, reachability).await?;
            cmd.run(&engine).await?;
        }
        Some(Commands::Queue(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&PendingQueue::new(pool)).await?;
        }
        Some(Commands::Cache(cmd)) => {
            let engine = build_engine(&config, Reachability::Offline).await?;
            cmd.run(&engine).await?;
        }
        Some(Commands::Sheet(cmd)) => {
            let engine = build_engine(&config, reachability).await?;
            cmd.run(&engine).await?;
        }
        Some(Commands::Auth(cmd)) => {
            let store = load_credentials(&config)?;
            cmd.run(&store, &config).await?;
        }
        Some(Commands::Watch(cmd)) => {
            let engine = build_engine(&config, reachability).await?;
            cmd.run(&engine, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
