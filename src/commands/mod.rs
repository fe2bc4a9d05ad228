mod auth_cmd;
mod cache_cmd;
mod config_cmd;
mod queue_cmd;
mod sheet_cmd;
mod sync_cmd;
mod watch_cmd;
mod words;

pub use auth_cmd::AuthCommand;
pub use cache_cmd::CacheCommand;
pub use config_cmd::ConfigCommand;
pub use queue_cmd::QueueCommand;
pub use sheet_cmd::SheetCommand;
pub use sync_cmd::SyncCommand;
pub use watch_cmd::WatchCommand;
pub use words::WordsCommand;

use clap::ValueEnum;
use std::io::{self, Write};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Asks a yes/no question on stdout; anything but `y` is a no.
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
