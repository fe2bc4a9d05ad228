use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# vocasync configuration

sheet:
  # ID from the spreadsheet URL: docs.google.com/spreadsheets/d/<ID>/edit
  spreadsheet_id: ""
  sheet_name: Sheet1

# Directory for the cache database and stored token
# data_dir: ~/.local/share/vocasync

retry:
  max_retries: 3
  base_delay_ms: 1000
  rate_limit_base_delay_ms: 5000
  request_spacing_ms: 1000

connectivity:
  probe_url: https://sheets.googleapis.com
  probe_interval_secs: 30
"#;

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        let sheet = &config.sheet;
                        println!(
                            "sheet.spreadsheet_id: {}",
                            sheet.spreadsheet_id.value.as_deref().unwrap_or("(not set)")
                        );
                        println!("  source: {}", sheet.spreadsheet_id.source);
                        println!("sheet.sheet_name: {}", sheet.sheet_name.value);
                        println!("  source: {}", sheet.sheet_name.source);
                        println!("sheet.api_base_url: {}", sheet.api_base_url.value);
                        println!("  source: {}", sheet.api_base_url.source);
                        println!();

                        let retry = &config.retry;
                        println!(
                            "retry: {} retries, {}ms base, {}ms after 429, {}ms spacing",
                            retry.max_retries,
                            retry.base_delay_ms,
                            retry.rate_limit_base_delay_ms,
                            retry.request_spacing_ms
                        );
                        println!(
                            "connectivity: probe {} every {}s",
                            config.connectivity.probe_url, config.connectivity.probe_interval_secs
                        );
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = Config::default_config_path();

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'vocasync config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nSet sheet.spreadsheet_id, then run `vocasync auth set-token`.");
                Ok(())
            }
        }
    }
}
