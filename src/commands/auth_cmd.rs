use clap::{Args, Subcommand};
use std::io::{self, BufRead};

use crate::auth::CredentialStore;
use crate::config::{Config, ACCESS_TOKEN_ENV};

#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand)]
pub enum AuthSubcommand {
    /// Store an OAuth access token for the Sheets API
    SetToken {
        /// Token value; read from stdin when omitted
        token: Option<String>,
    },

    /// Forget the stored token
    Clear,

    /// Show whether a token is available
    Status,
}

impl AuthCommand {
    pub async fn run(
        &self,
        store: &CredentialStore,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            AuthSubcommand::SetToken { token } => {
                let token = match token {
                    Some(token) => token.clone(),
                    None => {
                        let mut line = String::new();
                        io::stdin().lock().read_line(&mut line)?;
                        line
                    }
                };

                store.set(&token).await?;
                println!("Token stored at {}", config.token_path().display());
                Ok(())
            }

            AuthSubcommand::Clear => {
                store.clear().await?;
                println!("Signed out.");
                if Config::access_token_override().is_some() {
                    println!("Note: {} is still set in the environment.", ACCESS_TOKEN_ENV);
                }
                Ok(())
            }

            AuthSubcommand::Status => {
                if !store.is_signed_in().await {
                    println!("Not signed in.");
                    println!();
                    println!("Run `vocasync auth set-token <TOKEN>` or set {}.", ACCESS_TOKEN_ENV);
                    return Ok(());
                }

                let source = if Config::access_token_override().is_some() {
                    "environment"
                } else {
                    "file"
                };
                println!("Signed in (token from {})", source);
                Ok(())
            }
        }
    }
}
