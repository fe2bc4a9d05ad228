//! Wiring of configuration, storage and transport into a [`SyncEngine`].

use std::sync::Arc;

use crate::auth::{CredentialError, CredentialStore};
use crate::config::Config;
use crate::db::{init_db, CacheError};
use crate::sheet::{HttpTransport, SheetLayout, TableClient};
use crate::sync::{probe, Connectivity, SyncEngine};

/// How the engine should decide whether the sheet is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    /// Probe the configured URL once at startup
    Probe,
    /// Treat the sheet as unreachable without probing
    Offline,
}

#[derive(Debug)]
pub enum AppError {
    Cache(CacheError),
    Credential(CredentialError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Cache(e) => write!(f, "{}", e),
            AppError::Credential(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::Cache(e)
    }
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        AppError::Credential(e)
    }
}

/// Loads the stored token, honouring the environment override.
pub fn load_credentials(config: &Config) -> Result<CredentialStore, CredentialError> {
    Ok(CredentialStore::load(config.token_path())?.with_token(Config::access_token_override()))
}

/// Builds an engine talking to the real Sheets API.
///
/// The client is initialized right away when the sheet is reachable; a
/// failure there is logged and leaves the engine usable from the cache.
pub async fn build_engine(
    config: &Config,
    reachability: Reachability,
) -> Result<SyncEngine<HttpTransport>, AppError> {
    let pool = init_db(&config.database_path.value).await?;
    let credentials = Arc::new(load_credentials(config)?);

    let client = TableClient::new(
        HttpTransport::new(config.sheet.api_base_url.value.clone()),
        credentials,
        config.sheet.spreadsheet_id.value.clone(),
        SheetLayout::new(config.sheet.sheet_name.value.clone()),
        config.retry.policy(),
    );

    let online = match reachability {
        Reachability::Probe => probe(&config.connectivity.probe_url).await,
        Reachability::Offline => false,
    };
    if !online {
        tracing::info!("sheet unreachable, working from local cache");
    }

    let engine = SyncEngine::new(Arc::new(client), pool, Arc::new(Connectivity::new(online)));
    if online {
        if let Err(e) = engine.client().initialize().await {
            tracing::warn!(error = %e, "could not initialize spreadsheet client");
        }
    }

    Ok(engine)
}
