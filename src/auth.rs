//! Bearer token storage.
//!
//! The OAuth consent flow happens elsewhere; this store only keeps the issued
//! access token so that every sheet call can attach it, and forgets it when
//! the sheet reports it as expired.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

/// Default file name of the stored token inside the data directory.
pub const TOKEN_FILE_NAME: &str = "access_token";

#[derive(Debug)]
pub enum CredentialError {
    ReadError(PathBuf, std::io::Error),
    WriteError(PathBuf, std::io::Error),
    EmptyToken,
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::ReadError(path, e) => {
                write!(f, "Failed to read token file '{}': {}", path.display(), e)
            }
            CredentialError::WriteError(path, e) => {
                write!(f, "Failed to write token file '{}': {}", path.display(), e)
            }
            CredentialError::EmptyToken => write!(f, "Access token must not be empty"),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Holds the current access token, optionally persisted to a file.
#[derive(Debug)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    token: RwLock<Option<String>>,
}

impl CredentialStore {
    /// A store that never touches disk.
    pub fn in_memory(token: Option<String>) -> Self {
        Self {
            path: None,
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    /// Loads the token persisted at `path`, if any.
    pub fn load(path: PathBuf) -> Result<Self, CredentialError> {
        let token = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| CredentialError::ReadError(path.clone(), e))?;
            Some(contents.trim().to_string()).filter(|t| !t.is_empty())
        } else {
            None
        };

        Ok(Self {
            path: Some(path),
            token: RwLock::new(token),
        })
    }

    /// Replaces the loaded token without persisting it (environment override).
    pub fn with_token(self, token: Option<String>) -> Self {
        match token.filter(|t| !t.trim().is_empty()) {
            Some(token) => Self {
                path: self.path,
                token: RwLock::new(Some(token)),
            },
            None => self,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn set(&self, token: &str) -> Result<(), CredentialError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }

        if let Some(path) = &self.path {
            write_token_file(path, token)?;
        }
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), CredentialError> {
        *self.token.write().await = None;

        if let Some(path) = &self.path {
            if path.exists() {
                std::fs::remove_file(path)
                    .map_err(|e| CredentialError::WriteError(path.clone(), e))?;
            }
        }
        Ok(())
    }
}

fn write_token_file(path: &Path, token: &str) -> Result<(), CredentialError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CredentialError::WriteError(path.to_path_buf(), e))?;
    }
    std::fs::write(path, token).map_err(|e| CredentialError::WriteError(path.to_path_buf(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| CredentialError::WriteError(path.to_path_buf(), e))?;
    }

    Ok(())
}
