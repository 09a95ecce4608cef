use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::error::Result;

/// Persistence for the single password-hash record.
///
/// The record is opaque to the store: one string in, the same string out.
/// A store that has never been written reads back as `""`.
#[async_trait]
pub trait PasswordStore: Send + Sync {
    async fn read_password_hash(&self) -> Result<String>;
    async fn write_password_hash(&self, hash: &str) -> Result<()>;
}

/// Keeps the record in a file on disk.
#[derive(Debug, Clone)]
pub struct FilePasswordStore {
    path: PathBuf,
}

impl FilePasswordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PasswordStore for FilePasswordStore {
    async fn read_password_hash(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Password file {} not found, no password set", self.path.display());
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a sibling temp file and renames it over the record.
    async fn write_password_hash(&self, hash: &str) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, hash).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!("Password file {} updated", self.path.display());
        Ok(())
    }
}

/// Keeps the record in memory. Used by tests and embedded services.
#[derive(Debug, Default)]
pub struct MemoryPasswordStore {
    hash: RwLock<String>,
}

#[async_trait]
impl PasswordStore for MemoryPasswordStore {
    async fn read_password_hash(&self) -> Result<String> {
        Ok(self.hash.read().await.clone())
    }

    async fn write_password_hash(&self, hash: &str) -> Result<()> {
        *self.hash.write().await = hash.to_string();
        Ok(())
    }
}
