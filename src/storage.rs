//! Avatar file storage.
//!
//! The core only needs "store bytes, return a URL, delete the previous one";
//! `LocalFileStorage` keeps files in a directory that the router also serves
//! statically under `/uploads`.

use std::path::{Path, PathBuf};

use axum::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::ApiError;

/// Public URL prefix under which stored files are served
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file name: {0}")]
    InvalidName(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::InternalError(format!("file storage failed: {}", err))
    }
}

/// Byte storage addressed by file name
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under `name`, returning the public URL of the file
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Delete a file previously returned by `save`
    async fn delete(&self, url: &str) -> Result<(), StorageError>;
}

/// Rejects anything that could escape the storage directory
fn validate_name(name: &str) -> Result<(), StorageError> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// Maps a public URL back to the stored file name
pub fn name_from_url(url: &str) -> Result<&str, StorageError> {
    let name = url
        .strip_prefix(PUBLIC_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| StorageError::InvalidName(url.to_string()))?;
    validate_name(name)?;
    Ok(name)
}

/// Local filesystem storage
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the storage directory if it does not exist
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        validate_name(name)?;

        let path = self.dir.join(name);
        let mut file = fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        tracing::debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(format!("{}/{}", PUBLIC_PREFIX, name))
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let name = name_from_url(url)?;
        fs::remove_file(self.dir.join(name)).await?;
        Ok(())
    }
}
