//! Advisory write exclusion built from `<path>.private` sentinel files.
//!
//! The protocol is cooperative and non-atomic: acquire, write and release are
//! separate filesystem operations. A writer that dies between acquire and
//! release leaves a stuck marker that blocks readers until it is removed.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::fs::{StoreFs, parent_path};
use super::layout::marker_path_for;

#[async_trait]
pub trait WriteExclusion: Send + Sync + std::fmt::Debug {
    /// Marks `path` as being written. Overwrites an existing marker.
    async fn acquire(&self, path: &str) -> io::Result<()>;

    /// Clears the marker. A marker that is already gone is not an error.
    async fn release(&self, path: &str) -> io::Result<()>;

    /// Whether a non-empty marker exists for `path`. Stat failures read as
    /// "not held".
    async fn is_held(&self, path: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct MarkerExclusion {
    fs: Arc<dyn StoreFs>,
}

impl MarkerExclusion {
    pub fn new(fs: Arc<dyn StoreFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl WriteExclusion for MarkerExclusion {
    async fn acquire(&self, path: &str) -> io::Result<()> {
        let marker = marker_path_for(path);
        self.fs.create_dir_all(&parent_path(&marker)).await?;
        let mut writer = self.fs.open_write(&marker, true).await?;
        let token = Uuid::new_v4().to_string();
        writer.write_all(token.as_bytes()).await?;
        writer.shutdown().await?;
        tracing::trace!(marker = %marker, token = %token, "write marker acquired");
        Ok(())
    }

    async fn release(&self, path: &str) -> io::Result<()> {
        let marker = marker_path_for(path);
        match self.fs.remove(&marker).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn is_held(&self, path: &str) -> bool {
        match self.fs.metadata(&marker_path_for(path)).await {
            Ok(meta) => !meta.is_dir && meta.len > 0,
            Err(_) => false,
        }
    }
}
