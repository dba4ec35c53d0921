//! Byte-oriented filesystem capability consumed by the store.
//!
//! Paths are relative, `/` separated strings. Empty segments are ignored, so
//! `request/v1/http://host/a` and `request/v1/http:/host/a` name the same
//! file. A missing path always surfaces as [`std::io::ErrorKind::NotFound`].

mod disk;
mod memory;

use std::fmt;
use std::io;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite};

pub use disk::DiskFs;
pub use memory::MemoryFs;

/// Readable, seekable byte stream handed out for stored content.
pub trait BodyStream: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> BodyStream for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

pub type Body = Box<dyn BodyStream>;
pub type FileWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub len: u64,
    pub is_dir: bool,
    pub modified: Option<SystemTime>,
}

impl FileMeta {
    pub(crate) fn file(len: u64) -> Self {
        Self {
            len,
            is_dir: false,
            modified: None,
        }
    }

    pub(crate) fn dir() -> Self {
        Self {
            len: 0,
            is_dir: true,
            modified: None,
        }
    }
}

#[async_trait]
pub trait StoreFs: Send + Sync + fmt::Debug {
    async fn create_dir_all(&self, path: &str) -> io::Result<()>;

    async fn open_read(&self, path: &str) -> io::Result<Body>;

    /// Opens `path` for writing, creating it if needed. The parent directory
    /// must exist. Without `truncate`, writes append to existing content.
    async fn open_write(&self, path: &str, truncate: bool) -> io::Result<FileWriter>;

    async fn metadata(&self, path: &str) -> io::Result<FileMeta>;

    /// Removes a file or an empty directory.
    async fn remove(&self, path: &str) -> io::Result<()>;

    /// Every file and directory below `root` (excluding `root` itself), in a
    /// stable order.
    async fn walk(&self, root: &str) -> io::Result<Vec<(String, FileMeta)>>;
}

pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

pub fn normalize_path(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

pub(crate) fn parent_path(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

pub(crate) fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_empty_segments() {
        assert_eq!(
            normalize_path("/request/v1/http://example.com/a"),
            "request/v1/http:/example.com/a"
        );
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn parent_of_nested_and_top_level() {
        assert_eq!(parent_path("request/v1/abc"), "request/v1");
        assert_eq!(parent_path("abc"), "");
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a", "b"), "a/b");
    }
}
