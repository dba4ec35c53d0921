use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWrite;

use super::{Body, FileMeta, FileWriter, StoreFs, join_path, normalize_path, parent_path, segments};

type FileData = Arc<Mutex<Vec<u8>>>;

/// Ephemeral in-process filesystem. Files written through an open writer are
/// visible to readers immediately, like a real filesystem mid-write.
#[derive(Debug, Default)]
pub struct MemoryFs {
    tree: Mutex<MemoryTree>,
}

#[derive(Debug, Default)]
struct MemoryTree {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, FileData>,
}

impl MemoryTree {
    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path}: no such file"))
}

#[async_trait]
impl StoreFs for MemoryFs {
    async fn create_dir_all(&self, path: &str) -> io::Result<()> {
        let mut tree = self.tree.lock();
        let mut current = String::new();
        for segment in segments(path) {
            current = join_path(&current, segment);
            if tree.files.contains_key(&current) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{current}: not a directory"),
                ));
            }
            tree.dirs.insert(current.clone());
        }
        Ok(())
    }

    async fn open_read(&self, path: &str) -> io::Result<Body> {
        let path = normalize_path(path);
        let tree = self.tree.lock();
        match tree.files.get(&path) {
            Some(data) => {
                let snapshot = data.lock().clone();
                Ok(Box::new(Cursor::new(snapshot)))
            }
            None if tree.is_dir(&path) => Err(io::Error::other(format!("{path}: is a directory"))),
            None => Err(not_found(&path)),
        }
    }

    async fn open_write(&self, path: &str, truncate: bool) -> io::Result<FileWriter> {
        let path = normalize_path(path);
        let mut tree = self.tree.lock();
        if tree.is_dir(&path) {
            return Err(io::Error::other(format!("{path}: is a directory")));
        }
        if !tree.is_dir(&parent_path(&path)) {
            return Err(not_found(&path));
        }
        let data = tree.files.entry(path).or_default().clone();
        if truncate {
            data.lock().clear();
        }
        Ok(Box::new(MemoryWriter { data }))
    }

    async fn metadata(&self, path: &str) -> io::Result<FileMeta> {
        let path = normalize_path(path);
        let tree = self.tree.lock();
        if let Some(data) = tree.files.get(&path) {
            return Ok(FileMeta::file(data.lock().len() as u64));
        }
        if tree.is_dir(&path) {
            return Ok(FileMeta::dir());
        }
        Err(not_found(&path))
    }

    async fn remove(&self, path: &str) -> io::Result<()> {
        let path = normalize_path(path);
        let mut tree = self.tree.lock();
        if tree.files.remove(&path).is_some() {
            return Ok(());
        }
        if !path.is_empty() && tree.dirs.contains(&path) {
            let prefix = format!("{path}/");
            let has_children = tree.dirs.iter().any(|dir| dir.starts_with(&prefix))
                || tree.files.keys().any(|file| file.starts_with(&prefix));
            if has_children {
                return Err(io::Error::other(format!("{path}: directory not empty")));
            }
            tree.dirs.remove(&path);
            return Ok(());
        }
        Err(not_found(&path))
    }

    async fn walk(&self, root: &str) -> io::Result<Vec<(String, FileMeta)>> {
        let root = normalize_path(root);
        let tree = self.tree.lock();
        if !tree.is_dir(&root) {
            return Err(not_found(&root));
        }
        let prefix = if root.is_empty() {
            String::new()
        } else {
            format!("{root}/")
        };

        let mut entries: Vec<(String, FileMeta)> = tree
            .dirs
            .iter()
            .filter(|dir| dir.starts_with(&prefix))
            .map(|dir| (dir.clone(), FileMeta::dir()))
            .chain(
                tree.files
                    .iter()
                    .filter(|(file, _)| file.starts_with(&prefix))
                    .map(|(file, data)| (file.clone(), FileMeta::file(data.lock().len() as u64))),
            )
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

struct MemoryWriter {
    data: FileData,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.data.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
