use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs as async_fs;

use super::{Body, FileMeta, FileWriter, StoreFs, join_path, normalize_path, segments};

/// Filesystem rooted at a directory. Store paths resolve below the root and
/// may not climb out of it.
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    /// Creates the root directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let mut builder = async_fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            builder.mode(0o700);
        }
        builder.create(&root).await?;
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in segments(path) {
            if segment == "." || segment == ".." || segment.contains('\\') {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("path '{path}' escapes the store root"),
                ));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

impl From<&std::fs::Metadata> for FileMeta {
    fn from(meta: &std::fs::Metadata) -> Self {
        Self {
            len: meta.len(),
            is_dir: meta.is_dir(),
            modified: meta.modified().ok(),
        }
    }
}

#[async_trait]
impl StoreFs for DiskFs {
    async fn create_dir_all(&self, path: &str) -> io::Result<()> {
        let dir = self.resolve(path)?;
        let mut builder = async_fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            builder.mode(0o700);
        }
        builder.create(&dir).await
    }

    async fn open_read(&self, path: &str) -> io::Result<Body> {
        let file = async_fs::File::open(self.resolve(path)?).await?;
        Ok(Box::new(file))
    }

    async fn open_write(&self, path: &str, truncate: bool) -> io::Result<FileWriter> {
        let target = self.resolve(path)?;
        let mut options = async_fs::OpenOptions::new();
        options.create(true).write(true);
        if truncate {
            options.truncate(true);
        } else {
            options.append(true);
        }
        #[cfg(unix)]
        {
            options.mode(0o600);
        }
        let file = options.open(&target).await?;
        Ok(Box::new(file))
    }

    async fn metadata(&self, path: &str) -> io::Result<FileMeta> {
        let meta = async_fs::metadata(self.resolve(path)?).await?;
        Ok(FileMeta::from(&meta))
    }

    async fn remove(&self, path: &str) -> io::Result<()> {
        let target = self.resolve(path)?;
        if async_fs::metadata(&target).await?.is_dir() {
            async_fs::remove_dir(&target).await
        } else {
            async_fs::remove_file(&target).await
        }
    }

    async fn walk(&self, root: &str) -> io::Result<Vec<(String, FileMeta)>> {
        let root = normalize_path(root);
        let mut walked = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = async_fs::read_dir(self.resolve(&dir)?).await?;
            let mut children = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let meta = match entry.metadata().await {
                    Ok(meta) => meta,
                    // Removed between listing and stat.
                    Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                    Err(err) => return Err(err),
                };
                children.push((join_path(&dir, &name), FileMeta::from(&meta)));
            }
            children.sort_by(|a, b| a.0.cmp(&b.0));
            for (path, meta) in children.iter().rev() {
                if meta.is_dir {
                    pending.push(path.clone());
                }
            }
            walked.extend(children);
        }

        Ok(walked)
    }
}
