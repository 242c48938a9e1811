use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Size and modification time of a file system entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub size: u64,
    pub modified: SystemTime,
}

/// Read-only file system primitives consumed by the loading pipeline.
///
/// Implementations must never mutate the tree. Listing returns bare entry
/// names (not full paths) in no particular order.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn read_file(&self, path: &Path) -> io::Result<String>;

    async fn list_directory(&self, path: &Path) -> io::Result<Vec<String>>;

    async fn is_file(&self, path: &Path) -> bool;

    async fn is_directory(&self, path: &Path) -> bool;

    async fn stats(&self, path: &Path) -> io::Result<FileStats>;

    async fn exists(&self, path: &Path) -> bool;
}

/// [`FileSystem`] backed by the local disk through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn list_directory(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn is_directory(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    async fn stats(&self, path: &Path) -> io::Result<FileStats> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(FileStats {
            size: meta.len(),
            modified: meta.modified()?,
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
