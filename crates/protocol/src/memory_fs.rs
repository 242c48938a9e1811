//! Deterministic in-memory [`FileSystem`].
//!
//! Every path is stored as given; directories are created implicitly for each
//! file's ancestors. Each trait call bumps an operation counter so callers can
//! assert that a code path performed no I/O at all.

use crate::fs::{FileStats, FileSystem};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    size: u64,
    modified: SystemTime,
    readable: bool,
}

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: BTreeMap<PathBuf, MemoryFile>,
    dirs: BTreeSet<PathBuf>,
    unreadable_dirs: BTreeSet<PathBuf>,
    operations: AtomicUsize,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file modified "now".
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) -> &mut Self {
        self.add_file_modified(path, content, SystemTime::now())
    }

    pub fn add_file_modified(
        &mut self,
        path: impl AsRef<Path>,
        content: impl Into<String>,
        modified: SystemTime,
    ) -> &mut Self {
        let content = content.into();
        let path = path.as_ref().to_path_buf();
        self.register_ancestors(&path);
        self.files.insert(
            path,
            MemoryFile {
                size: content.len() as u64,
                content,
                modified,
                readable: true,
            },
        );
        self
    }

    /// Add a file that was last modified `age` ago.
    pub fn add_file_aged(
        &mut self,
        path: impl AsRef<Path>,
        content: impl Into<String>,
        age: Duration,
    ) -> &mut Self {
        let modified = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.add_file_modified(path, content, modified)
    }

    /// Add a file whose reported size differs from its content length.
    pub fn add_file_sized(
        &mut self,
        path: impl AsRef<Path>,
        content: impl Into<String>,
        size: u64,
    ) -> &mut Self {
        let path = path.as_ref().to_path_buf();
        self.add_file(&path, content);
        if let Some(file) = self.files.get_mut(&path) {
            file.size = size;
        }
        self
    }

    /// Add a file that is listed and stat-able but fails on read.
    pub fn add_unreadable_file(&mut self, path: impl AsRef<Path>, size: u64) -> &mut Self {
        let path = path.as_ref().to_path_buf();
        self.add_file_sized(&path, String::new(), size);
        if let Some(file) = self.files.get_mut(&path) {
            file.readable = false;
        }
        self
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref().to_path_buf();
        self.register_ancestors(&path);
        self.dirs.insert(path);
        self
    }

    /// Directory that exists but cannot be listed.
    pub fn add_unreadable_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref().to_path_buf();
        self.add_dir(&path);
        self.unreadable_dirs.insert(path);
        self
    }

    /// Number of trait calls served so far.
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn register_ancestors(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }

    fn touch(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        self.touch();
        match self.files.get(path) {
            Some(file) if file.readable => Ok(file.content.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not readable", path.display()),
            )),
            None => Err(Self::not_found(path)),
        }
    }

    async fn list_directory(&self, path: &Path) -> io::Result<Vec<String>> {
        self.touch();
        if !self.dirs.contains(path) {
            return Err(Self::not_found(path));
        }
        if self.unreadable_dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not listable", path.display()),
            ));
        }

        let children = self
            .files
            .keys()
            .chain(self.dirs.iter())
            .filter(|candidate| candidate.parent() == Some(path))
            .filter_map(|candidate| candidate.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect::<BTreeSet<_>>();
        Ok(children.into_iter().collect())
    }

    async fn is_file(&self, path: &Path) -> bool {
        self.touch();
        self.files.contains_key(path)
    }

    async fn is_directory(&self, path: &Path) -> bool {
        self.touch();
        self.dirs.contains(path)
    }

    async fn stats(&self, path: &Path) -> io::Result<FileStats> {
        self.touch();
        if let Some(file) = self.files.get(path) {
            return Ok(FileStats {
                size: file.size,
                modified: file.modified,
            });
        }
        if self.dirs.contains(path) {
            return Ok(FileStats {
                size: 0,
                modified: SystemTime::UNIX_EPOCH,
            });
        }
        Err(Self::not_found(path))
    }

    async fn exists(&self, path: &Path) -> bool {
        self.touch();
        self.files.contains_key(path) || self.dirs.contains(path)
    }
}
