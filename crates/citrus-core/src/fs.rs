//! File system port and its implementations.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::path::Path;

/// File system operations used by a build.
///
/// Writes create missing parent directories. Errors are plain [`io::Error`]s and are
/// propagated by callers unchanged.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a whole file.
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write a whole file, creating parent directories as needed.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Create a directory and all of its ancestors. Existing directories are fine.
    async fn ensure_directory(&self, path: &Path) -> io::Result<()>;

    /// Copy a byte stream verbatim into a file, creating parent directories as needed.
    async fn pipe_to_file(
        &self,
        path: &Path,
        contents: &mut (dyn AsyncRead + Send + Unpin),
    ) -> io::Result<()>;
}

/// The host file system, through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path.to_native()).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.ensure_directory(&path.dirname()).await?;
        tokio::fs::write(path.to_native(), contents).await
    }

    async fn ensure_directory(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path.to_native()).await
    }

    async fn pipe_to_file(
        &self,
        path: &Path,
        contents: &mut (dyn AsyncRead + Send + Unpin),
    ) -> io::Result<()> {
        self.ensure_directory(&path.dirname()).await?;

        let mut file = tokio::fs::File::create(path.to_native()).await?;
        let copied = tokio::io::copy(contents, &mut file).await?;
        file.flush().await?;

        tracing::debug!("Piped {} bytes to {}", copied, path);
        Ok(())
    }
}

/// In-memory file system.
///
/// Keeps every file and directory in memory and counts reads per path, so tests can
/// observe exactly what a build touched.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<Path, Vec<u8>>,
    directories: BTreeSet<Path>,
    reads: HashMap<Path, usize>,
    writes: Vec<Path>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, returning `self` for chaining.
    pub fn with_file(self, path: Path, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Seed or replace a file without recording it as a build write.
    pub fn insert(&self, path: Path, contents: impl Into<Vec<u8>>) {
        self.state().files.insert(path, contents.into());
    }

    /// Contents of a file, if present.
    pub fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    /// Contents of a file as UTF-8 text, if present and valid.
    pub fn file_string(&self, path: &Path) -> Option<String> {
        self.file(path).and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Whether `ensure_directory` (directly or through a write) created `path`.
    pub fn has_directory(&self, path: &Path) -> bool {
        self.state().directories.contains(path)
    }

    /// Number of `read_file` calls made for `path`.
    pub fn reads(&self, path: &Path) -> usize {
        self.state().reads.get(path).copied().unwrap_or(0)
    }

    /// Every path written through the port, in write order.
    pub fn written_paths(&self) -> Vec<Path> {
        self.state().writes.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_write(&self, path: &Path, contents: Vec<u8>) {
        let mut state = self.state();
        state.directories.insert(path.dirname());
        state.files.insert(path.clone(), contents);
        state.writes.push(path.clone());
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut state = self.state();
        *state.reads.entry(path.clone()).or_default() += 1;

        state.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("File not found: {}", path))
        })
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.record_write(path, contents.to_vec());
        Ok(())
    }

    async fn ensure_directory(&self, path: &Path) -> io::Result<()> {
        self.state().directories.insert(path.clone());
        Ok(())
    }

    async fn pipe_to_file(
        &self,
        path: &Path,
        contents: &mut (dyn AsyncRead + Send + Unpin),
    ) -> io::Result<()> {
        let mut buffer = Vec::new();
        contents.read_to_end(&mut buffer).await?;
        self.record_write(path, buffer);
        Ok(())
    }
}
