//! FileSystem port - the only way queue code touches the disk.
//!
//! Every component performs I/O through `QueuePath`, which delegates here.
//! Implementations: `OsFileSystem` (tokio::fs) and `MemFileSystem` (tests).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;

/// Failure categories a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsErrorKind {
    PermissionDenied,
    NotFound,
    AlreadyExists,
    Other,
}

impl From<io::ErrorKind> for FsErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::PermissionDenied => FsErrorKind::PermissionDenied,
            io::ErrorKind::NotFound => FsErrorKind::NotFound,
            io::ErrorKind::AlreadyExists => FsErrorKind::AlreadyExists,
            _ => FsErrorKind::Other,
        }
    }
}

/// A filesystem failure, tagged with the path it happened on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?} at {}: {message}", path.display())]
pub struct FsError {
    pub kind: FsErrorKind,
    pub path: PathBuf,
    pub message: String,
}

impl FsError {
    pub fn new(kind: FsErrorKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn from_io(path: &Path, err: io::Error) -> Self {
        Self::new(err.kind().into(), path, err.to_string())
    }

    pub fn not_found(path: &Path) -> Self {
        Self::new(FsErrorKind::NotFound, path, "no such file or directory")
    }

    pub fn already_exists(path: &Path) -> Self {
        Self::new(FsErrorKind::AlreadyExists, path, "file exists")
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FsErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind == FsErrorKind::AlreadyExists
    }
}

/// What `stat` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsMetadata {
    pub is_dir: bool,
    pub len: u64,
    pub modified: SystemTime,
}

impl FsMetadata {
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}

/// FileSystem は差し替え可能なストレージバックエンド
///
/// All methods are async so that `OsFileSystem` can run on `tokio::fs`
/// without blocking the scan driver's workers.
#[async_trait]
pub trait FileSystem: Send + Sync + fmt::Debug {
    async fn metadata(&self, path: &Path) -> Result<FsMetadata, FsError>;

    /// Create exactly one directory level. The parent must exist.
    async fn create_dir(&self, path: &Path, mode: u32) -> Result<(), FsError>;

    async fn create_dir_all(&self, path: &Path, mode: u32) -> Result<(), FsError>;

    async fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Create or truncate.
    async fn write(&self, path: &Path, data: &[u8], mode: u32) -> Result<(), FsError>;

    /// Create an empty file only if nothing exists at `path`.
    ///
    /// Must be a single atomic operation: an existing file yields
    /// `FsErrorKind::AlreadyExists`, never a silent success.
    async fn create_new(&self, path: &Path, mode: u32) -> Result<(), FsError>;

    async fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    async fn remove_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Atomically move a file or directory to `to`, which must not exist.
    ///
    /// Once this returns, nothing is visible at `from` any more: a concurrent
    /// `create_new` below `from` fails with `NotFound`.
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Names of the immediate children of a directory.
    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError>;
}
