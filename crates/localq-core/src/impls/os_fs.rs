//! OsFileSystem - tokio::fs backed implementation of the FileSystem port.

use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::ports::{FileSystem, FsError, FsMetadata};

/// The real disk.
///
/// `mode` arguments are honoured on unix and ignored elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn dir_builder(mode: u32, recursive: bool) -> tokio::fs::DirBuilder {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    builder.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;
    builder
}

fn open_options(mode: u32) -> tokio::fs::OpenOptions {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true);
    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;
    options
}

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn metadata(&self, path: &Path) -> Result<FsMetadata, FsError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        let modified = meta.modified().map_err(|e| FsError::from_io(path, e))?;
        Ok(FsMetadata {
            is_dir: meta.is_dir(),
            len: meta.len(),
            modified,
        })
    }

    async fn create_dir(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        dir_builder(mode, false)
            .create(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn create_dir_all(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        dir_builder(mode, true)
            .create(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        tokio::fs::read(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn write(&self, path: &Path, data: &[u8], mode: u32) -> Result<(), FsError> {
        let mut file = open_options(mode)
            .create(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        file.write_all(data)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        file.flush().await.map_err(|e| FsError::from_io(path, e))
    }

    async fn create_new(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        // O_CREAT | O_EXCL: the kernel decides who wins.
        open_options(mode)
            .create_new(true)
            .open(path)
            .await
            .map(drop)
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), FsError> {
        tokio::fs::remove_dir_all(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        // rename(2) replaces an empty target directory, so refuse up front
        if tokio::fs::symlink_metadata(to).await.is_ok() {
            return Err(FsError::already_exists(to));
        }
        tokio::fs::rename(from, to)
            .await
            .map_err(|e| FsError::from_io(from, e))
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(path, e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}
