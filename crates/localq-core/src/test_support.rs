//! Shared fixtures for unit tests.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::domain::{ExecutionError, ValidationError};
use crate::impls::MemFileSystem;
use crate::path::QueuePath;
use crate::ports::{FileSystem, FsError, FsErrorKind, FsMetadata};
use crate::typed::{Handler, Task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteTask {
    pub id: i64,
    pub name: String,
}

impl ConcreteTask {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl Task for ConcreteTask {
    const NAME: &'static str = "concrete";

    fn validate(&self) -> Result<(), ValidationError> {
        if self.id == 0 {
            return Err(ValidationError::new("ConcreteTask.id is empty"));
        }
        if self.name.is_empty() {
            return Err(ValidationError::new("ConcreteTask.name is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoneTask {
    pub weight: u32,
}

impl Task for StoneTask {
    const NAME: &'static str = "stone";
}

/// Counts executions; fails every one when `fail` is set.
#[derive(Debug, Default)]
pub struct ConcreteHandler {
    pub fail: bool,
    pub executed: AtomicUsize,
}

impl ConcreteHandler {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            executed: AtomicUsize::new(0),
        })
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler<ConcreteTask> for ConcreteHandler {
    async fn handle(&self, task: ConcreteTask) -> Result<(), ExecutionError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExecutionError::with_trace(
                format!("ConcreteTask {} failed", task.id),
                "no trace",
            ));
        }
        Ok(())
    }
}

pub struct StoneHandler;

#[async_trait]
impl Handler<StoneTask> for StoneHandler {
    async fn handle(&self, _task: StoneTask) -> Result<(), ExecutionError> {
        Ok(())
    }
}

pub fn mem_path(path: &str) -> QueuePath {
    QueuePath::new(path, Arc::new(MemFileSystem::new()), 0o777)
}

/// MemFileSystem that stops inside `remove_dir_all` until `resume` is
/// notified. `entered` fires once the call has started.
#[derive(Debug, Default)]
pub struct GatedFs {
    inner: MemFileSystem,
    pub entered: Notify,
    pub resume: Notify,
}

impl GatedFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl FileSystem for GatedFs {
    async fn metadata(&self, path: &Path) -> Result<FsMetadata, FsError> {
        self.inner.metadata(path).await
    }
    async fn create_dir(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        self.inner.create_dir(path, mode).await
    }
    async fn create_dir_all(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        self.inner.create_dir_all(path, mode).await
    }
    async fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.inner.read(path).await
    }
    async fn write(&self, path: &Path, data: &[u8], mode: u32) -> Result<(), FsError> {
        self.inner.write(path, data, mode).await
    }
    async fn create_new(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        self.inner.create_new(path, mode).await
    }
    async fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        self.inner.remove_file(path).await
    }
    async fn remove_dir_all(&self, path: &Path) -> Result<(), FsError> {
        self.entered.notify_one();
        self.resume.notified().await;
        self.inner.remove_dir_all(path).await
    }
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.inner.rename(from, to).await
    }
    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        self.inner.read_dir(path).await
    }
}

/// MemFileSystem that refuses writes to files ending in `fail_write_suffix`
/// and, with `fail_rename`, every rename.
#[derive(Debug, Default)]
pub struct FaultyFs {
    inner: MemFileSystem,
    pub fail_write_suffix: Option<&'static str>,
    pub fail_rename: bool,
}

impl FaultyFs {
    pub fn failing_writes(suffix: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fail_write_suffix: Some(suffix),
            ..Self::default()
        })
    }

    pub fn failing_renames() -> Arc<Self> {
        Arc::new(Self {
            fail_rename: true,
            ..Self::default()
        })
    }

    fn refused(path: &Path) -> FsError {
        FsError::new(FsErrorKind::PermissionDenied, path, "permission denied")
    }
}

#[async_trait]
impl FileSystem for FaultyFs {
    async fn metadata(&self, path: &Path) -> Result<FsMetadata, FsError> {
        self.inner.metadata(path).await
    }
    async fn create_dir(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        self.inner.create_dir(path, mode).await
    }
    async fn create_dir_all(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        self.inner.create_dir_all(path, mode).await
    }
    async fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.inner.read(path).await
    }
    async fn write(&self, path: &Path, data: &[u8], mode: u32) -> Result<(), FsError> {
        if let Some(suffix) = self.fail_write_suffix {
            if path.to_string_lossy().ends_with(suffix) {
                return Err(Self::refused(path));
            }
        }
        self.inner.write(path, data, mode).await
    }
    async fn create_new(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        self.inner.create_new(path, mode).await
    }
    async fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        self.inner.remove_file(path).await
    }
    async fn remove_dir_all(&self, path: &Path) -> Result<(), FsError> {
        self.inner.remove_dir_all(path).await
    }
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if self.fail_rename {
            return Err(Self::refused(from));
        }
        self.inner.rename(from, to).await
    }
    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        self.inner.read_dir(path).await
    }
}
