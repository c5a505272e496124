//! FileLock - cross-process exclusive lock backed by a marker file.
//!
//! Acquisition is a single exclusive-create (`O_CREAT | O_EXCL` on disk).
//! There is no "does it exist?" pre-check: two claimers racing on the same
//! path are serialized by the filesystem, and exactly one of them wins.

use crate::error::{QueueError, Result};
use crate::path::QueuePath;

/// A handle on one lock path.
///
/// The handle remembers whether *it* acquired the lock, so releasing a lock
/// it never took is reported instead of silently deleting someone else's.
#[derive(Debug)]
pub struct FileLock {
    path: QueuePath,
    held: bool,
}

impl FileLock {
    pub fn new(path: QueuePath) -> Self {
        Self { path, held: false }
    }

    pub fn path(&self) -> &QueuePath {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Take the lock or fail immediately.
    ///
    /// # Errors
    /// - `LockHeld` when the file already exists (lost race; try something else)
    /// - `Io` for any other filesystem failure
    pub async fn acquire(&mut self) -> Result<()> {
        match self.path.create_new().await {
            Ok(()) => {
                self.held = true;
                Ok(())
            }
            Err(e) if e.is_already_exists() => Err(QueueError::LockHeld(self.path.to_path_buf())),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the lock file.
    ///
    /// # Errors
    /// - `LockMisuse` (fatal) when this handle does not hold the lock
    /// - `Io` when removal fails; the handle still counts as holding
    pub async fn release(&mut self) -> Result<()> {
        if !self.held {
            return Err(QueueError::LockMisuse(self.path.to_path_buf()));
        }
        self.path.remove().await?;
        self.held = false;
        Ok(())
    }
}
