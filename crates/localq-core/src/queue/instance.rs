//! TaskInstance - one unit of work, persisted as a directory.
//!
//! ```text
//! <queueRoot>/<taskType>/<id>/<id>.json    payload (written once)
//! <queueRoot>/<taskType>/<id>/<id>.lock    zero-length claim marker
//! <queueRoot>/<taskType>/<id>/<id>.error   JSON array of error records
//! ```
//!
//! State transitions:
//! - NEW          -> initialize()                  -> LOCKED_EMPTY
//! - LOCKED_EMPTY -> write_payload() + release()   -> READY
//! - READY        -> claim()                       -> CLAIMED (LockHeld if raced)
//! - CLAIMED      -> remove()                      -> REMOVED (terminal)
//! - CLAIMED      -> write_error() + release()     -> ERRORED (terminal)
//!
//! Predicates always go back to the disk so that changes made by other
//! processes are observed immediately.

use std::fmt;
use std::sync::Arc;

use crate::domain::{ErrorLog, ErrorRecord, InstanceId, InstanceState};
use crate::error::Result;
use crate::lock::FileLock;
use crate::path::QueuePath;
use crate::ports::{Clock, SystemClock};

pub struct TaskInstance {
    id: InstanceId,
    name: String,
    root: QueuePath,
    lock: FileLock,
    clock: Arc<dyn Clock>,
}

impl TaskInstance {
    pub fn new(name: impl Into<String>, id: InstanceId, root: QueuePath, clock: Arc<dyn Clock>) -> Self {
        let lock = FileLock::new(root.join(format!("{id}.lock")));
        Self {
            id,
            name: name.into(),
            root,
            lock,
            clock,
        }
    }

    /// Rebuild a descriptor from an instance directory. No I/O.
    ///
    /// The id is the directory name and the task type its parent's name.
    pub fn at(root: QueuePath) -> Self {
        let id = InstanceId::from_name(root.name());
        let name = root.parent().name();
        Self::new(name, id, root, Arc::new(SystemClock))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    /// Owning task type.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &QueuePath {
        &self.root
    }

    pub fn task_file(&self) -> QueuePath {
        self.root.join(format!("{}.json", self.id))
    }

    pub fn lock_file(&self) -> QueuePath {
        self.lock.path().clone()
    }

    pub fn error_file(&self) -> QueuePath {
        self.root.join(format!("{}.error", self.id))
    }

    /// Whether this descriptor holds the claim.
    pub fn holds_lock(&self) -> bool {
        self.lock.is_held()
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    pub async fn exists(&self) -> bool {
        self.root.is_dir().await
    }

    pub async fn is_locked(&self) -> bool {
        self.lock_file().exists().await
    }

    pub async fn has_error(&self) -> bool {
        self.error_file().exists().await
    }

    pub async fn has_payload(&self) -> bool {
        self.task_file().exists().await
    }

    /// payload ∧ ¬lock ∧ ¬error
    pub async fn is_ready(&self) -> bool {
        self.has_payload().await && !self.is_locked().await && !self.has_error().await
    }

    pub async fn state(&self) -> InstanceState {
        InstanceState::classify(
            self.exists().await,
            self.has_payload().await,
            self.is_locked().await,
            self.has_error().await,
        )
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Create the directory and claim it, so no scanner sees a half-written
    /// instance as ready.
    pub async fn initialize(&mut self) -> Result<()> {
        self.root.mkdirs().await?;
        self.lock.acquire().await
    }

    pub async fn write_payload(&self, data: &[u8]) -> Result<()> {
        self.task_file().write(data).await?;
        Ok(())
    }

    pub async fn read_payload(&self) -> Result<Vec<u8>> {
        Ok(self.task_file().read().await?)
    }

    /// Fails with `LockHeld` when another claimer got there first.
    pub async fn claim(&mut self) -> Result<()> {
        self.lock.acquire().await
    }

    /// Fails with `LockMisuse` when this descriptor does not hold the claim.
    pub async fn release(&mut self) -> Result<()> {
        self.lock.release().await
    }

    /// Where `remove` parks the directory before deleting it. Hidden names
    /// are never listed as instances.
    pub fn removal_dir(&self) -> QueuePath {
        self.root.parent().join(format!(".{}.removing", self.id))
    }

    /// Delete the whole instance directory (lock included).
    ///
    /// The directory is first renamed out of the queue in one step, so a
    /// stale claimer sees it vanish at once instead of finding the lock gone
    /// while the payload is still being unlinked.
    pub async fn remove(&mut self) -> Result<()> {
        let doomed = self.removal_dir();
        self.root.rename(&doomed).await?;
        self.lock = FileLock::new(self.lock.path().clone());
        doomed.remove().await?;
        Ok(())
    }

    /// Error history; empty when there is no error file.
    pub async fn errors(&self) -> Result<ErrorLog> {
        match self.error_file().read().await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.is_not_found() => Ok(ErrorLog::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Append one record and rewrite the file.
    ///
    /// Read-modify-write, not an atomic append: only the claim holder may
    /// call this.
    pub async fn write_error(&self, message: &str, trace: &str) -> Result<()> {
        let mut log = self.errors().await?;
        log.push(ErrorRecord::new(self.clock.now(), message, trace));
        let bytes = serde_json::to_vec(&log)?;
        self.error_file().write(&bytes).await?;
        Ok(())
    }
}

impl fmt::Debug for TaskInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskInstance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("root", &self.root)
            .field("holds_lock", &self.lock.is_held())
            .finish()
    }
}

impl fmt::Display for TaskInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
