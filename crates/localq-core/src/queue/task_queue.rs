//! TaskQueue - one task type's directory of instances.
//!
//! The queue holds no instances in memory; every listing is rebuilt from
//! the directory so that other producers and consumers are always visible.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::instance::TaskInstance;
use super::status::{QueueCounts, StatusFilter};
use crate::domain::Outcome;
use crate::error::{QueueError, Result};
use crate::path::QueuePath;
use crate::ports::{Clock, IdGenerator};
use crate::typed::DynHandler;

pub struct TaskQueue {
    root: QueuePath,
    name: String,
    handler: Arc<dyn DynHandler>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskQueue {
    /// Bind `handler` under `<master>/<handler.task_name()>` and create that
    /// directory.
    pub async fn create(
        master: &QueuePath,
        handler: Arc<dyn DynHandler>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let name = handler.task_name().to_string();
        let queue = Self {
            root: master.join(&name),
            name,
            handler,
            clock,
            ids,
        };
        queue.initialize().await?;
        Ok(queue)
    }

    pub async fn initialize(&self) -> Result<()> {
        self.root.mkdirs().await?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &QueuePath {
        &self.root
    }

    pub fn handler(&self) -> &Arc<dyn DynHandler> {
        &self.handler
    }

    /// A fresh descriptor with a newly generated id. No I/O.
    pub fn create_instance(&self) -> TaskInstance {
        let id = self.ids.generate_instance_id();
        let root = self.root.join(id.as_str());
        TaskInstance::new(self.name.clone(), id, root, Arc::clone(&self.clock))
    }

    /// Rebuild a descriptor for an existing instance directory. No I/O.
    pub fn load_instance(&self, dir: QueuePath) -> TaskInstance {
        TaskInstance::at(dir).with_clock(Arc::clone(&self.clock))
    }

    /// Every instance directory, in listing order. Hidden entries (such as
    /// directories parked by `TaskInstance::remove`) are skipped.
    pub async fn instances(&self) -> Result<Vec<TaskInstance>> {
        let mut instances = Vec::new();
        for dir in self.root.read_dir().await? {
            if dir.name().starts_with('.') || !dir.is_dir().await {
                continue;
            }
            instances.push(self.load_instance(dir));
        }
        Ok(instances)
    }

    /// Instances eligible for claiming, in listing order (not FIFO).
    pub async fn scan_ready(&self) -> Result<Vec<TaskInstance>> {
        let mut ready = Vec::new();
        for instance in self.instances().await? {
            if instance.is_ready().await {
                ready.push(instance);
            }
        }
        Ok(ready)
    }

    pub async fn counts(&self) -> Result<QueueCounts> {
        let mut counts = QueueCounts::default();
        for instance in self.instances().await? {
            counts.record(instance.state().await);
        }
        Ok(counts)
    }

    pub async fn find(&self, filter: StatusFilter) -> Result<Vec<TaskInstance>> {
        let mut found = Vec::new();
        for instance in self.instances().await? {
            if filter.matches(instance.state().await) {
                found.push(instance);
            }
        }
        Ok(found)
    }

    /// Persist an already validated and encoded payload as a new READY
    /// instance.
    ///
    /// The directory is created already locked, so a concurrent scan never
    /// sees it as ready before the payload is complete. If a write fails the
    /// partial directory is left behind; scans report it as incomplete or
    /// locked, never ready.
    ///
    /// Crate-internal: producers go through `TypedQueue::send`, which
    /// validates first.
    pub(crate) async fn publish(&self, payload: &[u8]) -> Result<TaskInstance> {
        let mut instance = self.create_instance();
        instance.initialize().await?;
        instance.write_payload(payload).await?;
        instance.release().await?;
        debug!(task = %self.name, id = %instance.id(), "task enqueued");
        Ok(instance)
    }

    /// Claim, run and finalize one instance.
    ///
    /// - lock already held, directory gone, payload gone, or already
    ///   errored: `Outcome::Blocked`, nothing else touched
    /// - handler ok: directory removed, `Outcome::Completed`
    /// - handler error: error record appended, lock released,
    ///   `Outcome::DeadLettered`
    ///
    /// Filesystem failures are returned as `Err`; the handler's own failure
    /// never is.
    pub async fn execute(&self, instance: &mut TaskInstance) -> Result<Outcome> {
        match instance.claim().await {
            Ok(()) => {}
            Err(QueueError::LockHeld(_)) => {
                debug!(task = %self.name, id = %instance.id(), "claim lost");
                return Ok(Outcome::blocked(instance.id().clone()));
            }
            // completed and removed by another consumer since the scan
            Err(QueueError::Io(e)) if e.is_not_found() => {
                debug!(task = %self.name, id = %instance.id(), "instance vanished before claim");
                return Ok(Outcome::blocked(instance.id().clone()));
            }
            Err(e) => return Err(e),
        }

        // dead-lettered by another consumer between our scan and our claim
        if instance.has_error().await {
            instance.release().await?;
            debug!(task = %self.name, id = %instance.id(), "instance errored before claim");
            return Ok(Outcome::blocked(instance.id().clone()));
        }

        let payload = match instance.read_payload().await {
            Ok(payload) => payload,
            // removed under us, or never finished by its producer
            Err(QueueError::Io(e)) if e.is_not_found() => {
                release_after_failure(instance).await;
                debug!(task = %self.name, id = %instance.id(), "payload missing after claim");
                return Ok(Outcome::blocked(instance.id().clone()));
            }
            Err(e) => {
                release_after_failure(instance).await;
                return Err(e);
            }
        };

        match self.handler.execute_raw(&payload).await {
            Ok(()) => {
                instance.remove().await?;
                debug!(task = %self.name, id = %instance.id(), "task completed");
                Ok(Outcome::completed(instance.id().clone()))
            }
            Err(failure) => {
                warn!(
                    task = %self.name,
                    id = %instance.id(),
                    error = %failure.message,
                    "task failed; dead-lettered"
                );
                if let Err(e) = instance.write_error(&failure.message, &failure.trace).await {
                    release_after_failure(instance).await;
                    return Err(e);
                }
                instance.release().await?;
                Ok(Outcome::dead_lettered(instance.id().clone(), failure.message))
            }
        }
    }
}

/// Best-effort unlock on an I/O error path; the original error wins.
async fn release_after_failure(instance: &mut TaskInstance) {
    if let Err(e) = instance.release().await {
        warn!(id = %instance.id(), error = %e, "could not release lock after failure");
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.name)
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstanceId, OutcomeKind};
    use crate::ports::{SystemClock, UlidGenerator};
    use crate::ports::{FileSystem, FsErrorKind};
    use crate::test_support::{ConcreteHandler, ConcreteTask, FaultyFs, GatedFs, mem_path};
    use crate::typed::{PayloadCodec, TypedHandler};

    async fn make_queue(handler: Arc<ConcreteHandler>) -> TaskQueue {
        make_queue_at(mem_path("/localq"), handler).await
    }

    async fn make_queue_at(master: QueuePath, handler: Arc<ConcreteHandler>) -> TaskQueue {
        TaskQueue::create(
            &master,
            Arc::new(TypedHandler::<ConcreteTask, _>::new(handler)),
            Arc::new(SystemClock),
            Arc::new(UlidGenerator::new(SystemClock)),
        )
        .await
        .unwrap()
    }

    async fn publish(queue: &TaskQueue, id: i64) -> TaskInstance {
        let bytes = PayloadCodec::encode(&ConcreteTask::new(id, "Hello!")).unwrap();
        queue.publish(&bytes).await.unwrap()
    }

    #[tokio::test]
    async fn create_makes_the_directory() {
        let queue = make_queue(ConcreteHandler::ok()).await;
        assert_eq!(queue.name(), "concrete");
        assert_eq!(queue.root().to_string(), "/localq/concrete");
        assert!(queue.root().exists().await);
    }

    #[tokio::test]
    async fn create_instance_layout() {
        let queue = make_queue(ConcreteHandler::ok()).await;
        let ti = queue.create_instance();
        assert_eq!(ti.name(), "concrete");
        assert_eq!(ti.id().as_str().len(), InstanceId::LEN);
        assert_eq!(ti.root().to_string(), format!("/localq/concrete/{}", ti.id()));
        assert!(!ti.is_locked().await);
    }

    #[tokio::test]
    async fn load_instance_matches_created() {
        let queue = make_queue(ConcreteHandler::ok()).await;
        let ti = queue.create_instance();
        let ti2 = queue.load_instance(ti.root().clone());
        assert_eq!(ti.name(), ti2.name());
        assert_eq!(ti.root(), ti2.root());
        assert_eq!(ti.id(), ti2.id());
    }

    #[tokio::test]
    async fn instances_lists_only_directories() {
        let queue = make_queue(ConcreteHandler::ok()).await;
        for _ in 0..3 {
            queue.create_instance().initialize().await.unwrap();
        }
        queue.root().join("stray.txt").write(b"x").await.unwrap();

        assert_eq!(queue.instances().await.unwrap().len(), 3);
        // all three are still locked and empty
        assert!(queue.scan_ready().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn publish_leaves_a_ready_instance() {
        let queue = make_queue(ConcreteHandler::ok()).await;
        let ti = publish(&queue, 1).await;

        assert!(ti.is_ready().await);
        assert!(ti.task_file().exists().await);
        assert!(!ti.lock_file().exists().await);
        assert!(!ti.error_file().exists().await);
        assert_eq!(
            ti.read_payload().await.unwrap(),
            br#"{"id":1,"name":"Hello!"}"#
        );

        let ready = queue.scan_ready().await.unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id(), ti.id());
    }

    #[tokio::test]
    async fn execute_success_removes_directory() {
        let handler = ConcreteHandler::ok();
        let queue = make_queue(Arc::clone(&handler)).await;
        let mut ti = publish(&queue, 1).await;

        let outcome = queue.execute(&mut ti).await.unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Completed);
        assert_eq!(handler.executed(), 1);
        assert!(!ti.exists().await);
    }

    #[tokio::test]
    async fn execute_failure_dead_letters() {
        let handler = ConcreteHandler::failing();
        let queue = make_queue(Arc::clone(&handler)).await;
        let mut ti = publish(&queue, 7).await;

        let outcome = queue.execute(&mut ti).await.unwrap();
        assert_eq!(outcome.kind, OutcomeKind::DeadLettered);
        assert_eq!(outcome.reason.as_deref(), Some("ConcreteTask 7 failed"));

        assert!(ti.exists().await);
        assert!(!ti.is_locked().await);
        assert!(ti.has_error().await);
        assert_eq!(ti.errors().await.unwrap().count(), 1);
        assert!(!ti.is_ready().await);

        // dead-lettered instances are not picked up again
        assert!(queue.scan_ready().await.unwrap().is_empty());
        let counts = queue.counts().await.unwrap();
        assert_eq!(counts.errored, 1);
        assert_eq!(queue.find(StatusFilter::Error).await.unwrap().len(), 1);
        assert!(queue.find(StatusFilter::Open).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn execute_on_claimed_instance_is_blocked() {
        let handler = ConcreteHandler::ok();
        let queue = make_queue(Arc::clone(&handler)).await;
        let ti = publish(&queue, 1).await;

        let mut holder = queue.load_instance(ti.root().clone());
        holder.claim().await.unwrap();

        let mut loser = queue.load_instance(ti.root().clone());
        let outcome = queue.execute(&mut loser).await.unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Blocked);
        assert_eq!(handler.executed(), 0);
        assert!(ti.exists().await);
        assert!(!ti.has_error().await);
    }

    #[tokio::test]
    async fn execute_without_payload_is_blocked_and_unlocks() {
        let handler = ConcreteHandler::ok();
        let queue = make_queue(Arc::clone(&handler)).await;
        let mut ti = queue.create_instance();
        ti.root().mkdirs().await.unwrap();

        let outcome = queue.execute(&mut ti).await.unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Blocked);
        assert_eq!(handler.executed(), 0);
        assert!(!ti.is_locked().await);
    }

    #[tokio::test]
    async fn undecodable_payload_is_dead_lettered() {
        let handler = ConcreteHandler::ok();
        let queue = make_queue(Arc::clone(&handler)).await;
        let mut ti = queue.publish(b"{\"nope\":true}").await.unwrap();

        let outcome = queue.execute(&mut ti).await.unwrap();
        assert_eq!(outcome.kind, OutcomeKind::DeadLettered);
        assert_eq!(handler.executed(), 0);
        assert!(ti.has_error().await);
    }
    #[tokio::test]
    async fn stale_descriptor_of_completed_instance_is_blocked() {
        let handler = ConcreteHandler::ok();
        let queue = make_queue(Arc::clone(&handler)).await;
        let mut first = publish(&queue, 1).await;
        let mut stale = queue.load_instance(first.root().clone());

        queue.execute(&mut first).await.unwrap();
        let outcome = queue.execute(&mut stale).await.unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Blocked);
        assert_eq!(handler.executed(), 1);
    }

    #[tokio::test]
    async fn stale_descriptor_of_errored_instance_is_blocked() {
        let handler = ConcreteHandler::failing();
        let queue = make_queue(Arc::clone(&handler)).await;
        let mut first = publish(&queue, 1).await;
        let mut stale = queue.load_instance(first.root().clone());

        queue.execute(&mut first).await.unwrap();
        let outcome = queue.execute(&mut stale).await.unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Blocked);
        assert_eq!(handler.executed(), 1);
        assert_eq!(stale.errors().await.unwrap().count(), 1);
        assert!(!stale.is_locked().await);
    }

    #[tokio::test]
    async fn stale_claim_while_directory_is_being_removed_is_blocked() {
        let fs = GatedFs::new();
        let handler = ConcreteHandler::ok();
        let master = QueuePath::new("/localq", Arc::clone(&fs) as Arc<dyn FileSystem>, 0o777);
        let queue = Arc::new(make_queue_at(master, Arc::clone(&handler)).await);
        let first = publish(&queue, 1).await;
        let mut stale = queue.load_instance(first.root().clone());

        let worker = {
            let queue = Arc::clone(&queue);
            let mut first = first;
            tokio::spawn(async move { queue.execute(&mut first).await })
        };
        // the first worker is now stuck deleting the directory
        fs.entered.notified().await;

        let outcome = queue.execute(&mut stale).await.unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Blocked);
        assert!(!stale.is_locked().await);
        assert!(queue.instances().await.unwrap().is_empty());

        fs.resume.notify_one();
        let outcome = worker.await.unwrap().unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Completed);
        assert_eq!(handler.executed(), 1);
        assert!(queue.root().read_dir().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unwritable_error_record_is_reported_and_unlocks() {
        let fs = FaultyFs::failing_writes(".error");
        let master = QueuePath::new("/localq", fs as Arc<dyn FileSystem>, 0o777);
        let queue = make_queue_at(master, ConcreteHandler::failing()).await;
        let mut ti = publish(&queue, 3).await;

        let err = queue.execute(&mut ti).await.unwrap_err();
        assert!(matches!(err, QueueError::Io(ref e) if e.kind == FsErrorKind::PermissionDenied));
        assert!(!ti.is_locked().await);
        assert!(!ti.has_error().await);
        // nothing recorded, so the next scan retries it
        assert_eq!(queue.scan_ready().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_removal_after_success_is_reported() {
        let fs = FaultyFs::failing_renames();
        let handler = ConcreteHandler::ok();
        let master = QueuePath::new("/localq", fs as Arc<dyn FileSystem>, 0o777);
        let queue = make_queue_at(master, Arc::clone(&handler)).await;
        let mut ti = publish(&queue, 4).await;

        let err = queue.execute(&mut ti).await.unwrap_err();
        assert!(matches!(err, QueueError::Io(ref e) if e.kind == FsErrorKind::PermissionDenied));
        assert_eq!(handler.executed(), 1);
        // still claimed: not picked up again until the lock is cleared
        assert!(ti.exists().await);
        assert!(ti.is_locked().await);
        assert!(queue.scan_ready().await.unwrap().is_empty());
    }
}
