//! Registry - task type 名から TaskQueue への束縛
//!
//! # 設計
//! - 起動時に register（可変）、scan 中は読み取りのみ
//! - 登録順を保持（scan もこの順で type を巡回する）
//! - 同じ root を共有したい場合は `RegistryCache` を明示的に使う
//!
//! 登録の内部状態は std::sync::RwLock で守り、await を跨いで保持しない。

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, error, info};

use super::builder::RegistryBuilder;
use super::scan::{ScanReport, run_cycle};
use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::path::QueuePath;
use crate::ports::{Clock, FileSystem, IdGenerator};
use crate::queue::{QueueCounts, TaskQueue, TypedQueue};
use crate::typed::{DynHandler, Handler, Task, TypedHandler};

pub struct Registry {
    root: QueuePath,
    config: QueueConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    queues: RwLock<Vec<Arc<TaskQueue>>>,
}

impl Registry {
    /// Open (creating if needed) the registry rooted at `config.root`.
    ///
    /// Every call returns a new handle; use `RegistryCache` for per-root
    /// de-duplication.
    pub async fn open(config: QueueConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        RegistryBuilder::new(config).filesystem(fs).build().await
    }

    pub fn builder(config: QueueConfig) -> RegistryBuilder {
        RegistryBuilder::new(config)
    }

    pub(crate) async fn create(
        config: QueueConfig,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let root = QueuePath::new(&config.root, fs, config.dir_mode).resolve()?;
        root.mkdirs().await?;
        Ok(Self {
            root,
            config,
            clock,
            ids,
            queues: RwLock::new(Vec::new()),
        })
    }

    fn queues_guard(&self) -> RwLockReadGuard<'_, Vec<Arc<TaskQueue>>> {
        self.queues.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolved absolute root.
    pub fn root(&self) -> &QueuePath {
        &self.root
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Bind `T::NAME` to `handler` and create its subdirectory.
    ///
    /// # Errors
    /// - `DuplicateRegistration` if the name is taken; the existing binding
    ///   is left intact
    /// - `Io` if the subdirectory cannot be created
    pub async fn register<T: Task, H: Handler<T> + 'static>(&self, handler: H) -> Result<()> {
        self.register_dyn(Arc::new(TypedHandler::<T, H>::new(handler)))
            .await
    }

    pub(crate) async fn register_dyn(&self, handler: Arc<dyn DynHandler>) -> Result<()> {
        let name = handler.task_name();
        if self.has(name) {
            return Err(QueueError::DuplicateRegistration(name.to_string()));
        }
        let queue = TaskQueue::create(
            &self.root,
            handler,
            Arc::clone(&self.clock),
            Arc::clone(&self.ids),
        )
        .await?;

        let mut queues = self.queues.write().unwrap_or_else(PoisonError::into_inner);
        // re-check: another register() may have won while we were creating
        if queues.iter().any(|q| q.name() == name) {
            return Err(QueueError::DuplicateRegistration(name.to_string()));
        }
        queues.push(Arc::new(queue));
        info!(task = name, root = %self.root, "task registered");
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.queues_guard().iter().any(|q| q.name() == name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.queues_guard()
            .iter()
            .map(|q| q.name().to_string())
            .collect()
    }

    /// Snapshot of all queues in registration order.
    pub fn queues(&self) -> Vec<Arc<TaskQueue>> {
        self.queues_guard().clone()
    }

    /// # Errors
    /// `UnregisteredTask` (fatal): every task type must be registered before
    /// work is issued for it.
    pub fn get(&self, name: &str) -> Result<Arc<TaskQueue>> {
        self.queues_guard()
            .iter()
            .find(|q| q.name() == name)
            .cloned()
            .ok_or_else(|| QueueError::UnregisteredTask(name.to_string()))
    }

    /// Producer handle for `T`.
    ///
    /// # Errors
    /// `UnregisteredTask` (fatal) if `T::NAME` is unknown or was registered
    /// for a different payload type.
    pub fn enqueue<T: Task>(&self) -> Result<TypedQueue<T>> {
        let queue = self.get(T::NAME)?;
        if queue.handler().payload_type() != TypeId::of::<T>() {
            error!(
                task = T::NAME,
                payload = std::any::type_name::<T>(),
                "task name is registered with a different payload type"
            );
            return Err(QueueError::UnregisteredTask(T::NAME.to_string()));
        }
        Ok(TypedQueue::new(queue))
    }

    /// One scan cycle over every registered task type.
    ///
    /// Blocks until every dispatched worker has finished. Handler failures
    /// are already persisted and do not appear in the report's errors.
    pub async fn run_all_tasks(&self) -> ScanReport {
        let report = run_cycle(self.queues(), self.config.max_workers).await;
        if report.dispatched > 0 || !report.is_clean() {
            info!(
                dispatched = report.dispatched,
                completed = report.completed,
                dead_lettered = report.dead_lettered,
                blocked = report.blocked,
                errors = report.errors.len(),
                "scan cycle finished"
            );
        } else {
            debug!("scan cycle found no ready tasks");
        }
        report
    }

    /// Per-type instance counts, in registration order.
    pub async fn counts(&self) -> Result<Vec<(String, QueueCounts)>> {
        let mut all = Vec::new();
        for queue in self.queues() {
            all.push((queue.name().to_string(), queue.counts().await?));
        }
        Ok(all)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("root", &self.root)
            .field("tasks", &self.names())
            .finish()
    }
}
