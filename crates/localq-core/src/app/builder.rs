//! RegistryBuilder - Registry の構築とワイヤリング
//!
//! # ポイント
//! - Builder パターン（filesystem / clock / id 生成器を差し替え可能）
//! - 起動時検証（Fail-fast 設計）
//! - 重複登録は register() の時点でエラー

use std::sync::Arc;

use super::registry::Registry;
use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::impls::OsFileSystem;
use crate::ports::{Clock, FileSystem, IdGenerator, SystemClock, UlidGenerator};
use crate::typed::{DynHandler, Handler, Task, TypedHandler};

/// RegistryBuilder は Registry を構築
///
/// # 使用例
/// ```ignore
/// let registry = RegistryBuilder::new(QueueConfig::new("/var/spool/localq"))
///     .register::<PrintTask, _>(PrintHandler)?
///     .expect_tasks(&[PrintTask::NAME])
///     .build()
///     .await?;
/// ```
///
/// # Fail-fast 設計
/// - expect_tasks() で期待される task 名を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば `QueueError::MissingTaskTypes` を返す（ディスクには触らない）
pub struct RegistryBuilder {
    config: QueueConfig,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    handlers: Vec<Arc<dyn DynHandler>>,
    expected_tasks: Option<Vec<String>>,
}

impl RegistryBuilder {
    /// OS filesystem, wall clock and ULID ids by default.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            fs: Arc::new(OsFileSystem),
            clock: Arc::new(SystemClock),
            ids: None,
            handlers: Vec::new(),
            expected_tasks: None,
        }
    }

    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Defaults to a `UlidGenerator` over the configured clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Handler を登録
    ///
    /// # Errors
    /// 同じ `T::NAME` が登録済みなら `DuplicateRegistration`
    pub fn register<T: Task, H: Handler<T> + 'static>(mut self, handler: H) -> Result<Self> {
        if self.handlers.iter().any(|h| h.task_name() == T::NAME) {
            return Err(QueueError::DuplicateRegistration(T::NAME.to_string()));
        }
        self.handlers
            .push(Arc::new(TypedHandler::<T, H>::new(handler)));
        Ok(self)
    }

    /// 期待される task 名のリストを設定
    pub fn expect_tasks(mut self, names: &[&str]) -> Self {
        self.expected_tasks = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn registered_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.task_name()).collect()
    }

    /// Registry を構築
    ///
    /// # 検証
    /// - expect_tasks() の名前が全て登録されているか
    /// - config の値が妥当か
    ///
    /// 検証を通ったら root と各 task type のディレクトリを作成します。
    pub async fn build(self) -> Result<Registry> {
        if let Some(expected) = &self.expected_tasks {
            let registered = self.registered_names();
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !registered.contains(&name.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(QueueError::MissingTaskTypes(missing));
            }
        }

        let ids = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&self.clock))),
        };
        let registry = Registry::create(self.config, self.fs, self.clock, ids).await?;
        for handler in self.handlers {
            registry.register_dyn(handler).await?;
        }
        Ok(registry)
    }
}
