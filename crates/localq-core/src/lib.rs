//! localq-core
//!
//! Filesystem-backed durable task queue for a single host.
//!
//! Every task instance is a directory; its state is the set of files in it.
//! Producers and consumers can live in different processes as long as they
//! share the filesystem.
//!
//! # モジュール構成
//! - **path**: QueuePath（パス + filesystem backend + permission mode）
//! - **lock**: FileLock（排他的作成によるロック）
//! - **queue**: TaskInstance の状態遷移と task type ごとの TaskQueue
//! - **app**: Registry / RegistryBuilder / RegistryCache / scan cycle / Consumer
//! - **typed**: 型付き Task API（Task trait, Handler trait, PayloadCodec）
//! - **domain**: ドメインモデル（ids, state, outcome, error records）
//! - **ports**: 抽象化レイヤー（FileSystem, Clock, IdGenerator）
//! - **impls**: 実装（OsFileSystem, MemFileSystem）
//! - **config**: QueueConfig（TOML / 環境変数）
//! - **error**: QueueError
//!
//! ```ignore
//! let registry = Registry::builder(QueueConfig::new("/var/spool/localq"))
//!     .register::<PrintTask, _>(PrintHandler)?
//!     .build()
//!     .await?;
//! registry.enqueue::<PrintTask>()?.send(&PrintTask { n: 1 }).await?;
//! let report = registry.run_all_tasks().await;
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod lock;
pub mod path;
pub mod ports;
pub mod queue;
pub mod typed;

#[cfg(test)]
mod test_support;

pub use app::{Consumer, Registry, RegistryBuilder, RegistryCache, ScanReport};
pub use config::QueueConfig;
pub use domain::{ExecutionError, InstanceId, InstanceState, Outcome, OutcomeKind, ValidationError};
pub use error::{QueueError, Result};
pub use impls::{MemFileSystem, OsFileSystem};
pub use lock::FileLock;
pub use path::QueuePath;
pub use queue::{QueueCounts, StatusFilter, TaskInstance, TaskQueue, TypedQueue};
pub use typed::{Handler, Task};
