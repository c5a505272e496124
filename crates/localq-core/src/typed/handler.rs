//! Handler trait - Task を実行する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (Handler<T>)
//! - Object-safe trait (DynHandler)
//! - Type erasure パターン (TypedHandler<T, H> → DynHandler)

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::codec::PayloadCodec;
use super::task::Task;
use crate::domain::ExecutionError;

/// Handler は Task を実行する
///
/// # 使用例
/// ```ignore
/// struct PrintHandler;
///
/// #[async_trait]
/// impl Handler<PrintTask> for PrintHandler {
///     async fn handle(&self, task: PrintTask) -> Result<(), ExecutionError> {
///         tracing::info!(name = %task.name, "print");
///         Ok(())
///     }
/// }
/// ```
///
/// 失敗は instance の error ファイルに記録され、自動リトライはされません。
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T) -> Result<(), ExecutionError>;
}

#[async_trait]
impl<T: Task, H: Handler<T> + ?Sized> Handler<T> for Arc<H> {
    async fn handle(&self, task: T) -> Result<(), ExecutionError> {
        (**self).handle(task).await
    }
}

/// DynHandler は object-safe な Handler の抽象化
///
/// TypedHandler<T, H> を DynHandler に変換することで、
/// task type ごとの TaskQueue に `Arc<dyn DynHandler>` として格納できます。
#[async_trait]
pub trait DynHandler: Send + Sync {
    /// Decode the raw payload file and run the typed handler.
    ///
    /// A payload that does not decode is an execution failure of that
    /// instance, not an I/O error.
    async fn execute_raw(&self, payload: &[u8]) -> Result<(), ExecutionError>;

    fn task_name(&self) -> &'static str;

    /// `TypeId` of the payload type `T`, used to check typed lookups.
    fn payload_type(&self) -> TypeId;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn execute_raw(&self, payload: &[u8]) -> Result<(), ExecutionError> {
        let task: T = PayloadCodec::decode(payload).map_err(|e| {
            ExecutionError::with_trace(format!("json decode: {e}"), format!("{e:?}"))
        })?;
        self.handler.handle(task).await
    }

    fn task_name(&self) -> &'static str {
        T::NAME
    }

    fn payload_type(&self) -> TypeId {
        TypeId::of::<T>()
    }
}
