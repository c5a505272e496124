//! TypedQueue - the producer-facing handle for one statically known Task.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::instance::TaskInstance;
use super::task_queue::TaskQueue;
use crate::domain::Outcome;
use crate::error::Result;
use crate::typed::{PayloadCodec, Task};

/// Obtained from `Registry::enqueue::<T>()`, which has already checked that
/// the queue registered under `T::NAME` decodes `T`.
pub struct TypedQueue<T: Task> {
    queue: Arc<TaskQueue>,
    _marker: PhantomData<fn(T)>,
}

impl<T: Task> TypedQueue<T> {
    pub(crate) fn new(queue: Arc<TaskQueue>) -> Self {
        Self {
            queue,
            _marker: PhantomData,
        }
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Validate, serialize and persist `task` as a new READY instance.
    ///
    /// A `ValidationError` (or an unserializable payload) writes nothing.
    pub async fn send(&self, task: &T) -> Result<TaskInstance> {
        task.validate()?;
        let payload = PayloadCodec::encode(task)?;
        self.queue.publish(&payload).await
    }

    /// `send`, then execute the new instance on the caller's task.
    ///
    /// A failing handler is not an `Err` here either: inspect the returned
    /// outcome, which is `DeadLettered` in that case.
    pub async fn run(&self, task: &T) -> Result<(TaskInstance, Outcome)> {
        let mut instance = self.send(task).await?;
        let outcome = self.queue.execute(&mut instance).await?;
        Ok((instance, outcome))
    }
}

impl<T: Task> Clone for TypedQueue<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.queue))
    }
}

impl<T: Task> fmt::Debug for TypedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedQueue")
            .field("task", &T::NAME)
            .field("root", self.queue.root())
            .finish()
    }
}
