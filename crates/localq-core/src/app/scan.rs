//! Scan cycle - one pass over every task type, executing all ready work.
//!
//! # フロー
//! 1. 各 TaskQueue で scan_ready()（一覧取得の失敗は report に積んで次の type へ）
//! 2. ready な instance ごとに worker task を spawn（Semaphore で上限を任意設定）
//! 3. JoinSet で全 worker の終了を待つ（barrier）
//! 4. Outcome と I/O エラーを ScanReport に集約
//!
//! Handler の失敗は instance の error ファイルに記録済みなので、
//! report の errors には入りません。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

use crate::domain::{Outcome, OutcomeKind};
use crate::error::QueueError;
use crate::queue::TaskQueue;

/// Aggregate of one scan cycle.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub dispatched: usize,
    pub completed: usize,
    pub dead_lettered: usize,
    /// Lost the claim to another consumer.
    pub blocked: usize,
    /// I/O failures (listing or executing) and crashed workers.
    pub errors: Vec<QueueError>,
}

impl ScanReport {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome.kind {
            OutcomeKind::Completed => self.completed += 1,
            OutcomeKind::DeadLettered => self.dead_lettered += 1,
            OutcomeKind::Blocked => self.blocked += 1,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<QueueError> {
        self.errors
    }
}

/// Run one cycle over `queues`. Returns once every spawned worker finished.
///
/// `max_workers = None` executes every ready instance concurrently.
pub async fn run_cycle(queues: Vec<Arc<TaskQueue>>, max_workers: Option<usize>) -> ScanReport {
    let mut report = ScanReport::default();
    let limit = max_workers.map(|n| Arc::new(Semaphore::new(n)));
    let mut workers = JoinSet::new();

    for queue in queues {
        let ready = match queue.scan_ready().await {
            Ok(ready) => ready,
            Err(e) => {
                error!(task = %queue.name(), error = %e, "scan failed");
                report.errors.push(e);
                continue;
            }
        };

        for mut instance in ready {
            let queue = Arc::clone(&queue);
            let limit = limit.clone();
            report.dispatched += 1;
            workers.spawn(async move {
                let _permit = match limit {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire_owned()
                            .await
                            .map_err(|e| QueueError::Worker(e.to_string()))?,
                    ),
                    None => None,
                };
                queue.execute(&mut instance).await
            });
        }
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(outcome)) => report.record(&outcome),
            Ok(Err(e)) => {
                error!(error = %e, "execute failed");
                report.errors.push(e);
            }
            Err(e) => {
                error!(error = %e, "worker crashed");
                report.errors.push(QueueError::Worker(e.to_string()));
            }
        }
    }

    report
}
