//! Consumer - scan cycle を一定間隔で回し続けるループ
//!
//! # フロー
//! 1. shutdown が来ていたら抜ける
//! 2. Registry::run_all_tasks()（全 worker の終了まで待つ）
//! 3. poll interval だけ sleep（shutdown と select で競合させる）
//!
//! 実行中の cycle は中断しません。shutdown は次の cycle を始めないだけです。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::registry::Registry;
use crate::error::{QueueError, Result};

/// Consumer handle.
/// - `request_shutdown()` で次の cycle を始めなくなる
/// - `shutdown_and_join()` で実行中の cycle の完了を待つ
pub struct Consumer {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<u64>,
}

impl Consumer {
    /// Spawn the loop on the current runtime.
    pub fn spawn(registry: Arc<Registry>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move { consume(registry, interval, &mut shutdown_rx).await });
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already have exited
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop and wait. Returns the number of completed scan cycles.
    pub async fn shutdown_and_join(self) -> Result<u64> {
        self.request_shutdown();
        self.join
            .await
            .map_err(|e| QueueError::Worker(e.to_string()))
    }
}

async fn consume(
    registry: Arc<Registry>,
    interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> u64 {
    info!(root = %registry.root(), tasks = ?registry.names(), "consumer started");
    let mut cycles = 0u64;
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let report = registry.run_all_tasks().await;
        cycles += 1;
        for e in report.errors.iter().filter(|e| e.is_fatal()) {
            warn!(error = %e, "fatal error during scan cycle");
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender dropped: nobody can stop us anymore, so stop now
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!(cycles, "consumer stopped");
    cycles
}
