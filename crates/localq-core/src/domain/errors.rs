//! Errors - ドメインエラーと運用分類
//!
//! `ValidationError` と `ExecutionError` はタスク側（ホストアプリ）が返すエラー。
//! `ErrorKind` は `QueueError` を運用上どう扱うかの分類。

use std::error::Error as StdError;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// ErrorKind は失敗の運用分類
///
/// - Expected: 正常系の一部（claim 競争に負けた等）
/// - Permanent: 入力や登録内容の問題（同じ操作を繰り返しても直らない）
/// - Infrastructure: ファイルシステムなどの障害
/// - Fatal: プログラマのミス。ホストは abort して再起動してよい
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Expected,
    Permanent,
    Infrastructure,
    Fatal,
}

/// A payload rejected by its task type before anything was written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure reported by a task's own domain logic.
///
/// Captured into the instance's error log; never raised to the scan driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
    pub trace: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: String::new(),
        }
    }

    pub fn with_trace(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Message from `err`, trace from its `source()` chain (one cause per line).
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut trace = String::new();
        let mut source = err.source();
        while let Some(cause) = source {
            if !trace.is_empty() {
                trace.push('\n');
            }
            let _ = write!(trace, "caused by: {cause}");
            source = cause.source();
        }
        Self {
            message: err.to_string(),
            trace,
        }
    }
}
