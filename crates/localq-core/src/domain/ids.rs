//! Instance identifiers.
//!
//! # ULID ベースの ID
//! 新規 instance の ID は ULID (26 文字、Crockford base32) から生成します。
//! - **固定長**: ディレクトリ名・ファイル名にそのまま使える
//! - **分散生成可能**: プロセス間の調整なしで衝突しない
//! - **時刻でソート可能**: ただし scan の実行順序は保証しない
//!
//! ディスクから読み戻した instance はディレクトリ名をそのまま ID とするので、
//! 型としては ULID ではなく不透明な文字列として扱います。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of one task instance; also its directory and file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Length of every generated id.
    pub const LEN: usize = 26;

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }

    /// Wrap a name read back from disk.
    pub fn from_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Ulid> for InstanceId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
