//! Task trait - 型付き payload の定義
//!
//! # 学習ポイント
//! - Associated Constants (`const NAME`)
//! - Trait bounds の組み合わせ (Serialize + DeserializeOwned + Send + Sync + 'static)
//! - default method による任意の検証

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::ValidationError;

/// Task は task type 名と payload 型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct PrintTask {
///     name: String,
/// }
///
/// impl Task for PrintTask {
///     const NAME: &'static str = "print";
///
///     fn validate(&self) -> Result<(), ValidationError> {
///         if self.name.is_empty() {
///             return Err(ValidationError::new("PrintTask.name is empty"));
///         }
///         Ok(())
///     }
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize`: payload ファイルへの保存のため
/// - `DeserializeOwned`: payload ファイルからの復元のため
/// - `Send + Sync + 'static`: worker task に渡すため
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Task type name; also the queue's subdirectory under the registry root.
    const NAME: &'static str;

    /// Checked by `send` before anything touches the disk.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}
