//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部リソース（ファイルシステム、時計、乱数）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - ファイルシステムが source of truth（正本）。メモリ上に状態を持たない
//! - 時刻と ID 生成はテストで差し替え可能

pub mod clock;
pub mod filesystem;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::filesystem::{FileSystem, FsError, FsErrorKind, FsMetadata};
pub use self::id_generator::{IdGenerator, UlidGenerator};
