//! App - アプリケーション層
//!
//! queue モジュールの部品を組み合わせて、登録・scan・常駐ループを提供します。
//!
//! # 主要コンポーネント
//! - **RegistryBuilder**: Registry の構築とワイヤリング（起動時検証）
//! - **Registry**: task 名 → TaskQueue の束縛
//! - **RegistryCache**: resolved root ごとの Registry 共有
//! - **scan**: 一回の scan cycle（ready な instance を並行実行）
//! - **Consumer**: scan cycle を一定間隔で回すループ

pub mod builder;
pub mod cache;
pub mod registry;
pub mod scan;
pub mod worker_loop;

pub use self::builder::RegistryBuilder;
pub use self::cache::RegistryCache;
pub use self::registry::Registry;
pub use self::scan::{ScanReport, run_cycle};
pub use self::worker_loop::Consumer;
