//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **OsFileSystem**: 本番用（tokio::fs）
//! - **MemFileSystem**: テスト用のインメモリ木構造

pub mod mem_fs;
pub mod os_fs;

pub use self::mem_fs::MemFileSystem;
pub use self::os_fs::OsFileSystem;
