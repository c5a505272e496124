//! Typed - 型付き Task API
//!
//! payload の型を task type ごとに静的に束縛し、
//! 検証とデコードを型で保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait, `Handler<T>` trait - 型安全
//! - **内部（Dyn）**: `DynHandler` trait - object-safe, type erasure

pub mod codec;
pub mod handler;
pub mod task;

pub use self::codec::{CodecError, PayloadCodec};
pub use self::handler::{DynHandler, Handler, TypedHandler};
pub use self::task::Task;
