//! 置換表モジュール
//!
//! 探索結果をキャッシュする置換表（Transposition Table）。
//!
//! - `TtEntry`: エントリ（構造化フィールド + チェックサム）
//! - `Bucket`: 4エントリのグループ（バケットごとのロック）
//! - `TranspositionTable`: テーブル本体と世代管理

mod entry;
mod table;

pub use entry::{TtData, TtEntry};
pub use table::TranspositionTable;

/// バケット内のエントリ数
pub const BUCKET_SIZE: usize = 4;
