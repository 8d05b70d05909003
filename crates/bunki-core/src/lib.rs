//! # bunki-core
//!
//! 分割点方式（tree splitting）で並列化した将棋の探索エンジン。
//!
//! ## モジュール構成
//!
//! - `types`: 基本型（Color, Square, Piece, Move, Value, etc.）
//! - `bitboard`: ビットボードと利き表
//! - `position`: 局面表現、do_move/undo_move、指し手生成、SFEN
//! - `eval`: 評価関数のトレイトと駒得による実装
//! - `see`: 静的交換評価
//! - `mate`: 1手詰め・3手詰め判定
//! - `shek`: 経路上の同一・優劣局面の検出
//! - `tt`: 置換表（Transposition Table）
//! - `search`: 探索と並列化

// 基本型
pub mod types;

// 盤面表現
pub mod bitboard;
pub mod position;

// 評価
pub mod eval;
pub mod see;

// 詰み探索
pub mod mate;

// 探索
pub mod search;
pub mod shek;
pub mod tt;

pub use position::Position;
pub use search::{SearchConfig, SearchDiagnostics, Searcher};
