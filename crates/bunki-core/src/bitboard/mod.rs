//! ビットボードモジュール
//!
//! 81マスの盤面を128bitで表現し、利き計算テーブルを提供する。
//!
//! - `Bitboard`: 128bit盤面表現
//! - `AttackTables`: 駒の動き記述子・利き・直線・王手候補テーブル一式

mod core;
mod tables;

pub use core::{Bitboard, BitboardIter};
pub use tables::{AttackTables, Direction, PieceMovement};
