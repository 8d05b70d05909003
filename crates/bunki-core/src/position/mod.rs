//! 局面モジュール
//!
//! 盤面・手駒・手番を保持し、指し手の実行と取り消し、合法性判定、
//! 王手判定、指し手生成、SFEN入出力を提供する。

mod check;
mod movegen;
mod pos;
mod sfen;
mod zobrist;

pub use movegen::{GenType, MoveList};
pub use pos::Position;
pub use sfen::{MoveParseError, SFEN_HIRATE, SfenError};
pub use zobrist::ZobristKeys;
