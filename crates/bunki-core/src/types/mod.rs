//! 基本型モジュール
//!
//! 探索エンジン全体で共有する盤面・指し手・評価値の型を定義する。
//!
//! # 型の依存関係
//!
//! ```text
//! Color
//!   ↓
//! Square
//!   ↓
//! PieceType → Piece
//!   ↓
//! Hand, Move
//!
//! Value, Depth, Bound は独立
//! ```

mod bound;
mod color;
mod depth;
mod hand;
mod moves;
mod piece;
mod square;
mod value;

pub use bound::Bound;
pub use color::Color;
pub use depth::*;
pub use hand::Hand;
pub use moves::Move;
pub use piece::{Piece, PieceType};
pub use square::Square;
pub use value::Value;
