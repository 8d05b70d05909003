//! 評価関数
//!
//! 探索は `Evaluator` トレイトにのみ依存する。
//! 同梱の実装は駒得と駒の前進度による `MaterialEvaluator`。

mod material;

pub use material::MaterialEvaluator;

use crate::position::Position;
use crate::types::{Color, Move, PieceType, Value};

/// 評価値の内訳（先手から見た値）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Evaluation {
    /// 駒得
    pub material: i32,
    /// 駒の配置
    pub positional: i32,
}

impl Evaluation {
    #[inline]
    pub const fn new(material: i32, positional: i32) -> Evaluation {
        Evaluation { material, positional }
    }

    /// 手番側から見た評価値
    #[inline]
    pub fn value(self, side: Color) -> Value {
        let total = (self.material + self.positional)
            .clamp(-Value::WIN_IN_MAX_PLY.raw() + 1, Value::WIN_IN_MAX_PLY.raw() - 1);
        Value::new(total * side.sign())
    }
}

/// 局面評価
pub trait Evaluator: Send + Sync {
    /// 局面全体を評価する
    fn evaluate(&self, pos: &Position) -> Evaluation;

    /// 着手後の局面を差分で評価する
    ///
    /// `pos` は `mv` を指した後の局面。`mv` は取った駒種付きで渡される
    /// （`Position::last_move` の値）。
    fn update(&self, prev: Evaluation, pos: &Position, mv: Move) -> Evaluation {
        let _ = (prev, mv);
        self.evaluate(pos)
    }

    /// 指す前の局面で、着手による手番側の駒得を見積もる（枝刈り用）
    fn estimate(&self, pos: &Position, mv: Move) -> i32 {
        let _ = pos;
        let mut gain = mv.captured().map_or(0, |pt| self.exchange_value(pt));
        if mv.is_promote() {
            gain += self.piece_value(mv.piece_type_after()) - self.piece_value(mv.piece_type());
        }
        gain
    }

    /// 盤上の駒の価値
    fn piece_value(&self, pt: PieceType) -> i32;

    /// 駒を取ったときの駒得（相手の駒が消える分と自分の手駒が増える分）
    fn exchange_value(&self, pt: PieceType) -> i32;
}
