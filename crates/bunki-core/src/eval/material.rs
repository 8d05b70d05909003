//! 駒得 + 前進度の評価関数

use super::{Evaluation, Evaluator};
use crate::position::Position;
use crate::types::{Color, Move, PieceType, Square};

/// 盤上の駒の価値（`PieceType` の値でインデックス）
const PIECE_VALUE: [i32; PieceType::NUM] = [
    0,     // 未使用
    87,    // 歩
    232,   // 香
    257,   // 桂
    369,   // 銀
    569,   // 角
    642,   // 飛
    444,   // 金
    15000, // 玉
    534,   // と
    489,   // 成香
    510,   // 成桂
    495,   // 成銀
    827,   // 馬
    945,   // 龍
];

/// 手駒の価値（盤上より少し高い）
const HAND_VALUE: [i32; PieceType::NUM] = [
    0, 99, 250, 281, 401, 625, 708, 480, 0, 0, 0, 0, 0, 0, 0,
];

/// 前進1段あたりの配置点
const ADVANCE: [i32; PieceType::NUM] = [0, 3, 1, 2, 4, 0, 0, 2, 0, 3, 2, 2, 2, 0, 0];

/// 玉の段ごとの配置点（自陣の奥ほど高い）
const KING_RANK: [i32; 9] = [20, 10, 0, -10, -20, -30, -40, -50, -60];

/// 駒得と前進度による評価関数
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialEvaluator;

impl MaterialEvaluator {
    pub fn new() -> MaterialEvaluator {
        MaterialEvaluator
    }

    #[inline]
    fn hand_value(pt: PieceType) -> i32 {
        HAND_VALUE[pt.index()]
    }

    /// 駒1枚の配置点（先手から見た値）
    #[inline]
    fn placement(color: Color, pt: PieceType, sq: Square) -> i32 {
        // 手前から数えた段（自陣一段目 = 0）
        let advanced = 8 - i32::from(sq.relative_rank(color));
        let score = if pt == PieceType::King {
            KING_RANK[advanced as usize]
        } else {
            ADVANCE[pt.index()] * advanced
        };
        score * color.sign()
    }
}

impl Evaluator for MaterialEvaluator {
    fn evaluate(&self, pos: &Position) -> Evaluation {
        let mut eval = Evaluation::default();
        for color in Color::ALL {
            let sign = color.sign();
            for sq in pos.pieces_c(color) {
                let Some(pt) = pos.piece_on(sq).piece_type() else {
                    continue;
                };
                if pt != PieceType::King {
                    eval.material += PIECE_VALUE[pt.index()] * sign;
                }
                eval.positional += Self::placement(color, pt, sq);
            }
            let hand = pos.hand(color);
            for pt in PieceType::HAND_PIECES {
                eval.material += Self::hand_value(pt) * hand.count(pt) as i32 * sign;
            }
        }
        eval
    }

    fn update(&self, prev: Evaluation, pos: &Position, mv: Move) -> Evaluation {
        // pos は着手後なので、指した側は手番の反対
        let us = !pos.side_to_move();
        let sign = us.sign();
        let to = mv.to();
        let pt = mv.piece_type();
        let after = mv.piece_type_after();
        let mut eval = prev;

        match mv.from() {
            None => {
                eval.material += (PIECE_VALUE[pt.index()] - Self::hand_value(pt)) * sign;
                eval.positional += Self::placement(us, pt, to);
            }
            Some(from) => {
                eval.positional += Self::placement(us, after, to) - Self::placement(us, pt, from);
                if mv.is_promote() {
                    eval.material += (PIECE_VALUE[after.index()] - PIECE_VALUE[pt.index()]) * sign;
                }
                if let Some(cap) = mv.captured() {
                    eval.material += self.exchange_value(cap) * sign;
                    eval.positional -= Self::placement(!us, cap, to);
                }
            }
        }
        eval
    }

    #[inline]
    fn piece_value(&self, pt: PieceType) -> i32 {
        PIECE_VALUE[pt.index()]
    }

    #[inline]
    fn exchange_value(&self, pt: PieceType) -> i32 {
        if pt == PieceType::King {
            return PIECE_VALUE[pt.index()];
        }
        PIECE_VALUE[pt.index()] + Self::hand_value(pt.unpromote())
    }
}
