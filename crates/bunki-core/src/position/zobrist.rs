//! Zobristハッシュ
//!
//! 盤面キー（手番を含まない）と手駒キー（加算型）を分けて持つ。
//! 優等局面の判定では盤面キーだけで同一盤面を引き、手駒は別に比較する。

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::types::{Color, Piece, PieceType, Square};

/// 乱数の種（再現性のため固定）
const ZOBRIST_SEED: u64 = 0x6275_6E6B_695F_7A6F;

/// Zobristハッシュ用乱数テーブル
pub struct ZobristKeys {
    /// 手番用
    pub side: u64,
    /// 駒×升 [Piece.index()][Square.index()]
    psq: Vec<[u64; Square::NUM]>,
    /// 手駒（加算型）[Color][hand_index]
    hand: [[u64; PieceType::HAND_NUM]; Color::NUM],
}

impl ZobristKeys {
    pub fn new() -> ZobristKeys {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(ZOBRIST_SEED);
        let side = rng.next_u64();
        let mut psq = vec![[0u64; Square::NUM]; Piece::NUM];
        // Piece::NONE は常に0を保つ
        for row in psq.iter_mut().skip(1) {
            for key in row.iter_mut() {
                *key = rng.next_u64();
            }
        }
        let mut hand = [[0u64; PieceType::HAND_NUM]; Color::NUM];
        for row in hand.iter_mut() {
            for key in row.iter_mut() {
                *key = rng.next_u64();
            }
        }
        ZobristKeys { side, psq, hand }
    }

    /// 駒と升のキー
    #[inline]
    pub fn psq(&self, pc: Piece, sq: Square) -> u64 {
        self.psq[pc.index()][sq.index()]
    }

    /// 手駒1枚分のキー（枚数分を加算して使う）
    #[inline]
    pub fn hand(&self, color: Color, pt: PieceType) -> u64 {
        match pt.hand_index() {
            Some(i) => self.hand[color.index()][i],
            None => 0,
        }
    }
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        let a = ZobristKeys::new();
        let b = ZobristKeys::new();
        let pc = Piece::new(Color::White, PieceType::Rook);
        assert_eq!(a.psq(pc, Square::SQ_99), b.psq(pc, Square::SQ_99));
        assert_eq!(a.side, b.side);
        assert_eq!(a.psq(Piece::NONE, Square::SQ_11), 0);
        assert_ne!(a.hand(Color::Black, PieceType::Pawn), a.hand(Color::White, PieceType::Pawn));
    }
}
