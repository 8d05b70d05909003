//! マス（Square）
//!
//! `file * 9 + rank` で表す。file 0 が 1筋、rank 0 が一段目。
//! 先手は rank が小さくなる方向へ進む。

use super::Color;

/// 盤上のマス（0..81）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Square(u8);

impl Square {
    /// マスの数
    pub const NUM: usize = 81;

    /// 1一
    pub const SQ_11: Square = Square(0);
    /// 9九
    pub const SQ_99: Square = Square(80);

    /// 筋・段（いずれも 0 始まり）から生成
    #[inline]
    pub const fn new(file: u8, rank: u8) -> Square {
        debug_assert!(file < 9 && rank < 9);
        Square(file * 9 + rank)
    }

    /// インデックスから生成（範囲チェックあり）
    #[inline]
    pub const fn from_index(index: usize) -> Option<Square> {
        if index < Self::NUM { Some(Square(index as u8)) } else { None }
    }

    /// インデックスから生成（範囲チェックなし、呼び出し側で保証する）
    #[inline]
    pub const fn from_u8_unchecked(index: u8) -> Square {
        debug_assert!((index as usize) < Self::NUM);
        Square(index)
    }

    /// 筋（0 = 1筋）
    #[inline]
    pub const fn file(self) -> u8 {
        self.0 / 9
    }

    /// 段（0 = 一段目）
    #[inline]
    pub const fn rank(self) -> u8 {
        self.0 % 9
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// 筋・段のオフセットを加えたマス（盤外なら None）
    #[inline]
    pub const fn offset(self, df: i8, dr: i8) -> Option<Square> {
        let f = self.file() as i8 + df;
        let r = self.rank() as i8 + dr;
        if f < 0 || f > 8 || r < 0 || r > 8 {
            None
        } else {
            Some(Square::new(f as u8, r as u8))
        }
    }

    /// 手番から見た段（先手なら rank、後手なら 8 - rank）
    #[inline]
    pub const fn relative_rank(self, color: Color) -> u8 {
        match color {
            Color::Black => self.rank(),
            Color::White => 8 - self.rank(),
        }
    }

    /// 敵陣（三段目以内）か
    #[inline]
    pub const fn is_promotion_zone(self, color: Color) -> bool {
        self.relative_rank(color) < 3
    }

    /// 180度回転したマス
    #[inline]
    pub const fn flip(self) -> Square {
        Square(80 - self.0)
    }

    /// 全マスのイテレータ
    pub fn all() -> impl Iterator<Item = Square> {
        (0..Self::NUM as u8).map(Square)
    }

    /// USI表記（例: "7g"）
    pub fn to_usi(self) -> String {
        let file = (b'1' + self.file()) as char;
        let rank = (b'a' + self.rank()) as char;
        format!("{file}{rank}")
    }

    /// USI表記からパース
    pub fn from_usi(s: &str) -> Option<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].checked_sub(b'1')?;
        let rank = bytes[1].checked_sub(b'a')?;
        if file < 9 && rank < 9 { Some(Square::new(file, rank)) } else { None }
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_usi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_layout() {
        assert_eq!(Square::new(0, 0), Square::SQ_11);
        assert_eq!(Square::new(8, 8), Square::SQ_99);
        let sq = Square::new(6, 6);
        assert_eq!(sq.file(), 6);
        assert_eq!(sq.rank(), 6);
        assert_eq!(sq.to_usi(), "7g");
    }

    #[test]
    fn test_square_usi_roundtrip() {
        for sq in Square::all() {
            assert_eq!(Square::from_usi(&sq.to_usi()), Some(sq));
        }
        assert_eq!(Square::from_usi("0a"), None);
        assert_eq!(Square::from_usi("1j"), None);
    }

    #[test]
    fn test_square_offset_edges() {
        assert_eq!(Square::SQ_11.offset(-1, 0), None);
        assert_eq!(Square::SQ_11.offset(0, -1), None);
        assert_eq!(Square::SQ_11.offset(1, 1), Some(Square::new(1, 1)));
        assert_eq!(Square::SQ_99.offset(1, 0), None);
    }

    #[test]
    fn test_promotion_zone() {
        assert!(Square::new(4, 2).is_promotion_zone(Color::Black));
        assert!(!Square::new(4, 3).is_promotion_zone(Color::Black));
        assert!(Square::new(4, 6).is_promotion_zone(Color::White));
        assert_eq!(Square::new(2, 1).flip(), Square::new(6, 7));
    }
}
