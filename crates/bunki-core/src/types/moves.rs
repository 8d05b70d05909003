//! 指し手（Move）

use super::{PieceType, Square};

/// 指し手（32bit）
///
/// - bit 0-6:   移動先 (to)
/// - bit 7-13:  移動元 (from) / 駒打ちの場合は打つ駒種
/// - bit 14:    駒打ちフラグ
/// - bit 15:    成りフラグ
/// - bit 16-19: 動かす駒種（成る前）
/// - bit 20-23: 取る駒種（0 = 取りなし）
///
/// 取る駒種は生成時の付加情報で、等値比較とハッシュからは除外する。
/// 置換表やキラーに保存した手と生成手をそのまま比較できるようにするため。
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct Move(u32);

impl Move {
    /// 無効な指し手
    pub const NONE: Move = Move(0);
    /// 探索用 null move（パス）
    pub const NULL: Move = Move(0x0081);

    const TO_MASK: u32 = 0x007F;
    const FROM_MASK: u32 = 0x3F80;
    const FROM_SHIFT: u32 = 7;
    const DROP_FLAG: u32 = 0x4000;
    const PROMOTE_FLAG: u32 = 0x8000;
    const PIECE_SHIFT: u32 = 16;
    const PIECE_MASK: u32 = 0x0F;
    const CAPTURE_SHIFT: u32 = 20;
    /// 比較に使うビット（取る駒種を除く）
    const IDENTITY_MASK: u32 = 0x000F_FFFF;

    /// 盤上の駒を動かす指し手
    #[inline]
    pub const fn new_move(
        pt: PieceType,
        from: Square,
        to: Square,
        promote: bool,
        captured: Option<PieceType>,
    ) -> Move {
        let mut m = (to.raw() as u32)
            | ((from.raw() as u32) << Self::FROM_SHIFT)
            | ((pt as u32) << Self::PIECE_SHIFT);
        if promote {
            m |= Self::PROMOTE_FLAG;
        }
        if let Some(cap) = captured {
            m |= (cap as u32) << Self::CAPTURE_SHIFT;
        }
        Move(m)
    }

    /// 駒打ちの指し手
    #[inline]
    pub const fn new_drop(pt: PieceType, to: Square) -> Move {
        Move(
            (to.raw() as u32)
                | ((pt as u32) << Self::FROM_SHIFT)
                | Self::DROP_FLAG
                | ((pt as u32) << Self::PIECE_SHIFT),
        )
    }

    /// 移動先
    #[inline]
    pub const fn to(self) -> Square {
        Square::from_u8_unchecked((self.0 & Self::TO_MASK) as u8)
    }

    /// 移動元（駒打ちの場合は None）
    #[inline]
    pub const fn from(self) -> Option<Square> {
        if self.is_drop() {
            None
        } else {
            Some(Square::from_u8_unchecked(((self.0 & Self::FROM_MASK) >> Self::FROM_SHIFT) as u8))
        }
    }

    /// 動かす駒種（成る前）。NONE / NULL では歩を返すので呼び出し側で確認する
    #[inline]
    pub const fn piece_type(self) -> PieceType {
        match PieceType::from_u8(((self.0 >> Self::PIECE_SHIFT) & Self::PIECE_MASK) as u8) {
            Some(pt) => pt,
            None => PieceType::Pawn,
        }
    }

    /// 移動後の駒種（成りなら成駒）
    #[inline]
    pub const fn piece_type_after(self) -> PieceType {
        let pt = self.piece_type();
        if self.is_promote() {
            match pt.promote() {
                Some(p) => p,
                None => pt,
            }
        } else {
            pt
        }
    }

    /// 取る駒種
    #[inline]
    pub const fn captured(self) -> Option<PieceType> {
        PieceType::from_u8(((self.0 >> Self::CAPTURE_SHIFT) & Self::PIECE_MASK) as u8)
    }

    /// 取る駒種を付け替えた指し手
    #[inline]
    pub const fn with_captured(self, captured: Option<PieceType>) -> Move {
        let base = self.0 & Self::IDENTITY_MASK;
        match captured {
            Some(cap) => Move(base | ((cap as u32) << Self::CAPTURE_SHIFT)),
            None => Move(base),
        }
    }

    #[inline]
    pub const fn is_drop(self) -> bool {
        (self.0 & Self::DROP_FLAG) != 0
    }

    #[inline]
    pub const fn is_promote(self) -> bool {
        (self.0 & Self::PROMOTE_FLAG) != 0
    }

    #[inline]
    pub const fn is_capture(self) -> bool {
        self.captured().is_some()
    }

    /// 駒取りまたは成り（静止探索の対象）
    #[inline]
    pub const fn is_tactical(self) -> bool {
        self.is_capture() || self.is_promote()
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 & Self::IDENTITY_MASK == Self::NULL.0
    }

    /// 通常の着手か（NULLでもNONEでもない）
    #[inline]
    pub const fn is_normal(self) -> bool {
        self.0 != 0 && !self.is_null()
    }

    /// History用インデックス（0〜(81+7)*81-1）
    ///
    /// 「from or 打ち駒種」×「to」の組み合わせ。
    #[inline]
    pub const fn history_index(self) -> usize {
        let to = self.to().index();
        let from = if self.is_drop() {
            Square::NUM + (self.piece_type() as usize - 1)
        } else {
            ((self.0 & Self::FROM_MASK) >> Self::FROM_SHIFT) as usize
        };
        from * Square::NUM + to
    }

    /// History用インデックスの総数
    pub const HISTORY_SIZE: usize = (Square::NUM + 7) * Square::NUM;

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Move {
        Move(raw)
    }

    /// USI表記（例: "7g7f", "P*5e", "8h2b+"）
    pub fn to_usi(self) -> String {
        if self.is_none() {
            return "none".to_string();
        }
        if self.is_null() {
            return "null".to_string();
        }
        match self.from() {
            None => format!("{}*{}", self.piece_type().sfen_char(), self.to()),
            Some(from) => {
                let promote = if self.is_promote() { "+" } else { "" };
                format!("{}{}{}", from, self.to(), promote)
            }
        }
    }
}

impl Default for Move {
    fn default() -> Self {
        Move::NONE
    }
}

impl PartialEq for Move {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        (self.0 ^ other.0) & Self::IDENTITY_MASK == 0
    }
}

impl Eq for Move {}

impl std::hash::Hash for Move {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.0 & Self::IDENTITY_MASK).hash(state);
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_usi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_fields() {
        let from = Square::new(6, 6);
        let to = Square::new(6, 5);
        let m = Move::new_move(PieceType::Pawn, from, to, false, None);
        assert_eq!(m.from(), Some(from));
        assert_eq!(m.to(), to);
        assert_eq!(m.piece_type(), PieceType::Pawn);
        assert!(!m.is_drop());
        assert!(!m.is_capture());
        assert_eq!(m.to_usi(), "7g7f");
    }

    #[test]
    fn test_drop_move() {
        let m = Move::new_drop(PieceType::Gold, Square::new(4, 4));
        assert!(m.is_drop());
        assert_eq!(m.from(), None);
        assert_eq!(m.piece_type(), PieceType::Gold);
        assert_eq!(m.to_usi(), "G*5e");
    }

    #[test]
    fn test_equality_ignores_captured() {
        let from = Square::new(7, 7);
        let to = Square::new(1, 1);
        let a = Move::new_move(PieceType::Bishop, from, to, true, Some(PieceType::Bishop));
        let b = Move::new_move(PieceType::Bishop, from, to, true, None);
        assert_eq!(a, b);
        assert_eq!(a.piece_type_after(), PieceType::Horse);
        assert_eq!(b.with_captured(Some(PieceType::Silver)).captured(), Some(PieceType::Silver));
        let c = Move::new_move(PieceType::Bishop, from, to, false, None);
        assert_ne!(a, c);
    }

    #[test]
    fn test_null_and_none() {
        assert!(Move::NULL.is_null());
        assert!(!Move::NULL.is_normal());
        assert!(Move::NONE.is_none());
        assert_ne!(Move::NULL, Move::NONE);
    }

    #[test]
    fn test_history_index_range() {
        let drop = Move::new_drop(PieceType::Rook, Square::SQ_99);
        assert!(drop.history_index() < Move::HISTORY_SIZE);
        let mv = Move::new_move(PieceType::King, Square::SQ_99, Square::new(8, 7), false, None);
        assert!(mv.history_index() < Square::NUM * Square::NUM);
    }
}
