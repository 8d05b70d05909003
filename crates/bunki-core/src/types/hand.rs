//! 手駒（Hand）

use super::PieceType;

/// 手駒（32bit packed）
///
/// ビット配置:
/// - bit 0-4:   歩 (5bit, 最大18枚)
/// - bit 6-8:   香 (3bit, 最大4枚)
/// - bit 10-12: 桂 (3bit, 最大4枚)
/// - bit 14-16: 銀 (3bit, 最大4枚)
/// - bit 18-20: 金 (3bit, 最大4枚)
/// - bit 22-23: 角 (2bit, 最大2枚)
/// - bit 25-26: 飛 (2bit, 最大2枚)
///
/// 各フィールドの直上に1bitの空きを置き、減算による借りを優劣判定に使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Hand(u32);

/// `PieceType::hand_index` 順のシフト量
const SHIFTS: [u32; 7] = [0, 6, 10, 14, 18, 22, 25];
/// `PieceType::hand_index` 順のマスク
const MASKS: [u32; 7] = [0x1F, 0x07, 0x07, 0x07, 0x07, 0x03, 0x03];
/// `PieceType::hand_index` 順の最大枚数
const MAX_COUNTS: [u32; 7] = [18, 4, 4, 4, 4, 2, 2];
/// 借り検出用ビット（各フィールドの上の空きビット）
const BORROW_MASK: u32 = (1 << 5) | (1 << 9) | (1 << 13) | (1 << 17) | (1 << 21) | (1 << 24) | (1 << 27);

impl Hand {
    /// 空の手駒
    pub const EMPTY: Hand = Hand(0);

    /// 指定駒種を持てる最大枚数（手駒にならない駒は 0）
    #[inline]
    pub const fn max_count(pt: PieceType) -> u32 {
        match pt.hand_index() {
            Some(i) => MAX_COUNTS[i],
            None => 0,
        }
    }

    /// 指定駒種の枚数を取得
    #[inline]
    pub const fn count(self, pt: PieceType) -> u32 {
        match pt.hand_index() {
            Some(i) => (self.0 >> SHIFTS[i]) & MASKS[i],
            None => 0,
        }
    }

    /// 指定駒種を持っているか
    #[inline]
    pub const fn has(self, pt: PieceType) -> bool {
        self.count(pt) > 0
    }

    /// 1枚追加
    #[inline]
    pub const fn add(self, pt: PieceType) -> Hand {
        match pt.hand_index() {
            Some(i) => Hand(self.0 + (1 << SHIFTS[i])),
            None => self,
        }
    }

    /// 1枚減らす
    #[inline]
    pub const fn sub(self, pt: PieceType) -> Hand {
        debug_assert!(self.has(pt));
        match pt.hand_index() {
            Some(i) => Hand(self.0 - (1 << SHIFTS[i])),
            None => self,
        }
    }

    /// 指定枚数をセット
    #[inline]
    pub const fn set(self, pt: PieceType, count: u32) -> Hand {
        match pt.hand_index() {
            Some(i) => {
                let (shift, mask) = (SHIFTS[i], MASKS[i]);
                Hand((self.0 & !(mask << shift)) | ((count & mask) << shift))
            }
            None => self,
        }
    }

    /// 優等局面判定: self >= other（全ての駒種で自分以上）
    #[inline]
    pub const fn is_superior_or_equal(self, other: Hand) -> bool {
        self.0.wrapping_sub(other.0) & BORROW_MASK == 0
    }

    /// 空かどうか
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 歩以外の駒を持っているか
    #[inline]
    pub const fn has_except_pawn(self) -> bool {
        self.0 & !MASKS[0] != 0
    }

    /// 持っている駒種を列挙
    pub fn piece_types(self) -> impl Iterator<Item = PieceType> {
        PieceType::HAND_PIECES.into_iter().filter(move |&pt| self.has(pt))
    }

    /// 内部値を取得
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// 内部値から生成
    #[inline]
    pub const fn from_raw(raw: u32) -> Hand {
        Hand(raw)
    }
}
