//! 駒種（PieceType）と駒（Piece）

use super::Color;

/// 駒種（先後の区別なし）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PieceType {
    // 生駒
    Pawn = 1,
    Lance = 2,
    Knight = 3,
    Silver = 4,
    Bishop = 5,
    Rook = 6,
    Gold = 7,
    King = 8,
    // 成駒
    ProPawn = 9,
    ProLance = 10,
    ProKnight = 11,
    ProSilver = 12,
    Horse = 13,  // 成角
    Dragon = 14, // 成飛
}

impl PieceType {
    /// 配列サイズ（インデックス 0 は未使用）
    pub const NUM: usize = 15;

    /// 手駒になる駒種の数
    pub const HAND_NUM: usize = 7;

    /// 手駒になる駒種一覧
    pub const HAND_PIECES: [PieceType; 7] = [
        PieceType::Pawn,
        PieceType::Lance,
        PieceType::Knight,
        PieceType::Silver,
        PieceType::Gold,
        PieceType::Bishop,
        PieceType::Rook,
    ];

    /// 全駒種
    pub const ALL: [PieceType; 14] = [
        PieceType::Pawn,
        PieceType::Lance,
        PieceType::Knight,
        PieceType::Silver,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Gold,
        PieceType::King,
        PieceType::ProPawn,
        PieceType::ProLance,
        PieceType::ProKnight,
        PieceType::ProSilver,
        PieceType::Horse,
        PieceType::Dragon,
    ];

    /// 成れるかどうか
    #[inline]
    pub const fn can_promote(self) -> bool {
        (self as u8) <= 6
    }

    /// 成り駒を返す（成れない場合はNone）
    #[inline]
    pub const fn promote(self) -> Option<PieceType> {
        match self {
            PieceType::Pawn => Some(PieceType::ProPawn),
            PieceType::Lance => Some(PieceType::ProLance),
            PieceType::Knight => Some(PieceType::ProKnight),
            PieceType::Silver => Some(PieceType::ProSilver),
            PieceType::Bishop => Some(PieceType::Horse),
            PieceType::Rook => Some(PieceType::Dragon),
            _ => None,
        }
    }

    /// 生駒を返す（既に生駒の場合はそのまま）
    #[inline]
    pub const fn unpromote(self) -> PieceType {
        match self {
            PieceType::ProPawn => PieceType::Pawn,
            PieceType::ProLance => PieceType::Lance,
            PieceType::ProKnight => PieceType::Knight,
            PieceType::ProSilver => PieceType::Silver,
            PieceType::Horse => PieceType::Bishop,
            PieceType::Dragon => PieceType::Rook,
            _ => self,
        }
    }

    /// 成駒かどうか
    #[inline]
    pub const fn is_promoted(self) -> bool {
        self as u8 >= 9
    }

    /// 遠方駒（香角飛馬龍）かどうか
    #[inline]
    pub const fn is_slider(self) -> bool {
        matches!(
            self,
            PieceType::Lance
                | PieceType::Bishop
                | PieceType::Rook
                | PieceType::Horse
                | PieceType::Dragon
        )
    }

    /// 金と同じ動きをする駒か
    #[inline]
    pub const fn moves_like_gold(self) -> bool {
        matches!(
            self,
            PieceType::Gold
                | PieceType::ProPawn
                | PieceType::ProLance
                | PieceType::ProKnight
                | PieceType::ProSilver
        )
    }

    /// インデックス（1-14）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 手駒配列のインデックス（0-6、手駒にならない駒は None）
    #[inline]
    pub const fn hand_index(self) -> Option<usize> {
        match self {
            PieceType::Pawn => Some(0),
            PieceType::Lance => Some(1),
            PieceType::Knight => Some(2),
            PieceType::Silver => Some(3),
            PieceType::Gold => Some(4),
            PieceType::Bishop => Some(5),
            PieceType::Rook => Some(6),
            _ => None,
        }
    }

    /// u8から変換（範囲チェックあり）
    #[inline]
    pub const fn from_u8(n: u8) -> Option<PieceType> {
        match n {
            1 => Some(PieceType::Pawn),
            2 => Some(PieceType::Lance),
            3 => Some(PieceType::Knight),
            4 => Some(PieceType::Silver),
            5 => Some(PieceType::Bishop),
            6 => Some(PieceType::Rook),
            7 => Some(PieceType::Gold),
            8 => Some(PieceType::King),
            9 => Some(PieceType::ProPawn),
            10 => Some(PieceType::ProLance),
            11 => Some(PieceType::ProKnight),
            12 => Some(PieceType::ProSilver),
            13 => Some(PieceType::Horse),
            14 => Some(PieceType::Dragon),
            _ => None,
        }
    }

    /// SFEN文字（先手の大文字、成駒は '+' を含まない基底文字）
    pub const fn sfen_char(self) -> char {
        match self.unpromote() {
            PieceType::Pawn => 'P',
            PieceType::Lance => 'L',
            PieceType::Knight => 'N',
            PieceType::Silver => 'S',
            PieceType::Bishop => 'B',
            PieceType::Rook => 'R',
            PieceType::Gold => 'G',
            _ => 'K',
        }
    }

    /// SFEN文字から生駒を得る（大文字小文字は問わない）
    pub fn from_sfen_char(c: char) -> Option<PieceType> {
        match c.to_ascii_uppercase() {
            'P' => Some(PieceType::Pawn),
            'L' => Some(PieceType::Lance),
            'N' => Some(PieceType::Knight),
            'S' => Some(PieceType::Silver),
            'B' => Some(PieceType::Bishop),
            'R' => Some(PieceType::Rook),
            'G' => Some(PieceType::Gold),
            'K' => Some(PieceType::King),
            _ => None,
        }
    }
}

/// 駒（先後の区別あり）
///
/// 内部表現: `color << 4 | piece_type`、0 は空きマス。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Piece(u8);

impl Piece {
    /// 空きマス
    pub const NONE: Piece = Piece(0);

    /// 配列サイズ
    pub const NUM: usize = 32;

    #[inline]
    pub const fn new(color: Color, pt: PieceType) -> Piece {
        Piece(((color as u8) << 4) | pt as u8)
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// 手番（空きマスでは Black を返すので呼び出し側で確認する）
    #[inline]
    pub const fn color(self) -> Color {
        if self.0 & 0x10 != 0 { Color::White } else { Color::Black }
    }

    /// 駒種（空きマスなら None）
    #[inline]
    pub const fn piece_type(self) -> Option<PieceType> {
        PieceType::from_u8(self.0 & 0x0F)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// SFEN表記（例: "+p"）
    pub fn to_sfen(self) -> String {
        let Some(pt) = self.piece_type() else {
            return String::new();
        };
        let base = pt.sfen_char();
        let c = match self.color() {
            Color::Black => base,
            Color::White => base.to_ascii_lowercase(),
        };
        if pt.is_promoted() { format!("+{c}") } else { c.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote_unpromote() {
        for pt in PieceType::ALL {
            if let Some(p) = pt.promote() {
                assert!(p.is_promoted());
                assert_eq!(p.unpromote(), pt);
                assert_eq!(p as u8, pt as u8 + 8);
            }
        }
        assert_eq!(PieceType::Gold.promote(), None);
        assert_eq!(PieceType::King.promote(), None);
    }

    #[test]
    fn test_piece_pack() {
        let p = Piece::new(Color::White, PieceType::Horse);
        assert_eq!(p.color(), Color::White);
        assert_eq!(p.piece_type(), Some(PieceType::Horse));
        assert_eq!(p.to_sfen(), "+b");
        assert!(Piece::NONE.piece_type().is_none());
    }

    #[test]
    fn test_hand_index_covers_hand_pieces() {
        for (i, pt) in PieceType::HAND_PIECES.iter().enumerate() {
            assert_eq!(pt.hand_index(), Some(i));
        }
        assert_eq!(PieceType::King.hand_index(), None);
    }
}
