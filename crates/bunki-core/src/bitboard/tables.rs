//! 利き・直線・王手候補テーブル
//!
//! 全て `AttackTables::new()` で一度だけ構築し、`Arc` で局面と探索に共有する。
//! 駒種ごとの分岐は `PieceMovement` 記述子の表引きにまとめてある。

use crate::position::ZobristKeys;
use crate::types::{Color, PieceType, Square};

use super::Bitboard;

/// 8方向（先手から見た向き）
///
/// N は一段目に向かう方向、E は1筋に向かう方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    N = 0,
    S = 1,
    E = 2,
    W = 3,
    NE = 4,
    NW = 5,
    SE = 6,
    SW = 7,
}

impl Direction {
    pub const NUM: usize = 8;

    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::S,
        Direction::E,
        Direction::W,
        Direction::NE,
        Direction::NW,
        Direction::SE,
        Direction::SW,
    ];

    /// (筋, 段) の増分
    #[inline]
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Direction::N => (0, -1),
            Direction::S => (0, 1),
            Direction::E => (-1, 0),
            Direction::W => (1, 0),
            Direction::NE => (-1, -1),
            Direction::NW => (1, -1),
            Direction::SE => (-1, 1),
            Direction::SW => (1, 1),
        }
    }

    /// 逆方向
    #[inline]
    pub const fn reverse(self) -> Direction {
        match self {
            Direction::N => Direction::S,
            Direction::S => Direction::N,
            Direction::E => Direction::W,
            Direction::W => Direction::E,
            Direction::NE => Direction::SW,
            Direction::NW => Direction::SE,
            Direction::SE => Direction::NW,
            Direction::SW => Direction::NE,
        }
    }

    /// 手番から見た向きを盤面の向きに変換（後手は反転）
    #[inline]
    pub const fn relative(self, color: Color) -> Direction {
        match color {
            Color::Black => self,
            Color::White => self.reverse(),
        }
    }

    /// マス番号が増える向きか（直線上の最近接マスが lsb になる）
    #[inline]
    pub const fn is_increasing(self) -> bool {
        let (df, dr) = self.delta();
        df * 9 + dr > 0
    }

    #[inline]
    pub const fn is_diagonal(self) -> bool {
        let (df, dr) = self.delta();
        df != 0 && dr != 0
    }

    #[inline]
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// 駒の動きの記述子（手番 × 駒種ごとに1つ）
#[derive(Clone)]
pub struct PieceMovement {
    /// 1マス分の利き（桂を含む）
    pub steps: [Bitboard; Square::NUM],
    /// 飛び利きの方向集合（`Direction::bit` の論理和）
    pub slides: u8,
    /// 成った後の駒種
    pub promoted: Option<PieceType>,
    /// 成らずに置ける最小の相対段（歩・香は1、桂は2、他は0）
    pub min_relative_rank: u8,
}

impl PieceMovement {
    const fn empty() -> PieceMovement {
        PieceMovement {
            steps: [Bitboard::EMPTY; Square::NUM],
            slides: 0,
            promoted: None,
            min_relative_rank: 0,
        }
    }

    /// このマスに成らずに置けるか（行き所のない駒の禁止）
    #[inline]
    pub const fn can_stand(&self, color: Color, sq: Square) -> bool {
        sq.relative_rank(color) >= self.min_relative_rank
    }

    #[inline]
    pub const fn slides_in(&self, dir: Direction) -> bool {
        self.slides & dir.bit() != 0
    }
}

/// 盤面計算に使うテーブル一式
pub struct AttackTables {
    /// `[color * 15 + piece_type]`
    movement: Vec<PieceMovement>,
    /// `[direction][square]` 盤端までの直線（自マスを含まない）
    rays: [[Bitboard; Square::NUM]; Direction::NUM],
    /// `[sq1 * 81 + sq2]` 2マスの間（両端を含まない）
    between: Vec<Bitboard>,
    /// `[sq1 * 81 + sq2]` sq1 から sq2 への方向（同一直線上にない場合は None）
    direction: Vec<Option<Direction>>,
    /// `[(color * 15 + piece_type) * 81 + king_sq]`
    /// 一手動いて king_sq に王手をかけられる移動元（空盤、成りを含む）
    check_from: Vec<Bitboard>,
    /// 局面ハッシュ用の乱数
    pub zobrist: ZobristKeys,
}

impl AttackTables {
    pub fn new() -> AttackTables {
        let mut rays = [[Bitboard::EMPTY; Square::NUM]; Direction::NUM];
        for dir in Direction::ALL {
            let (df, dr) = dir.delta();
            for sq in Square::all() {
                let mut bb = Bitboard::EMPTY;
                let mut cur = sq.offset(df, dr);
                while let Some(s) = cur {
                    bb.set(s);
                    cur = s.offset(df, dr);
                }
                rays[dir as usize][sq.index()] = bb;
            }
        }

        let mut between = vec![Bitboard::EMPTY; Square::NUM * Square::NUM];
        let mut direction = vec![None; Square::NUM * Square::NUM];
        for from in Square::all() {
            for dir in Direction::ALL {
                let (df, dr) = dir.delta();
                let mut path = Bitboard::EMPTY;
                let mut cur = from.offset(df, dr);
                while let Some(s) = cur {
                    let idx = from.index() * Square::NUM + s.index();
                    between[idx] = path;
                    direction[idx] = Some(dir);
                    path.set(s);
                    cur = s.offset(df, dr);
                }
            }
        }

        let mut movement = vec![PieceMovement::empty(); Color::NUM * PieceType::NUM];
        for color in Color::ALL {
            for pt in PieceType::ALL {
                movement[Self::movement_index(color, pt)] = build_movement(color, pt);
            }
        }

        let mut tables = AttackTables {
            movement,
            rays,
            between,
            direction,
            check_from: Vec::new(),
            zobrist: ZobristKeys::new(),
        };
        tables.check_from = tables.build_check_from();
        tables
    }

    #[inline]
    const fn movement_index(color: Color, pt: PieceType) -> usize {
        color.index() * PieceType::NUM + pt.index()
    }

    /// 駒の動きの記述子
    #[inline]
    pub fn movement(&self, color: Color, pt: PieceType) -> &PieceMovement {
        &self.movement[Self::movement_index(color, pt)]
    }

    /// 盤端までの直線
    #[inline]
    pub fn ray(&self, dir: Direction, sq: Square) -> Bitboard {
        self.rays[dir as usize][sq.index()]
    }

    /// 一方向の飛び利き（最初の遮りマスを含む）
    #[inline]
    pub fn ray_effect(&self, dir: Direction, sq: Square, occupied: Bitboard) -> Bitboard {
        let ray = self.ray(dir, sq);
        let blockers = ray & occupied;
        let nearest = if dir.is_increasing() { blockers.lsb() } else { blockers.msb() };
        match nearest {
            Some(b) => ray ^ self.ray(dir, b),
            None => ray,
        }
    }

    /// 駒の利き
    #[inline]
    pub fn effect(&self, color: Color, pt: PieceType, sq: Square, occupied: Bitboard) -> Bitboard {
        let m = self.movement(color, pt);
        let mut bb = m.steps[sq.index()];
        if m.slides != 0 {
            for dir in Direction::ALL {
                if m.slides_in(dir) {
                    bb |= self.ray_effect(dir, sq, occupied);
                }
            }
        }
        bb
    }

    /// 1マス分の利き（飛び利きを除く）
    #[inline]
    pub fn step_effect(&self, color: Color, pt: PieceType, sq: Square) -> Bitboard {
        self.movement(color, pt).steps[sq.index()]
    }

    #[inline]
    pub fn lance_effect(&self, color: Color, sq: Square, occupied: Bitboard) -> Bitboard {
        self.ray_effect(Direction::N.relative(color), sq, occupied)
    }

    #[inline]
    pub fn bishop_effect(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.ray_effect(Direction::NE, sq, occupied)
            | self.ray_effect(Direction::NW, sq, occupied)
            | self.ray_effect(Direction::SE, sq, occupied)
            | self.ray_effect(Direction::SW, sq, occupied)
    }

    #[inline]
    pub fn rook_effect(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.ray_effect(Direction::N, sq, occupied)
            | self.ray_effect(Direction::S, sq, occupied)
            | self.ray_effect(Direction::E, sq, occupied)
            | self.ray_effect(Direction::W, sq, occupied)
    }

    #[inline]
    pub fn king_effect(&self, sq: Square) -> Bitboard {
        self.step_effect(Color::Black, PieceType::King, sq)
    }

    /// 2マスの間（同一直線上にない場合は空）
    #[inline]
    pub fn between_bb(&self, sq1: Square, sq2: Square) -> Bitboard {
        self.between[sq1.index() * Square::NUM + sq2.index()]
    }

    /// sq1 から見た sq2 の方向
    #[inline]
    pub fn direction_of(&self, sq1: Square, sq2: Square) -> Option<Direction> {
        self.direction[sq1.index() * Square::NUM + sq2.index()]
    }

    /// king_sq に一手で王手をかけられる移動元の候補（空盤基準）
    #[inline]
    pub fn check_candidates(&self, color: Color, pt: PieceType, king_sq: Square) -> Bitboard {
        self.check_from[Self::movement_index(color, pt) * Square::NUM + king_sq.index()]
    }

    fn build_check_from(&self) -> Vec<Bitboard> {
        let mut table = vec![Bitboard::EMPTY; Color::NUM * PieceType::NUM * Square::NUM];
        for color in Color::ALL {
            for pt in PieceType::ALL {
                let base = Self::movement_index(color, pt) * Square::NUM;
                let promoted = self.movement(color, pt).promoted;
                for from in Square::all() {
                    for to in self.effect(color, pt, from, Bitboard::EMPTY) {
                        let mut targets = self.effect(color, pt, to, Bitboard::EMPTY);
                        if let Some(pro) = promoted
                            && (from.is_promotion_zone(color) || to.is_promotion_zone(color))
                        {
                            targets |= self.effect(color, pro, to, Bitboard::EMPTY);
                        }
                        for king_sq in targets {
                            table[base + king_sq.index()].set(from);
                        }
                    }
                }
            }
        }
        table
    }
}

impl Default for AttackTables {
    fn default() -> Self {
        Self::new()
    }
}

/// 駒種ごとの動きを記述子にまとめる
fn build_movement(color: Color, pt: PieceType) -> PieceMovement {
    use Direction::*;

    const GOLD_STEPS: &[Direction] = &[N, NE, NW, E, W, S];
    const SILVER_STEPS: &[Direction] = &[N, NE, NW, SE, SW];
    const KING_STEPS: &[Direction] = &[N, S, E, W, NE, NW, SE, SW];
    const ORTHOGONAL: &[Direction] = &[N, S, E, W];
    const DIAGONAL: &[Direction] = &[NE, NW, SE, SW];

    let (steps, slides, min_rank): (&[Direction], &[Direction], u8) = match pt {
        PieceType::Pawn => (&[N], &[], 1),
        PieceType::Lance => (&[], &[N], 1),
        PieceType::Knight => (&[], &[], 2),
        PieceType::Silver => (SILVER_STEPS, &[], 0),
        PieceType::Bishop => (&[], DIAGONAL, 0),
        PieceType::Rook => (&[], ORTHOGONAL, 0),
        PieceType::King => (KING_STEPS, &[], 0),
        PieceType::Horse => (ORTHOGONAL, DIAGONAL, 0),
        PieceType::Dragon => (DIAGONAL, ORTHOGONAL, 0),
        PieceType::Gold
        | PieceType::ProPawn
        | PieceType::ProLance
        | PieceType::ProKnight
        | PieceType::ProSilver => (GOLD_STEPS, &[], 0),
    };

    let mut m = PieceMovement::empty();
    m.promoted = pt.promote();
    m.min_relative_rank = min_rank;
    for &dir in slides {
        m.slides |= dir.relative(color).bit();
    }
    for sq in Square::all() {
        let mut bb = Bitboard::EMPTY;
        for &dir in steps {
            let (df, dr) = dir.relative(color).delta();
            if let Some(to) = sq.offset(df, dr) {
                bb.set(to);
            }
        }
        if pt == PieceType::Knight {
            let forward = match color {
                Color::Black => -2,
                Color::White => 2,
            };
            for df in [-1, 1] {
                if let Some(to) = sq.offset(df, forward) {
                    bb.set(to);
                }
            }
        }
        m.steps[sq.index()] = bb;
    }
    m
}
