//! 指し手生成
//!
//! 駒ごとの動きは `AttackTables` の記述子から引くので、駒種ごとの分岐はない。
//! 生成するのは疑似合法手（自玉の安全と打ち歩詰めは `do_move` で判定）。

use smallvec::SmallVec;

use super::Position;
use crate::bitboard::Bitboard;
use crate::types::{Color, Move, PieceType, Square};

/// 指し手リスト
pub type MoveList = SmallVec<[Move; 128]>;

/// 生成する指し手の種類
///
/// `Captures`・`Quiets`・`Misc` は互いに素で、和は `All` に一致する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenType {
    /// 駒を取る手と、歩・角・飛の駒を取らない成り
    Captures,
    /// 残りの手（駒打ちを含む）
    Quiets,
    /// 歩・角・飛の不成と、香の二段目への不成（通常は指す価値が低い）
    Misc,
    /// すべて
    All,
}

impl GenType {
    #[inline]
    fn accepts(self, class: GenType) -> bool {
        self == GenType::All || self == class
    }
}

/// 成って損のない駒
#[inline]
const fn always_promote(pt: PieceType) -> bool {
    matches!(pt, PieceType::Pawn | PieceType::Bishop | PieceType::Rook)
}

fn classify(us: Color, pt: PieceType, to: Square, promote: bool, can_promote: bool, capture: bool) -> GenType {
    if capture || (promote && always_promote(pt)) {
        GenType::Captures
    } else if !promote
        && can_promote
        && (always_promote(pt) || (pt == PieceType::Lance && to.relative_rank(us) == 1))
    {
        GenType::Misc
    } else {
        GenType::Quiets
    }
}

impl Position {
    /// 疑似合法手を生成して `out` に追加する
    pub fn generate(&self, kind: GenType, out: &mut MoveList) {
        let us = self.side_to_move();
        let occupied = self.occupied();

        let mut target = !self.pieces_c(us);
        if let Some(ksq) = self.king_square(!us) {
            target.clear(ksq);
        }

        for from in self.pieces_c(us) {
            self.generate_from(kind, from, target, occupied, out);
        }

        if kind.accepts(GenType::Quiets) {
            self.generate_drops(out);
        }
    }

    /// from の駒の target への移動を生成する
    pub(crate) fn generate_from(
        &self,
        kind: GenType,
        from: Square,
        target: Bitboard,
        occupied: Bitboard,
        out: &mut MoveList,
    ) {
        let us = self.side_to_move();
        let Some(pt) = self.piece_on(from).piece_type() else {
            return;
        };
        let m = self.tables().movement(us, pt);
        for to in self.tables().effect(us, pt, from, occupied) & target {
            let captured = self.piece_on(to).piece_type();
            let can_promote =
                m.promoted.is_some() && (from.is_promotion_zone(us) || to.is_promotion_zone(us));
            if can_promote && kind.accepts(classify(us, pt, to, true, true, captured.is_some())) {
                out.push(Move::new_move(pt, from, to, true, captured));
            }
            if m.can_stand(us, to)
                && kind.accepts(classify(us, pt, to, false, can_promote, captured.is_some()))
            {
                out.push(Move::new_move(pt, from, to, false, captured));
            }
        }
    }

    fn generate_drops(&self, out: &mut MoveList) {
        let us = self.side_to_move();
        let hand = self.hand(us);
        if hand.is_empty() {
            return;
        }
        let t = self.tables();
        let empty = !self.occupied();

        for pt in hand.piece_types() {
            let m = t.movement(us, pt);
            let mut targets = empty;
            if pt == PieceType::Pawn {
                for sq in self.pieces(us, PieceType::Pawn) {
                    targets &= !Bitboard::file_mask(sq.file());
                }
            }
            for to in targets {
                if m.can_stand(us, to) {
                    out.push(Move::new_drop(pt, to));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bitboard::AttackTables;

    fn pos(sfen: &str) -> Position {
        Position::from_sfen(sfen, Arc::new(AttackTables::new())).unwrap()
    }

    fn count(p: &Position, kind: GenType) -> usize {
        let mut list = MoveList::new();
        p.generate(kind, &mut list);
        list.len()
    }

    #[test]
    fn test_startpos_has_30_moves() {
        let mut p = Position::startpos(Arc::new(AttackTables::new()));
        assert_eq!(count(&p, GenType::All), 30);
        let mut legal = MoveList::new();
        p.generate_legal(&mut legal);
        assert_eq!(legal.len(), 30);
        assert_eq!(count(&p, GenType::Captures), 0);
    }

    #[test]
    fn test_gen_types_partition_all() {
        let p = pos("l+R5nl/4gk3/p1n1pp1pp/2pp2p2/1p5P1/2P3P2/PPSPPP2P/2G6/LN1GK2NL b BG2Pb2s 41");
        let all = count(&p, GenType::All);
        let sum = count(&p, GenType::Captures) + count(&p, GenType::Quiets) + count(&p, GenType::Misc);
        assert_eq!(all, sum);
    }

    #[test]
    fn test_pawn_promotion_classes() {
        // 5四の歩は5三へ成・不成の両方が可能
        let p = pos("4k4/9/9/4P4/9/9/9/9/4K4 b - 1");
        let mut caps = MoveList::new();
        p.generate(GenType::Captures, &mut caps);
        let mut misc = MoveList::new();
        p.generate(GenType::Misc, &mut misc);
        assert_eq!(caps.len(), 1);
        assert!(caps[0].is_promote());
        assert_eq!(misc.len(), 1);
        assert!(!misc[0].is_promote());
    }

    #[test]
    fn test_drops_skip_nifu_and_dead_squares() {
        let p = pos("4k4/9/9/9/9/9/4P4/9/4K4 b P 1");
        let mut list = MoveList::new();
        p.generate(GenType::Quiets, &mut list);
        let drops: Vec<_> = list.iter().filter(|m| m.is_drop()).collect();
        // 8筋分 × 一段目以外の空きマス
        assert!(drops.iter().all(|m| m.to().file() != 4 && m.to().rank() != 0));
        let expected: usize = (0..9u8)
            .filter(|&f| f != 4)
            .map(|f| (1..9u8).filter(|&r| p.piece_on(Square::new(f, r)).is_none()).count())
            .sum();
        assert_eq!(drops.len(), expected);
    }

    #[test]
    fn test_captures_record_captured_piece() {
        let p = pos("4k4/9/9/4p4/4R4/9/9/9/4K4 b - 1");
        let mut list = MoveList::new();
        p.generate(GenType::Captures, &mut list);
        let cap = list.iter().find(|m| m.is_capture()).unwrap();
        assert_eq!(cap.captured(), Some(PieceType::Pawn));
        // 敵玉を取る手は生成しない
        assert!(list.iter().all(|m| m.to() != p.king_square(Color::White).unwrap()));
    }

    #[test]
    fn test_legal_moves_in_check_are_evasions() {
        let mut p = pos("4k4/9/9/9/9/9/9/4r4/4K4 b - 1");
        assert!(p.in_check());
        let mut legal = MoveList::new();
        p.generate_legal(&mut legal);
        // 5八の飛車を取る手と、左右への逃げ（5八の利きの外）のみ
        for mv in &legal {
            assert!(p.do_move(*mv));
            p.undo_move();
        }
        assert!(legal.iter().any(|m| m.is_capture()));
        assert!(legal.len() >= 3);
    }
}
