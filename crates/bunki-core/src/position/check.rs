//! 王手・pin・合法性判定

use super::{GenType, MoveList, Position};
use crate::bitboard::Bitboard;
use crate::types::{Color, Move, PieceType};

impl Position {
    /// color 側の玉と相手の飛び駒の間にある唯一の駒（先後を問わない）
    pub fn blockers_for_king(&self, color: Color) -> Bitboard {
        let Some(ksq) = self.king_square(color) else {
            return Bitboard::EMPTY;
        };
        let t = self.tables();
        let them = !color;
        let snipers = (t.bishop_effect(ksq, Bitboard::EMPTY)
            & (self.pieces(them, PieceType::Bishop) | self.pieces(them, PieceType::Horse)))
            | (t.rook_effect(ksq, Bitboard::EMPTY)
                & (self.pieces(them, PieceType::Rook) | self.pieces(them, PieceType::Dragon)))
            | (t.lance_effect(color, ksq, Bitboard::EMPTY) & self.pieces(them, PieceType::Lance));
        let occupied = self.occupied();
        let mut blockers = Bitboard::EMPTY;
        for sniper in snipers {
            let b = t.between_bb(ksq, sniper) & occupied;
            if b.is_not_empty() && !b.more_than_one() {
                blockers |= b;
            }
        }
        blockers
    }

    /// color 側の pin されている駒
    #[inline]
    pub fn pinned_pieces(&self, color: Color) -> Bitboard {
        self.blockers_for_king(color) & self.pieces_c(color)
    }

    /// 手番側が動かすと開き王手になりうる駒
    #[inline]
    pub fn discovered_check_candidates(&self) -> Bitboard {
        let us = self.side_to_move();
        self.blockers_for_king(!us) & self.pieces_c(us)
    }

    /// 指し手が王手になるか（指す前に判定する）
    pub fn gives_check(&self, mv: Move) -> bool {
        let us = self.side_to_move();
        let Some(ksq) = self.king_square(!us) else {
            return false;
        };
        let t = self.tables();
        let to = mv.to();
        let mut occupied = self.occupied();
        if let Some(from) = mv.from() {
            occupied.clear(from);
        }
        occupied.set(to);

        // 直接王手
        if t.effect(us, mv.piece_type_after(), to, occupied).contains(ksq) {
            return true;
        }

        // 開き王手: 玉との直線から外れる移動のみ
        if let Some(from) = mv.from()
            && self.discovered_check_candidates().contains(from)
        {
            return t.direction_of(ksq, from) != t.direction_of(ksq, to);
        }
        false
    }

    /// 疑似合法手か（置換表・キラーの手の検証用の高速判定）
    ///
    /// 自玉の安全と打ち歩詰めは `do_move` で判定する。
    pub fn is_pseudo_legal(&self, mv: Move) -> bool {
        if !mv.is_normal() {
            return false;
        }
        let us = self.side_to_move();
        let to = mv.to();
        let t = self.tables();
        let pt = mv.piece_type();
        let target = self.piece_on(to);

        match mv.from() {
            None => {
                if mv.is_promote() || target.is_some() || !self.hand(us).has(pt) {
                    return false;
                }
                if !t.movement(us, pt).can_stand(us, to) {
                    return false;
                }
                if pt == PieceType::Pawn
                    && (self.pieces(us, PieceType::Pawn) & Bitboard::file_mask(to.file())).is_not_empty()
                {
                    return false;
                }
                true
            }
            Some(from) => {
                let pc = self.piece_on(from);
                if pc.piece_type() != Some(pt) || pc.color() != us {
                    return false;
                }
                if target.is_some() && (target.color() == us || target.piece_type() == Some(PieceType::King)) {
                    return false;
                }
                if !t.effect(us, pt, from, self.occupied()).contains(to) {
                    return false;
                }
                let m = t.movement(us, pt);
                if mv.is_promote() {
                    m.promoted.is_some() && (from.is_promotion_zone(us) || to.is_promotion_zone(us))
                } else {
                    m.can_stand(us, to)
                }
            }
        }
    }

    /// 合法手か（打ち歩詰め・自殺手を含めて厳密に判定する）
    pub fn is_legal(&mut self, mv: Move) -> bool {
        if !self.is_pseudo_legal(mv) {
            return false;
        }
        if self.do_move(mv) {
            self.undo_move();
            true
        } else {
            false
        }
    }

    /// 手番側に合法手が1つでもあるか
    pub fn has_legal_move(&mut self) -> bool {
        let mut moves = MoveList::new();
        self.generate(GenType::All, &mut moves);
        for mv in moves {
            if self.do_move(mv) {
                self.undo_move();
                return true;
            }
        }
        false
    }

    /// 合法手を生成
    pub fn generate_legal(&mut self, out: &mut MoveList) {
        let mut moves = MoveList::new();
        self.generate(GenType::All, &mut moves);
        for mv in moves {
            if self.do_move(mv) {
                self.undo_move();
                out.push(mv);
            }
        }
    }

    /// 王手になる疑似合法手を生成
    pub fn generate_checks(&self, out: &mut MoveList) {
        let mut moves = MoveList::new();
        self.generate(GenType::All, &mut moves);
        out.extend(moves.into_iter().filter(|&mv| self.gives_check(mv)));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bitboard::AttackTables;
    use crate::types::Square;

    fn pos(sfen: &str) -> Position {
        Position::from_sfen(sfen, Arc::new(AttackTables::new())).unwrap()
    }

    #[test]
    fn test_gives_check_direct_and_discovered() {
        // 5九の飛車と5一の玉の間に先手の銀
        let p = pos("4k4/9/9/9/4S4/9/9/9/K3R4 b - 1");
        let straight = p.parse_usi_move("5e5d").unwrap();
        let aside = p.parse_usi_move("5e4d").unwrap();
        assert!(!p.gives_check(straight));
        assert!(p.gives_check(aside));
        assert!(p.discovered_check_candidates().contains(Square::new(4, 4)));

        let p = pos("4k4/9/9/9/9/9/9/9/K8 b G 1");
        assert!(p.gives_check(p.parse_usi_move("G*5b").unwrap()));
        assert!(!p.gives_check(p.parse_usi_move("G*5c").unwrap()));
    }

    #[test]
    fn test_pinned_pieces() {
        // 後手の角が先手の金を5九の玉にピン
        let p = pos("4k4/9/9/9/b8/9/9/3G5/4K4 b - 1");
        assert!(p.pinned_pieces(Color::Black).contains(Square::new(5, 7)));
        assert!(p.pinned_pieces(Color::White).is_empty());
    }

    #[test]
    fn test_pseudo_legal_rejects_nifu_and_dead_square() {
        let p = pos("4k4/9/9/9/9/9/4P4/9/4K4 b PN 1");
        assert!(!p.is_pseudo_legal(Move::new_drop(PieceType::Pawn, Square::new(4, 3))));
        assert!(p.is_pseudo_legal(Move::new_drop(PieceType::Pawn, Square::new(3, 3))));
        assert!(!p.is_pseudo_legal(Move::new_drop(PieceType::Pawn, Square::new(3, 0))));
        assert!(!p.is_pseudo_legal(Move::new_drop(PieceType::Knight, Square::new(3, 1))));
        assert!(p.is_pseudo_legal(Move::new_drop(PieceType::Knight, Square::new(3, 2))));
    }

    #[test]
    fn test_pawn_drop_mate_is_illegal() {
        // 1一玉、2一香・2二歩は自駒、1三の金が1二を守る
        let mut p = pos("7lk/7p1/8G/9/9/9/9/9/K8 b P 1");
        let drop = Move::new_drop(PieceType::Pawn, Square::new(0, 1));
        assert!(p.is_pseudo_legal(drop));
        assert!(!p.is_legal(drop));
        assert!(!p.do_move(drop));

        let mut legal = MoveList::new();
        p.generate_legal(&mut legal);
        assert!(!legal.contains(&drop));
        assert!(!legal.is_empty());
    }

    #[test]
    fn test_pawn_drop_check_with_escape_is_legal() {
        // 2一が空いていて玉が逃げられる
        let mut p = pos("8k/7p1/8G/9/9/9/9/9/K8 b P 1");
        let drop = Move::new_drop(PieceType::Pawn, Square::new(0, 1));
        assert!(p.is_legal(drop));
    }
}
