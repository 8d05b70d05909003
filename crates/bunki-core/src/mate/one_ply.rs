//! 1手詰め判定

use crate::bitboard::Bitboard;
use crate::position::{GenType, MoveList, Position};
use crate::types::{Move, PieceType};

/// 手番側に1手詰めがあればその手を返す
///
/// 王手がかかっている局面では判定しない。打ち歩詰めは反則なので返さない。
pub fn mate_1ply(pos: &mut Position) -> Option<Move> {
    if pos.in_check() {
        return None;
    }
    let us = pos.side_to_move();
    let them = !us;
    let ksq = pos.king_square(them)?;
    let tables = pos.shared_tables().clone();
    let occupied = pos.occupied();

    // 駒打ち（歩は打ち歩詰めになるので除く）
    let hand = pos.hand(us);
    for pt in hand.piece_types().filter(|&pt| pt != PieceType::Pawn) {
        let m = tables.movement(us, pt);
        // 玉の位置から相手の駒として利きを引くと、王手になる打ち場所になる
        for to in tables.effect(them, pt, ksq, occupied) & !occupied {
            let mv = Move::new_drop(pt, to);
            if m.can_stand(us, to) && is_mate_by(pos, mv) {
                return Some(mv);
            }
        }
    }

    // 盤上の駒: 直接王手の候補と開き王手の候補だけを調べる
    let mut target = !pos.pieces_c(us);
    target.clear(ksq);
    let mut from_bb = pos.discovered_check_candidates();
    for pt in PieceType::ALL {
        from_bb |= pos.pieces(us, pt) & tables.check_candidates(us, pt, ksq);
    }
    let mut moves = MoveList::new();
    for from in from_bb {
        pos.generate_from(GenType::All, from, target, occupied, &mut moves);
    }
    moves.into_iter().find(|&mv| pos.gives_check(mv) && is_mate_by(pos, mv))
}

fn is_mate_by(pos: &mut Position, mv: Move) -> bool {
    if !pos.do_move(mv) {
        return false;
    }
    let mate = pos.in_check() && is_mated(pos);
    pos.undo_move();
    mate
}

/// mv を指すと相手が詰むか（合法手の有無で確かめる）
pub fn gives_mate(pos: &mut Position, mv: Move) -> bool {
    if !pos.do_move(mv) {
        return false;
    }
    let mate = pos.in_check() && !pos.has_legal_move();
    pos.undo_move();
    mate
}

/// 王手をかけられている手番側に応手がないか
///
/// 玉の逃げ道、王手駒の除去（pin されていない玉以外の駒による）、
/// 飛び駒の王手に対する合駒（移動・駒打ち）を調べる。
pub fn is_mated(pos: &Position) -> bool {
    let def = pos.side_to_move();
    let att = !def;
    let Some(ksq) = pos.king_square(def) else {
        return false;
    };
    let checkers = pos.checkers();
    if checkers.is_empty() {
        return false;
    }
    let t = pos.tables();
    let occupied = pos.occupied();

    // 玉を除いた盤で逃げ先に利きがあるか
    let without_king = occupied.without(ksq);
    for sq in t.king_effect(ksq) & !pos.pieces_c(def) {
        if pos.attackers_to(att, sq, without_king).is_empty() {
            return false;
        }
    }

    // 両王手は玉が動くしかない
    if checkers.more_than_one() {
        return true;
    }
    let Some(checker) = checkers.lsb() else {
        return false;
    };

    let king_bb = Bitboard::from_square(ksq);
    let movable = !(pos.pinned_pieces(def) | king_bb);
    if (pos.attackers_to(def, checker, occupied) & movable).is_not_empty() {
        return false;
    }

    // 合駒
    let between = t.between_bb(ksq, checker);
    if between.is_empty() {
        return true;
    }
    let hand = pos.hand(def);
    for sq in between {
        if (pos.attackers_to(def, sq, occupied) & movable).is_not_empty() {
            return false;
        }
        for pt in hand.piece_types() {
            if !t.movement(def, pt).can_stand(def, sq) {
                continue;
            }
            if pt == PieceType::Pawn
                && (pos.pieces(def, PieceType::Pawn) & Bitboard::file_mask(sq.file())).is_not_empty()
            {
                continue;
            }
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bitboard::AttackTables;
    use crate::mate::reference;

    fn pos(sfen: &str) -> Position {
        Position::from_sfen(sfen, Arc::new(AttackTables::new())).unwrap()
    }

    /// 1手詰めの結果が総当たりの判定と一致すること
    fn assert_agrees(sfen: &str, expect_mate: bool) {
        let mut p = pos(sfen);
        let before = p.key();
        let found = mate_1ply(&mut p);
        assert_eq!(p.key(), before, "局面が戻っていない: {sfen}");
        assert_eq!(found.is_some(), expect_mate, "{sfen}");
        assert_eq!(reference::mate_1ply(&mut p).is_some(), expect_mate, "{sfen}");
        if let Some(mv) = found {
            assert!(reference::is_mate_after(&mut p, mv), "{sfen} {}", mv.to_usi());
        }
    }

    #[test]
    fn test_gold_drop_corner_mate() {
        assert_agrees("8k/9/8P/9/9/9/9/9/K8 b G 1", true);
        let mut p = pos("8k/9/8P/9/9/9/9/9/K8 b G 1");
        assert_eq!(mate_1ply(&mut p).map(|m| m.to_usi()), Some("G*1b".to_string()));
    }

    #[test]
    fn test_pawn_drop_mate_is_not_reported() {
        assert_agrees("7lk/7p1/8G/9/9/9/9/9/K8 b P 1", false);
    }

    #[test]
    fn test_board_move_mate() {
        // 4三金の5二への移動（5三の歩が支える）
        assert_agrees("4k4/9/4PG3/9/9/9/9/9/K8 b - 1", true);
    }

    #[test]
    fn test_interposition_refutes_distant_check() {
        assert_agrees("8k/7pp/9/9/9/9/9/9/K8 b R 1", true);
        // 後手に金があれば合駒できる
        assert_agrees("8k/7pp/9/9/9/9/9/9/K8 b Rg 1", false);
    }

    #[test]
    fn test_no_mate_in_startpos() {
        let mut p = Position::startpos(Arc::new(AttackTables::new()));
        assert!(mate_1ply(&mut p).is_none());
    }

    #[test]
    fn test_is_mated_requires_check() {
        let p = pos("8k/9/8P/9/9/9/9/9/K8 w - 1");
        assert!(!is_mated(&p));
    }
}
