//! 3手詰め判定

use super::one_ply::mate_1ply;
use crate::position::{MoveList, Position};
use crate::types::Move;

/// 手番側に3手以内の詰みがあれば初手を返す
///
/// 王手だけを調べ、相手のすべての合法な応手に1手詰めが続くことを確かめる。
/// 王手を返す応手があれば詰みとはみなさない。1手詰めがあればそれを優先する。
pub fn mate_3ply(pos: &mut Position) -> Option<Move> {
    if pos.in_check() {
        return None;
    }
    if let Some(mv) = mate_1ply(pos) {
        return Some(mv);
    }
    let mut checks = MoveList::new();
    pos.generate_checks(&mut checks);
    checks.into_iter().find(|&mv| {
        if !pos.do_move(mv) {
            return false;
        }
        let mate = every_evasion_mated(pos);
        pos.undo_move();
        mate
    })
}

fn every_evasion_mated(pos: &mut Position) -> bool {
    let mut evasions = MoveList::new();
    pos.generate_legal(&mut evasions);
    for ev in evasions {
        if !pos.do_move(ev) {
            continue;
        }
        let mated = !pos.in_check() && mate_1ply(pos).is_some();
        pos.undo_move();
        if !mated {
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

    /// 総当たりの3手詰め判定（王手返しは不詰みとする）
    fn reference_mate_3ply(p: &mut Position) -> bool {
        if p.in_check() {
            return false;
        }
        let mut moves = MoveList::new();
        p.generate_legal(&mut moves);
        for mv in moves {
            assert!(p.do_move(mv));
            let mut all = p.in_check();
            if all {
                let mut replies = MoveList::new();
                p.generate_legal(&mut replies);
                for r in replies {
                    assert!(p.do_move(r));
                    let ok = !p.in_check() && reference::mate_1ply(p).is_some();
                    p.undo_move();
                    if !ok {
                        all = false;
                        break;
                    }
                }
            }
            p.undo_move();
            if all {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_mate_in_one_is_found() {
        let mut p = pos("8k/9/8P/9/9/9/9/9/K8 b G 1");
        let mv = mate_3ply(&mut p).unwrap();
        assert!(p.gives_check(mv));
        assert!(crate::mate::gives_mate(&mut p, mv));
    }

    #[test]
    fn test_agrees_with_exhaustive_search() {
        for sfen in [
            "8k/9/9/9/9/9/9/9/K8 b 2G 1",
            "8k/9/8p/8L/9/9/9/9/K8 b 2G 1",
            "7nk/9/7P1/9/9/9/9/9/K8 b GS 1",
            "8k/7pp/9/9/9/9/9/9/K8 b Rg 1",
        ] {
            let mut p = pos(sfen);
            let before = p.key();
            let found = mate_3ply(&mut p);
            assert_eq!(p.key(), before);
            assert_eq!(found.is_some(), reference_mate_3ply(&mut p), "{sfen}");
        }
    }

    #[test]
    fn test_no_mate_in_startpos() {
        let mut p = Position::startpos(Arc::new(AttackTables::new()));
        assert!(mate_3ply(&mut p).is_none());
    }
}
