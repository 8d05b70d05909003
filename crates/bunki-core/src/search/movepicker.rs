//! 指し手オーダリング（MovePicker）
//!
//! 段階的に指し手を生成し、良さそうな順に1手ずつ返す。
//!
//! - 王手されていないとき: 置換表の手 → 取る手（SEE 順） → キラー →
//!   静かな手（History 順） → 残りの手（歩・角・飛の不成など）
//! - 王手されているとき: すべての合法な応手（取る手を先に）

use smallvec::SmallVec;

use super::history::History;
use crate::position::{GenType, MoveList, Position};
use crate::see::See;
use crate::types::Move;

/// 取る手のスロットに入っている手の加点
const CAPTURE_SLOT_BONUS: i32 = 64;

/// 王手回避で取る手に与える加点
const EVASION_CAPTURE_BONUS: i32 = 1 << 16;

#[derive(Debug, Clone, Copy)]
struct ScoredMove {
    mv: Move,
    score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Hash,
    CapturesInit,
    Captures,
    Killers,
    QuietsInit,
    Quiets,
    MiscInit,
    Misc,
    EvasionsInit,
    Evasions,
    Done,
}

/// 指し手オーダリング
pub(crate) struct MovePicker {
    stage: Stage,
    hash_move: Move,
    killers: [Move; 2],
    killer_index: usize,
    capture_slots: [Move; 2],
    moves: SmallVec<[ScoredMove; 128]>,
    cursor: usize,
    evasion_count: usize,
}

impl MovePicker {
    pub fn new() -> MovePicker {
        MovePicker {
            stage: Stage::Done,
            hash_move: Move::NONE,
            killers: [Move::NONE; 2],
            killer_index: 0,
            capture_slots: [Move::NONE; 2],
            moves: SmallVec::new(),
            cursor: 0,
            evasion_count: 0,
        }
    }

    /// 新しいノードの手を返し始める
    ///
    /// `hash_move` は `is_pseudo_legal` を確認済みのものか NONE。
    pub fn reset(&mut self, hash_move: Move, killers: [Move; 2], capture_slots: [Move; 2], in_check: bool) {
        self.stage = if in_check { Stage::EvasionsInit } else { Stage::Hash };
        self.hash_move = hash_move;
        self.killers = killers;
        self.killer_index = 0;
        self.capture_slots = capture_slots;
        self.moves.clear();
        self.cursor = 0;
        self.evasion_count = 0;
    }

    /// 王手回避の合法手の数（王手されていないときは 0）
    #[inline]
    pub fn evasion_count(&self) -> usize {
        self.evasion_count
    }

    /// 次の手
    ///
    /// 王手回避以外では疑似合法手を返すので、呼び出し側で `do_move` の結果を確認する。
    pub fn next(&mut self, pos: &mut Position, see: &See<'_>, history: &History) -> Option<Move> {
        loop {
            match self.stage {
                Stage::Hash => {
                    self.stage = Stage::CapturesInit;
                    if self.hash_move.is_some() {
                        return Some(with_board_capture(pos, self.hash_move));
                    }
                }
                Stage::CapturesInit => {
                    let slots = self.capture_slots;
                    let board: &Position = pos;
                    self.generate(board, GenType::Captures, |mv| {
                        let bonus = if slots.iter().any(|&s| s.is_some() && s == mv) {
                            CAPTURE_SLOT_BONUS
                        } else {
                            0
                        };
                        see.evaluate(board, mv, false) + bonus
                    });
                    self.stage = Stage::Captures;
                }
                Stage::Captures => {
                    if let Some(mv) = self.pick(self.hash_move, [Move::NONE; 2]) {
                        return Some(mv);
                    }
                    self.stage = Stage::Killers;
                }
                Stage::Killers => {
                    if self.killer_index >= self.killers.len() {
                        self.stage = Stage::QuietsInit;
                        continue;
                    }
                    let mv = self.killers[self.killer_index];
                    self.killer_index += 1;
                    if mv.is_some()
                        && mv != self.hash_move
                        && pos.piece_on(mv.to()).is_none()
                        && pos.is_pseudo_legal(mv)
                    {
                        return Some(mv.with_captured(None));
                    }
                }
                Stage::QuietsInit => {
                    self.generate(pos, GenType::Quiets, |mv| history.goodness(mv) as i32);
                    self.stage = Stage::Quiets;
                }
                Stage::Quiets => {
                    if let Some(mv) = self.pick(self.hash_move, self.killers) {
                        return Some(mv);
                    }
                    self.stage = Stage::MiscInit;
                }
                Stage::MiscInit => {
                    self.generate(pos, GenType::Misc, |mv| history.goodness(mv) as i32);
                    self.stage = Stage::Misc;
                }
                Stage::Misc => {
                    if let Some(mv) = self.pick(self.hash_move, self.killers) {
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }
                Stage::EvasionsInit => {
                    let mut legal = MoveList::new();
                    pos.generate_legal(&mut legal);
                    self.evasion_count = legal.len();
                    self.moves.clear();
                    self.cursor = 0;
                    for mv in legal {
                        let score = if mv.is_capture() {
                            EVASION_CAPTURE_BONUS + see.evaluate(pos, mv, true)
                        } else {
                            history.goodness(mv) as i32
                        };
                        self.moves.push(ScoredMove { mv, score });
                    }
                    self.moves.sort_by(|a, b| b.score.cmp(&a.score));
                    // 置換表の手を先頭へ
                    if let Some(i) = self.moves.iter().position(|s| s.mv == self.hash_move) {
                        let hash = self.moves.remove(i);
                        self.moves.insert(0, hash);
                    }
                    self.stage = Stage::Evasions;
                }
                Stage::Evasions => {
                    if let Some(s) = self.moves.get(self.cursor) {
                        self.cursor += 1;
                        return Some(s.mv);
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return None,
            }
        }
    }

    /// 残りの手をすべて取り出す（分割探索用）
    pub fn drain(&mut self, pos: &mut Position, see: &See<'_>, history: &History) -> Vec<Move> {
        let mut rest = Vec::new();
        while let Some(mv) = self.next(pos, see, history) {
            rest.push(mv);
        }
        rest
    }

    fn generate(&mut self, pos: &Position, kind: GenType, mut score: impl FnMut(Move) -> i32) {
        let mut list = MoveList::new();
        pos.generate(kind, &mut list);
        self.moves.clear();
        self.cursor = 0;
        self.moves.extend(list.into_iter().map(|mv| ScoredMove { mv, score: score(mv) }));
        self.moves.sort_by(|a, b| b.score.cmp(&a.score));
    }

    fn pick(&mut self, hash_move: Move, skip: [Move; 2]) -> Option<Move> {
        while let Some(s) = self.moves.get(self.cursor) {
            self.cursor += 1;
            if s.mv != hash_move && !skip.contains(&s.mv) {
                return Some(s.mv);
            }
        }
        None
    }
}

/// 盤上の駒に合わせて取った駒種を付け直す
#[inline]
fn with_board_capture(pos: &Position, mv: Move) -> Move {
    if mv.is_drop() {
        mv
    } else {
        mv.with_captured(pos.piece_on(mv.to()).piece_type())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::bitboard::AttackTables;
    use crate::eval::MaterialEvaluator;

    fn pos(sfen: &str) -> Position {
        Position::from_sfen(sfen, Arc::new(AttackTables::new())).unwrap()
    }

    fn collect(p: &mut Position, hash: Move, killers: [Move; 2], in_check: bool) -> Vec<Move> {
        let eval = MaterialEvaluator::new();
        let see = See::new(&eval);
        let history = History::new();
        let mut picker = MovePicker::new();
        picker.reset(hash, killers, [Move::NONE; 2], in_check);
        picker.drain(p, &see, &history)
    }

    #[test]
    fn test_every_move_once() {
        let mut p = pos("ln1gkg1nl/1r1s3b1/p1pppp1pp/1p4p2/9/2P1P4/PP1P1PPPP/1B5R1/LN1GKGSNL b Ss 1");
        let hash = p.parse_usi_move("2g2f").unwrap();
        assert!(p.is_pseudo_legal(hash));
        let killer = p.parse_usi_move("S*5e").unwrap();
        let picked = collect(&mut p, hash, [killer, Move::NONE], false);

        let mut all = MoveList::new();
        p.generate(GenType::All, &mut all);
        assert_eq!(picked.len(), all.len());
        let unique: HashSet<Move> = picked.iter().copied().collect();
        assert_eq!(unique.len(), picked.len());
        assert_eq!(picked[0], hash);
    }

    #[test]
    fn test_captures_before_quiets() {
        let mut p = pos("4k4/9/4p4/9/4R4/9/9/9/4K4 b - 1");
        let picked = collect(&mut p, Move::NONE, [Move::NONE; 2], false);
        // 5e5c と 5e5c+ の2手
        assert!(picked[..2].iter().all(|m| m.is_capture()));
        assert!(picked[..2].contains(&p.parse_usi_move("5e5c").unwrap()));
        assert!(picked[2..].iter().all(|m| !m.is_capture()));
    }

    #[test]
    fn test_killer_after_captures() {
        let mut p = pos("4k4/9/4p4/9/4R4/9/9/9/4K4 b - 1");
        let killer = p.parse_usi_move("5i4h").unwrap();
        let picked = collect(&mut p, Move::NONE, [killer, Move::NONE], false);
        assert_eq!(picked[2], killer);
        assert_eq!(picked.iter().filter(|&&m| m == killer).count(), 1);
    }

    #[test]
    fn test_illegal_killer_is_skipped() {
        let mut p = pos("4k4/9/4p4/9/4R4/9/9/9/4K4 b - 1");
        let killer = Move::new_drop(crate::types::PieceType::Gold, crate::types::Square::new(0, 0));
        let picked = collect(&mut p, Move::NONE, [killer, Move::NONE], false);
        assert!(!picked.contains(&killer));
    }

    #[test]
    fn test_evasions_are_legal() {
        let mut p = pos("4k4/9/9/9/9/9/9/4r4/4K4 b - 1");
        let picked = collect(&mut p, Move::NONE, [Move::NONE; 2], true);
        let mut legal = MoveList::new();
        p.generate_legal(&mut legal);
        assert_eq!(picked.len(), legal.len());
        // 王手している飛車を取る手が先頭
        assert!(picked[0].is_capture());
    }
}
