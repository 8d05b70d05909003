//! 静的駒交換評価（SEE）
//!
//! 移動先のマスに利いている双方の駒を8方向と桂の4マスから集め、
//! 取り合いの駒得を双方最善の手順で求める。各手番はいつでも取り合いを
//! やめられる。同じ直線上で手前の駒が動くまで利かない駒（x-ray）は
//! `depends_on` で手前の駒を参照する。
//!
//! pin と取り合い途中の成りは考慮しない。

use smallvec::SmallVec;

use crate::bitboard::Direction;
use crate::eval::Evaluator;
use crate::position::Position;
use crate::types::{Color, Move, Piece, PieceType, Square};

/// 取り合いに参加する駒
#[derive(Debug, Clone, Copy)]
struct Attacker {
    color: Color,
    /// 取られたときに相手が得る駒得
    value: i32,
    /// 手前で先に動く必要のある駒（`Exchange::attackers` の添字）
    depends_on: Option<u8>,
}

/// 1マスでの取り合い
#[derive(Debug, Default)]
struct Exchange {
    attackers: SmallVec<[Attacker; 32]>,
    /// 手番ごとの添字（価値の昇順）
    order: [SmallVec<[u8; 16]>; Color::NUM],
    /// 後ろに利きを通す駒の集合
    fronts: u64,
}

impl Exchange {
    fn push(&mut self, attacker: Attacker) -> u8 {
        let idx = self.attackers.len() as u8;
        self.attackers.push(attacker);
        idx
    }

    fn sort(&mut self) {
        for color in Color::ALL {
            let mut order: SmallVec<[u8; 16]> = (0..self.attackers.len() as u8)
                .filter(|&i| self.attackers[i as usize].color == color)
                .collect();
            order.sort_by_key(|&i| self.attackers[i as usize].value);
            self.order[color.index()] = order;
        }
        self.fronts = self
            .attackers
            .iter()
            .filter_map(|a| a.depends_on)
            .fold(0, |mask, d| mask | (1 << d));
    }

    fn available(&self, i: u8, used: u64) -> bool {
        used & (1 << i) == 0
            && self.attackers[i as usize].depends_on.is_none_or(|d| used & (1 << d) != 0)
    }

    /// side が価値 target の駒を取れるときの side の最善の駒得（0 以上）
    ///
    /// 後ろの駒を通さない駒は最も安いものだけを試す。後ろに利きを通す駒は
    /// 高くても先に動かす方が得なことがあるのですべて試す。
    fn resolve(&self, side: Color, target: i32, used: u64) -> i32 {
        let mut best = 0;
        let mut plain_tried = false;
        for &i in &self.order[side.index()] {
            if !self.available(i, used) {
                continue;
            }
            if self.fronts & (1 << i) == 0 {
                if plain_tried {
                    continue;
                }
                plain_tried = true;
            }
            let next = self.attackers[i as usize].value;
            best = best.max(target - self.resolve(!side, next, used | (1 << i)));
        }
        best
    }
}

/// SEE 計算器
pub struct See<'a> {
    evaluator: &'a dyn Evaluator,
}

impl<'a> See<'a> {
    pub fn new(evaluator: &'a dyn Evaluator) -> See<'a> {
        See { evaluator }
    }

    /// 手番側が mv を指したときの取り合いの駒得
    ///
    /// `shallow` では各方向の最も近い駒だけを数える（x-ray を省く）。
    pub fn evaluate(&self, pos: &Position, mv: Move, shallow: bool) -> i32 {
        let us = pos.side_to_move();
        let captured = mv.captured().map_or(0, |pt| self.evaluator.exchange_value(pt));
        let exchange = self.collect(pos, mv.to(), mv.from(), shallow);
        let on_square = self.evaluator.exchange_value(mv.piece_type_after());
        captured - exchange.resolve(!us, on_square, 0)
    }

    fn collect(&self, pos: &Position, to: Square, from: Option<Square>, shallow: bool) -> Exchange {
        let t = pos.tables();
        let mut exchange = Exchange::default();

        for dir in Direction::ALL {
            let (df, dr) = dir.delta();
            let toward = dir.reverse();
            let mut prev = None;
            let mut distance = 0;
            let mut cur = to;
            while let Some(sq) = cur.offset(df, dr) {
                cur = sq;
                distance += 1;
                // 動かす駒の元のマスは空いているものとして扱う
                if Some(sq) == from {
                    continue;
                }
                let pc = pos.piece_on(sq);
                let Some(pt) = pc.piece_type() else {
                    continue;
                };
                let m = t.movement(pc.color(), pt);
                let attacks = m.slides_in(toward) || (distance == 1 && m.steps[sq.index()].contains(to));
                if !attacks {
                    break;
                }
                let idx = exchange.push(Attacker {
                    color: pc.color(),
                    value: self.evaluator.exchange_value(pt),
                    depends_on: prev,
                });
                prev = Some(idx);
                if shallow {
                    break;
                }
            }
        }

        for color in Color::ALL {
            let knight = Piece::new(color, PieceType::Knight);
            for sq in t.step_effect(!color, PieceType::Knight, to) {
                if Some(sq) != from && pos.piece_on(sq) == knight {
                    exchange.push(Attacker {
                        color,
                        value: self.evaluator.exchange_value(PieceType::Knight),
                        depends_on: None,
                    });
                }
            }
        }

        exchange.sort();
        exchange
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::bitboard::AttackTables;
    use crate::eval::MaterialEvaluator;

    fn see(sfen: &str, usi: &str, shallow: bool) -> i32 {
        let pos = Position::from_sfen(sfen, Arc::new(AttackTables::new())).unwrap();
        let mv = pos.parse_usi_move(usi).unwrap();
        See::new(&MaterialEvaluator::new()).evaluate(&pos, mv, shallow)
    }

    fn value(pt: PieceType) -> i32 {
        MaterialEvaluator::new().exchange_value(pt)
    }

    #[test]
    fn test_undefended_capture() {
        assert_eq!(see("4k4/9/4p4/9/4R4/9/9/9/4K4 b - 1", "5e5c", false), value(PieceType::Pawn));
    }

    #[test]
    fn test_defended_capture_loses_rook() {
        let v = see("4k4/4g4/4p4/9/4R4/9/9/9/4K4 b - 1", "5e5c", false);
        assert_eq!(v, value(PieceType::Pawn) - value(PieceType::Rook));
    }

    #[test]
    fn test_piece_behind_mover_joins_exchange() {
        // 5七の香は5五の飛車が動いた後に5三へ利く
        let v = see("4k4/4g4/4p4/9/4R4/9/4L4/9/4K4 b - 1", "5e5c", false);
        let expected =
            value(PieceType::Pawn) - (value(PieceType::Rook) - value(PieceType::Gold));
        assert_eq!(v, expected);
    }

    #[test]
    fn test_xray_dependency_and_shallow_mode() {
        // 5五の飛車は5四の香が動くまで利かない
        let sfen = "4k4/3sg4/4p4/4LS3/4R4/9/9/9/4K4 b - 1";
        let full = see(sfen, "4d5c", false);
        let shallow = see(sfen, "4d5c", true);
        assert_eq!(full, value(PieceType::Pawn));
        assert_eq!(
            shallow,
            value(PieceType::Pawn)
                - (value(PieceType::Silver) - (value(PieceType::Silver) - value(PieceType::Lance)))
        );
        assert!(shallow < full);
    }

    #[test]
    fn test_knight_attackers() {
        // 後手の桂（6一）が5三を守る
        let v = see("3nk4/9/4p4/9/4R4/9/9/9/4K4 b - 1", "5e5c", false);
        assert_eq!(v, value(PieceType::Pawn) - value(PieceType::Rook));
    }

    /// 取る順序をすべて試す素朴な取り合い（手前の駒が動くまで後ろの駒は使えない）
    fn brute_force(attackers: &[Attacker], side: Color, target: i32, used: u64) -> i32 {
        let mut best = 0;
        for (i, a) in attackers.iter().enumerate() {
            if a.color != side || used & (1 << i) != 0 {
                continue;
            }
            if a.depends_on.is_some_and(|d| used & (1 << d) == 0) {
                continue;
            }
            let gain = target - brute_force(attackers, !side, a.value, used | (1 << i));
            best = best.max(gain);
        }
        best
    }

    fn exchange_of(attackers: &[Attacker]) -> Exchange {
        let mut exchange = Exchange::default();
        for &a in attackers {
            exchange.push(a);
        }
        exchange.sort();
        exchange
    }

    /// 直線ごとの駒の並び（手前から）を依存関係つきの駒列にする
    fn attackers_of(rays: &[Vec<(bool, i32)>]) -> Vec<Attacker> {
        let mut attackers = Vec::new();
        for ray in rays {
            let mut prev = None;
            for &(black, value) in ray {
                let color = if black { Color::Black } else { Color::White };
                attackers.push(Attacker { color, value, depends_on: prev });
                prev = Some(attackers.len() as u8 - 1);
            }
        }
        attackers
    }

    fn piece_values() -> impl Strategy<Value = i32> {
        prop::sample::select(vec![186, 482, 538, 770, 924, 1194, 1350])
    }

    #[test]
    fn test_back_piece_waits_for_front_piece() {
        // 先手は金(924)の後ろに香(538)。安い香から先には取れない
        let attackers = attackers_of(&[vec![(true, 924), (true, 538)], vec![(false, 186)]]);
        let expected = 1350 - (924 - 186);
        assert_eq!(brute_force(&attackers, Color::Black, 1350, 0), expected);
        assert_eq!(exchange_of(&attackers).resolve(Color::Black, 1350, 0), expected);
    }

    #[test]
    fn test_cheap_front_piece_is_held_back() {
        // 先手の銀(770)が動くと後ろの後手の駒(482)が利く。金(924)で取れば取り返されない
        let attackers =
            attackers_of(&[vec![(true, 770), (false, 482), (true, 924)], vec![(true, 924)]]);
        assert_eq!(brute_force(&attackers, Color::Black, 924, 0), 924);
        assert_eq!(exchange_of(&attackers).resolve(Color::Black, 924, 0), 924);
    }

    proptest! {
        #[test]
        fn prop_resolve_matches_brute_force(
            black in proptest::collection::vec(piece_values(), 0..5),
            white in proptest::collection::vec(piece_values(), 0..5),
            target in prop::sample::select(vec![186, 482, 770, 924, 1350]),
        ) {
            let attackers: Vec<Attacker> = black
                .iter()
                .map(|&value| Attacker { color: Color::Black, value, depends_on: None })
                .chain(white.iter().map(|&value| Attacker { color: Color::White, value, depends_on: None }))
                .collect();
            let exchange = exchange_of(&attackers);
            prop_assert_eq!(
                exchange.resolve(Color::Black, target, 0),
                brute_force(&attackers, Color::Black, target, 0)
            );
        }

        #[test]
        fn prop_resolve_honors_xray_chains(
            rays in proptest::collection::vec(
                proptest::collection::vec((any::<bool>(), piece_values()), 1..4), 0..4),
            target in prop::sample::select(vec![186, 482, 770, 924, 1350]),
            side_black in any::<bool>(),
        ) {
            let attackers = attackers_of(&rays);
            let exchange = exchange_of(&attackers);
            let side = if side_black { Color::Black } else { Color::White };
            prop_assert_eq!(
                exchange.resolve(side, target, 0),
                brute_force(&attackers, side, target, 0)
            );
        }
    }
}
