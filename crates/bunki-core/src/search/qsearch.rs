//! 静止探索
//!
//! 王手されていなければ静的評価を下限として駒を取る手だけを読む。
//! 王手されていればすべての応手を読むが、連続する王手回避の深さに上限を設ける。

use smallvec::SmallVec;

use super::node::PvLine;
use super::pruning::QSEARCH_FUTILITY_MARGIN;
use super::shared::SearchShared;
use super::tree::Tree;
use crate::position::{GenType, MoveList};
use crate::see::See;
use crate::types::{MAX_PLY, Move, Value};

/// 静止探索で王手回避を読む最大手数
pub(crate) const QSEARCH_EVASION_LIMIT: u32 = 8;

pub(crate) fn qsearch(
    tree: &mut Tree,
    shared: &SearchShared,
    qply: u32,
    alpha: Value,
    beta: Value,
) -> Value {
    if tree.poll(shared) {
        tree.node_mut().historical = true;
        return Value::ZERO;
    }
    tree.stats.qnodes += 1;

    let stm = tree.pos.side_to_move();
    let stand_pat = tree.node().eval.value(stm);
    tree.node_mut().pv.clear();
    if tree.ply >= MAX_PLY - 1 {
        tree.node_mut().historical = true;
        return stand_pat;
    }

    if tree.node().in_check {
        return evasions(tree, shared, qply, alpha, beta, stand_pat);
    }

    if stand_pat >= beta {
        return stand_pat;
    }

    if let Some(mv) = tree.probe_mate_1ply(shared) {
        tree.node_mut().set_pv(mv, &[]);
        return Value::mate_in(tree.ply as i32 + 1);
    }

    let evaluator = shared.evaluator.as_ref();
    let see = See::new(evaluator);
    let mut alpha = alpha.max(stand_pat);
    let mut best = stand_pat;

    let mut list = MoveList::new();
    tree.pos.generate(GenType::Captures, &mut list);
    let mut captures: SmallVec<[(Move, i32); 64]> = SmallVec::new();
    for mv in list {
        if stand_pat + evaluator.estimate(&tree.pos, mv) + QSEARCH_FUTILITY_MARGIN <= alpha {
            continue;
        }
        let gain = see.evaluate(&tree.pos, mv, false);
        if gain >= 0 {
            captures.push((mv, gain));
        }
    }
    captures.sort_by(|a, b| b.1.cmp(&a.1));

    for (mv, _) in captures {
        if !tree.make_move(mv, evaluator) {
            continue;
        }
        let value = -qsearch(tree, shared, qply + 1, -beta, -alpha);
        let (historical, child_pv) = child_result(tree);
        tree.unmake_move();
        if tree.interrupted(shared) {
            tree.node_mut().historical = true;
            return Value::ZERO;
        }
        if value > best {
            best = value;
            let node = tree.node_mut();
            node.historical |= historical;
            if value > alpha {
                alpha = value;
                node.set_pv(mv, &child_pv);
                if value >= beta {
                    break;
                }
            }
        }
    }
    best
}

/// 王手されている局面の静止探索
fn evasions(
    tree: &mut Tree,
    shared: &SearchShared,
    qply: u32,
    alpha: Value,
    beta: Value,
    stand_pat: Value,
) -> Value {
    if qply >= QSEARCH_EVASION_LIMIT {
        return stand_pat;
    }
    let evaluator = shared.evaluator.as_ref();
    let see = See::new(evaluator);

    let mut list = MoveList::new();
    tree.pos.generate_legal(&mut list);
    if list.is_empty() {
        return Value::mated_in(tree.ply as i32);
    }
    let mut moves: SmallVec<[(Move, i32); 64]> = list
        .into_iter()
        .map(|mv| {
            let score = if mv.is_capture() { see.evaluate(&tree.pos, mv, true) } else { i32::MIN };
            (mv, score)
        })
        .collect();
    moves.sort_by(|a, b| b.1.cmp(&a.1));

    let mut alpha = alpha;
    let mut best = -Value::INFINITE;
    for (mv, _) in moves {
        if !tree.make_move(mv, evaluator) {
            continue;
        }
        let value = -qsearch(tree, shared, qply + 1, -beta, -alpha);
        let (historical, child_pv) = child_result(tree);
        tree.unmake_move();
        if tree.interrupted(shared) {
            tree.node_mut().historical = true;
            return Value::ZERO;
        }
        if value > best {
            best = value;
            let node = tree.node_mut();
            node.historical |= historical;
            if value > alpha {
                alpha = value;
                node.set_pv(mv, &child_pv);
                if value >= beta {
                    break;
                }
            }
        }
    }
    if best == -Value::INFINITE { Value::mated_in(tree.ply as i32) } else { best }
}

/// 指した直後の子ノードの結果
#[inline]
fn child_result(tree: &Tree) -> (bool, PvLine) {
    let child = &tree.nodes[tree.ply];
    (child.historical, child.pv.clone())
}
