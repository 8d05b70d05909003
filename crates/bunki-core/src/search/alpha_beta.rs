//! 通常探索（PVS）
//!
//! 1ノードの処理順:
//! 中断確認 → SHEK → 最大手数 → 静止探索への移行 → 置換表 → 詰み判定 →
//! razoring → null move → 多重反復深化（IID） → singular 確認 → 指し手ループ。
//! 指し手ループは途中で分割点を作って協力者と分け合うことがある。

use std::sync::Arc;

use smallvec::SmallVec;

use super::node::PvLine;
use super::pruning::{
    FUTILITY_DEPTH, IID_MIN_DEPTH, IID_REDUCTION, LMR_MIN_MOVES, NULL_MIN_DEPTH, RAZOR_DEPTH,
    SEE_PRUNE_DEPTH, SINGULAR_MIN_DEPTH, futility_margin, lmr_reduction, move_count_limit,
    null_reduction, razor_margin, singular_margin,
};
use super::qsearch::qsearch;
use super::shared::SearchShared;
use super::tlp::SplitPoint;
use super::tree::Tree;
use super::worker;
use crate::see::See;
use crate::types::{Depth, MAX_PLY, Move, ONE_PLY, Square, Value, plies};

/// 除外手つき探索で置換表のキーをずらす
const EXCLUDED_KEY_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// ノードの探索条件
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeStat {
    pub allow_null: bool,
}

impl Default for NodeStat {
    fn default() -> NodeStat {
        NodeStat { allow_null: true }
    }
}

/// 指し手ループで各手を探索するときの共通条件
///
/// 分割点でも同じものを使うので、協力者はここから枝刈りと延長を判断する。
#[derive(Debug, Clone, Copy)]
pub(crate) struct MoveContext {
    pub depth: Depth,
    pub beta: Value,
    pub in_check: bool,
    /// 手番側から見た静的評価
    pub stand_pat: Value,
    pub hash_move: Move,
    /// 置換表の手が singular と確認できた
    pub singular: bool,
    /// パスすると詰まされる
    pub mate_threat: bool,
    /// PV ノード（窓の幅が1より大きい）
    pub pv: bool,
    /// 王手回避が1手しかない
    pub one_reply: bool,
    pub killers: [Move; 2],
    /// 直前の手が駒を取った升
    pub recapture: Option<Square>,
}

/// 指し手ループの途中経過
#[derive(Debug, Clone)]
pub(crate) struct LoopState {
    pub alpha: Value,
    pub best: Value,
    pub best_move: Move,
    pub pv: PvLine,
    /// 試した手の数（枝刈りした手を含む）
    pub move_count: usize,
    /// 実際に探索した手の数
    pub searched: usize,
    /// 最善になった子が経路依存の値だった
    pub historical: bool,
    pub cutoff: bool,
    /// 探索した静かな手（History の更新用）
    pub quiets: SmallVec<[Move; 32]>,
}

impl LoopState {
    pub fn new(alpha: Value) -> LoopState {
        LoopState {
            alpha,
            best: -Value::INFINITE,
            best_move: Move::NONE,
            pv: PvLine::new(),
            move_count: 0,
            searched: 0,
            historical: false,
            cutoff: false,
            quiets: SmallVec::new(),
        }
    }

    /// 子の結果を反映する。beta cutoff なら true
    pub fn update(
        &mut self,
        mv: Move,
        value: Value,
        beta: Value,
        child_pv: &[Move],
        historical: bool,
    ) -> bool {
        if value <= self.best {
            return false;
        }
        self.best = value;
        if historical {
            self.historical = true;
        }
        if value > self.alpha {
            self.alpha = value;
            self.best_move = mv;
            self.pv.clear();
            self.pv.push(mv);
            self.pv.extend_from_slice(child_pv);
            if value >= beta {
                self.cutoff = true;
                return true;
            }
        }
        false
    }
}

impl Default for LoopState {
    fn default() -> LoopState {
        LoopState::new(-Value::INFINITE)
    }
}

/// 1手を探索した結果
pub(crate) enum Outcome {
    Illegal,
    Pruned,
    Searched { value: Value, historical: bool, pv: PvLine },
}

#[inline]
fn tt_key(key: u64, excluded: Move) -> u64 {
    if excluded.is_some() {
        key ^ u64::from(excluded.raw()).wrapping_mul(EXCLUDED_KEY_SALT)
    } else {
        key
    }
}

/// 中断で値が使えなくなったノード
#[inline]
fn aborted(tree: &mut Tree) -> Value {
    tree.node_mut().historical = true;
    Value::ZERO
}

/// 通常探索
pub(crate) fn search(
    tree: &mut Tree,
    shared: &SearchShared,
    depth: Depth,
    alpha: Value,
    beta: Value,
    stat: NodeStat,
) -> Value {
    if tree.poll(shared) {
        return aborted(tree);
    }
    tree.stats.nodes += 1;

    if let Some(value) = tree.shek_value() {
        tree.node_mut().historical = true;
        return value;
    }

    let ply = tree.ply;
    let stm = tree.pos.side_to_move();
    if ply >= MAX_PLY - 1 {
        tree.node_mut().historical = true;
        return tree.node().eval.value(stm);
    }

    if depth < ONE_PLY {
        return qsearch(tree, shared, 0, alpha, beta);
    }

    let evaluator = Arc::clone(&shared.evaluator);
    let in_check = tree.node().in_check;
    let excluded = tree.node().excluded;
    let pv_node = beta.raw() - alpha.raw() > 1;
    let key = tt_key(tree.pos.key(), excluded);
    let tt_ply = ply as i32;

    // =========================================================================
    // 置換表
    // =========================================================================

    let mut hash_move = Move::NONE;
    let mut allow_null = stat.allow_null;
    let mut mate_threat = false;
    if let Some(data) = shared.tt.get(key, tt_ply) {
        tree.stats.tt_hits += 1;
        let usable = data.mv.is_some() && tree.pos.is_pseudo_legal(data.mv);
        if data.can_cutoff(depth, alpha, beta) {
            tree.stats.tt_cutoffs += 1;
            let node = tree.node_mut();
            node.pv.clear();
            if usable {
                node.pv.push(data.mv);
            }
            return data.value;
        }
        if usable {
            hash_move = data.mv;
        }
        if data.bound.is_upper() && data.value < beta {
            allow_null = false;
        }
        mate_threat = data.mate_threat;
    }

    // =========================================================================
    // 詰み判定
    // =========================================================================

    if !in_check && excluded.is_none() {
        let mut mate = tree.probe_mate_1ply(shared).map(|mv| (mv, Value::mate_in(tt_ply + 1)));
        if mate.is_none() && depth >= plies(2) {
            mate = tree
                .probe_mate_3ply(shared)
                .map(|(mv, distance)| (mv, Value::mate_in(tt_ply + distance)));
        }
        if let Some((mv, value)) = mate {
            tree.node_mut().set_pv(mv, &[]);
            shared.tt.entry(key, alpha, beta, value, depth, tt_ply, mv, false);
            return value;
        }
    }

    let stand_pat = tree.node().eval.value(stm);

    // =========================================================================
    // razoring
    // =========================================================================

    if !pv_node
        && !in_check
        && hash_move.is_none()
        && depth <= RAZOR_DEPTH
        && !alpha.is_decisive()
        && stand_pat + razor_margin(depth) <= alpha
    {
        tree.stats.razoring += 1;
        let value = qsearch(tree, shared, 0, alpha, alpha + 1);
        if tree.interrupted(shared) {
            return aborted(tree);
        }
        if value <= alpha {
            return value;
        }
    }

    // =========================================================================
    // null move
    // =========================================================================

    if allow_null
        && !pv_node
        && !in_check
        && excluded.is_none()
        && depth >= NULL_MIN_DEPTH
        && stand_pat >= beta
        && !beta.is_decisive()
    {
        tree.stats.null_tries += 1;
        let null_depth = depth - ONE_PLY - null_reduction(depth);
        tree.make_null_move();
        let value = -search(tree, shared, null_depth, -beta, -beta + 1, NodeStat { allow_null: false });
        let child_historical = tree.nodes[tree.ply].historical;
        tree.unmake_null_move();
        if tree.interrupted(shared) {
            return aborted(tree);
        }
        if value >= beta {
            tree.stats.null_cutoffs += 1;
            let value = if value.is_decisive() { beta } else { value };
            if !child_historical {
                shared.tt.entry(key, alpha, beta, value, depth, tt_ply, Move::NONE, false);
            }
            return value;
        }
        if value.is_loss() {
            mate_threat = true;
        }
    }

    // =========================================================================
    // IID
    // =========================================================================

    if hash_move.is_none() && excluded.is_none() && depth >= IID_MIN_DEPTH {
        tree.stats.iid_searches += 1;
        search(tree, shared, depth - IID_REDUCTION, alpha, beta, NodeStat { allow_null: false });
        if tree.interrupted(shared) {
            return aborted(tree);
        }
        let first = tree.node().pv.first().copied();
        let found = first.or_else(|| shared.tt.get(key, tt_ply).map(|d| d.mv));
        if let Some(mv) = found.filter(|&mv| mv.is_some() && tree.pos.is_pseudo_legal(mv)) {
            hash_move = mv;
        }
    }

    // =========================================================================
    // singular extension の確認
    // =========================================================================

    let mut singular = false;
    if hash_move.is_some() && excluded.is_none() && depth >= SINGULAR_MIN_DEPTH {
        let candidate = shared.tt.get(key, tt_ply).filter(|d| {
            d.mv == hash_move
                && d.bound.is_lower()
                && d.depth >= depth - plies(3)
                && !d.value.is_decisive()
        });
        if let Some(data) = candidate {
            let singular_beta = data.value - singular_margin(depth);
            tree.node_mut().excluded = hash_move;
            let value = search(
                tree,
                shared,
                depth / 2,
                singular_beta - 1,
                singular_beta,
                NodeStat { allow_null: false },
            );
            tree.node_mut().excluded = Move::NONE;
            if tree.interrupted(shared) {
                return aborted(tree);
            }
            singular = value < singular_beta;
        }
    }

    // =========================================================================
    // 指し手ループ
    // =========================================================================

    let recapture = {
        let prev = tree.node().mv;
        (prev.is_normal() && prev.is_capture()).then(|| prev.to())
    };
    let node = tree.node_mut();
    node.pv.clear();
    let killers = node.killers;
    let slots = node.capture_slot_moves();
    node.picker.reset(hash_move, killers, slots, in_check);

    let mut ctx = MoveContext {
        depth,
        beta,
        in_check,
        stand_pat,
        hash_move,
        singular,
        mate_threat,
        pv: pv_node,
        one_reply: false,
        killers,
        recapture,
    };
    let see = See::new(evaluator.as_ref());
    let mut state = LoopState::new(alpha);

    while let Some(mv) = tree.next_move(&see, &shared.history) {
        ctx.one_reply = in_check && tree.node().picker.evasion_count() == 1;
        if mv == excluded {
            continue;
        }

        if state.move_count > 0 && can_split(tree, shared, depth, excluded) {
            let mut moves = vec![mv];
            moves.extend(tree.remaining_moves(&see, &shared.history));
            split(tree, shared, &ctx, moves, &mut state);
            break;
        }

        match search_move(tree, shared, &ctx, mv, state.move_count, state.alpha) {
            Outcome::Illegal => {}
            Outcome::Pruned => state.move_count += 1,
            Outcome::Searched { value, historical, pv } => {
                state.move_count += 1;
                if tree.interrupted(shared) {
                    return aborted(tree);
                }
                state.searched += 1;
                if !mv.is_tactical() {
                    state.quiets.push(mv);
                }
                if state.update(mv, value, beta, &pv, historical) {
                    break;
                }
            }
        }
    }

    if tree.interrupted(shared) {
        return aborted(tree);
    }

    if state.searched == 0 {
        // 除外した手しかなければ、その手は singular
        return if excluded.is_some() { alpha } else { Value::mated_in(tt_ply) };
    }

    // =========================================================================
    // 後処理
    // =========================================================================

    let best_move = state.best_move;
    if best_move.is_some() {
        let weight = ((depth / ONE_PLY).max(1) as u32).pow(2);
        if state.cutoff {
            tree.stats.beta_cutoffs += 1;
            if state.searched == 1 {
                tree.stats.first_move_cutoffs += 1;
            }
        }
        if best_move.is_tactical() {
            if best_move.is_capture() {
                tree.node_mut().update_capture_slots(best_move);
            }
        } else {
            shared.history.add(best_move, weight, true);
            tree.node_mut().update_killers(best_move);
        }
        for &mv in state.quiets.iter().filter(|&&mv| mv != best_move) {
            shared.history.add(mv, weight, false);
        }
    }

    let node = tree.node_mut();
    node.historical |= state.historical;
    node.pv = state.pv;
    let historical = node.historical;
    if !historical && excluded.is_none() {
        shared.tt.entry(key, alpha, beta, state.best, depth, tt_ply, best_move, mate_threat);
    }
    state.best
}

/// 指し手ループの1手
///
/// 延長と枝刈りを決めて子ノードを探索する。
/// `move_count` はこの手より前に試した手の数、`alpha` は現在の下限。
pub(crate) fn search_move(
    tree: &mut Tree,
    shared: &SearchShared,
    ctx: &MoveContext,
    mv: Move,
    move_count: usize,
    alpha: Value,
) -> Outcome {
    let evaluator = shared.evaluator.as_ref();
    let depth = ctx.depth;
    let beta = ctx.beta;
    let gives_check = tree.pos.gives_check(mv);
    let tactical = mv.is_tactical();
    let is_hash = mv == ctx.hash_move;
    let is_killer = ctx.killers.contains(&mv);
    let goodness = shared.history.goodness(mv);

    // 延長（合計1手まで）
    let extension = if ctx.singular && is_hash {
        tree.stats.extensions_singular += 1;
        ONE_PLY
    } else if gives_check {
        tree.stats.extensions_check += 1;
        ONE_PLY
    } else if ctx.one_reply {
        tree.stats.extensions_one_reply += 1;
        ONE_PLY
    } else if mv.is_capture() && ctx.recapture == Some(mv.to()) {
        tree.stats.extensions_recapture += 1;
        ONE_PLY / 2
    } else {
        0
    };
    let new_depth = depth - ONE_PLY + extension;

    let quiet_late = move_count > 0
        && !ctx.in_check
        && !gives_check
        && !tactical
        && !is_hash
        && !is_killer
        && !ctx.mate_threat;

    if quiet_late && !alpha.is_decisive() {
        if depth < FUTILITY_DEPTH && move_count >= move_count_limit(depth) {
            tree.stats.move_count_pruned += 1;
            return Outcome::Pruned;
        }
        let predicted = new_depth - lmr_reduction(depth, move_count, goodness);
        if predicted < FUTILITY_DEPTH
            && ctx.stand_pat + futility_margin(predicted) + evaluator.estimate(&tree.pos, mv) <= alpha
        {
            tree.stats.futility_pruned += 1;
            return Outcome::Pruned;
        }
        if predicted < SEE_PRUNE_DEPTH && See::new(evaluator).evaluate(&tree.pos, mv, true) < 0 {
            tree.stats.see_pruned += 1;
            return Outcome::Pruned;
        }
    }

    let mut reduction = if quiet_late && extension == 0 && move_count >= LMR_MIN_MOVES {
        lmr_reduction(depth, move_count, goodness)
    } else {
        0
    };
    if ctx.pv {
        reduction = (reduction - ONE_PLY).max(0);
    }

    if !tree.make_move(mv, evaluator) {
        return Outcome::Illegal;
    }

    let value = if move_count == 0 {
        -search(tree, shared, new_depth, -beta, -alpha, NodeStat::default())
    } else {
        if reduction > 0 {
            tree.stats.lmr_reductions += 1;
        }
        let null_window = -(alpha + 1);
        let mut value =
            -search(tree, shared, new_depth - reduction, null_window, -alpha, NodeStat::default());
        if value > alpha && reduction > 0 && !tree.interrupted(shared) {
            tree.stats.lmr_researches += 1;
            value = -search(tree, shared, new_depth, null_window, -alpha, NodeStat::default());
        }
        if value > alpha && value < beta && !tree.interrupted(shared) {
            value = -search(tree, shared, new_depth, -beta, -alpha, NodeStat::default());
        }
        value
    };

    let child = &tree.nodes[tree.ply];
    let historical = child.historical;
    let pv = child.pv.clone();
    tree.unmake_move();
    Outcome::Searched { value, historical, pv }
}

// =============================================================================
// 分割
// =============================================================================

fn can_split(tree: &Tree, shared: &SearchShared, depth: Depth, excluded: Move) -> bool {
    tree.params.parallel
        && depth >= tree.params.split_min_depth
        && excluded.is_none()
        && tree.ply > 0
        && shared.idle.load(std::sync::atomic::Ordering::Relaxed) > 0
        && !tree.interrupted(shared)
}

/// 残りの手で分割点を作り、協力者と分け合って探索する
fn split(
    tree: &mut Tree,
    shared: &SearchShared,
    ctx: &MoveContext,
    moves: Vec<Move>,
    state: &mut LoopState,
) {
    let sp = Arc::new(SplitPoint::new(
        tree.split.clone(),
        tree.worker,
        tree.root.clone(),
        tree.path(),
        *ctx,
        moves,
        std::mem::take(state),
    ));
    let helpers = worker::recruit(shared, &sp);
    if helpers > 0 {
        tree.stats.splits += 1;
        log::trace!("worker {} split at ply {} with {} helpers", tree.worker, tree.ply, helpers);
    }

    let parent = tree.split.replace(Arc::clone(&sp));
    search_split(tree, shared, &sp);
    worker::wait_for_helpers(shared, tree.worker, &sp);
    tree.split = parent;
    *state = sp.take_result();
}

/// 分割点の手を取り出しては探索する（親と協力者の共通処理）
pub(crate) fn search_split(tree: &mut Tree, shared: &SearchShared, sp: &SplitPoint) {
    while let Some((mv, move_count, alpha)) = sp.next_move() {
        let outcome = search_move(tree, shared, &sp.context, mv, move_count, alpha);
        if tree.interrupted(shared) {
            break;
        }
        match outcome {
            Outcome::Illegal => {}
            Outcome::Pruned => sp.record_pruned(),
            Outcome::Searched { value, historical, pv } => {
                if sp.report(mv, value, &pv, historical) {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PieceType, Square};

    fn mv(file: u8) -> Move {
        Move::new_move(PieceType::Gold, Square::new(file, 8), Square::new(file, 7), false, None)
    }

    #[test]
    fn test_loop_state_tracks_best_and_window() {
        let mut state = LoopState::new(Value::new(0));
        assert!(!state.update(mv(1), Value::new(-20), Value::new(100), &[], false));
        assert_eq!(state.best, Value::new(-20));
        assert_eq!(state.best_move, Move::NONE);

        assert!(!state.update(mv(2), Value::new(30), Value::new(100), &[mv(3)], false));
        assert_eq!(state.alpha, Value::new(30));
        assert_eq!(state.pv.as_slice(), &[mv(2), mv(3)]);

        // 最善を更新しない手は何も変えない
        assert!(!state.update(mv(4), Value::new(10), Value::new(100), &[], true));
        assert!(!state.historical);

        assert!(state.update(mv(5), Value::new(100), Value::new(100), &[], false));
        assert!(state.cutoff);
        assert_eq!(state.best_move, mv(5));
    }

    #[test]
    fn test_excluded_move_changes_key() {
        let key = 0x1234_5678_9ABC_DEF0;
        assert_eq!(tt_key(key, Move::NONE), key);
        assert_ne!(tt_key(key, mv(1)), key);
        assert_ne!(tt_key(key, mv(1)), tt_key(key, mv(2)));
    }
}
