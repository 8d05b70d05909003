//! 枝刈り・延長・削減の閾値
//!
//! - Razoring
//! - Null Move Pruning
//! - Futility Pruning / Move Count Pruning
//! - Singular Extension
//! - LMR

use super::history::HISTORY_SCALE;
use crate::types::{Depth, ONE_PLY, plies};

// =============================================================================
// Razoring
// =============================================================================

/// Razoring を行う残り深さの上限
pub(super) const RAZOR_DEPTH: Depth = plies(3);

#[inline]
pub(super) fn razor_margin(depth: Depth) -> i32 {
    512 + 64 * depth / ONE_PLY
}

// =============================================================================
// Null Move Pruning
// =============================================================================

pub(super) const NULL_MIN_DEPTH: Depth = plies(2);

/// パスした後の探索で減らす深さ
#[inline]
pub(super) fn null_reduction(depth: Depth) -> Depth {
    plies(3) + depth / 4
}

// =============================================================================
// Futility / Move Count Pruning
// =============================================================================

/// 着手後の残り深さがこれ未満なら futility pruning を試す
pub(super) const FUTILITY_DEPTH: Depth = plies(4);

#[inline]
pub(super) fn futility_margin(depth: Depth) -> i32 {
    96 + 128 * depth.max(0) / ONE_PLY
}

/// 残り深さごとに静かな手を探索する数の上限
#[inline]
pub(super) fn move_count_limit(depth: Depth) -> usize {
    let d = (depth / ONE_PLY).max(0) as usize;
    4 + d * d * 2
}

/// 負の SEE の手を刈る深さの上限
pub(super) const SEE_PRUNE_DEPTH: Depth = plies(2);

/// 静止探索での futility margin
pub(super) const QSEARCH_FUTILITY_MARGIN: i32 = 128;

// =============================================================================
// IID / Singular Extension
// =============================================================================

pub(super) const IID_MIN_DEPTH: Depth = plies(4);

/// IID で減らす深さ
pub(super) const IID_REDUCTION: Depth = plies(2);

pub(super) const SINGULAR_MIN_DEPTH: Depth = plies(6);

#[inline]
pub(super) fn singular_margin(depth: Depth) -> i32 {
    16 * depth / ONE_PLY
}

// =============================================================================
// LMR
// =============================================================================

pub(super) const LMR_MIN_DEPTH: Depth = plies(3);

/// 何手目から削減するか
pub(super) const LMR_MIN_MOVES: usize = 3;

/// 遅い静かな手の削減量
///
/// 残り深さと手の順番から基本量を決め、History の成功率で増減する。
/// 結果は 1 手分以上の深さを残す。
pub(super) fn lmr_reduction(depth: Depth, move_count: usize, goodness: u32) -> Depth {
    if depth < LMR_MIN_DEPTH || move_count < LMR_MIN_MOVES {
        return 0;
    }
    let d = (depth / ONE_PLY) as f64;
    let m = move_count as f64;
    let mut r = (d.ln() * m.ln() * 0.5 * ONE_PLY as f64) as Depth;
    if goodness >= HISTORY_SCALE / 2 {
        r -= ONE_PLY / 2;
    } else if goodness < HISTORY_SCALE / 16 {
        r += ONE_PLY / 2;
    }
    r.clamp(0, depth - ONE_PLY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margins_grow_with_depth() {
        assert!(futility_margin(plies(3)) > futility_margin(plies(1)));
        assert!(razor_margin(plies(2)) > razor_margin(plies(1)));
        assert!(move_count_limit(plies(3)) > move_count_limit(plies(1)));
        assert!(null_reduction(plies(8)) > null_reduction(plies(2)));
    }

    #[test]
    fn test_lmr_reduction_bounds() {
        assert_eq!(lmr_reduction(plies(2), 20, 0), 0);
        assert_eq!(lmr_reduction(plies(6), 1, 0), 0);
        for depth in (LMR_MIN_DEPTH..plies(20)).step_by(ONE_PLY as usize) {
            for moves in LMR_MIN_MOVES..60 {
                let r = lmr_reduction(depth, moves, 0);
                assert!((0..=depth - ONE_PLY).contains(&r));
            }
        }
        // 成功率の高い手は削減が少ない
        let good = lmr_reduction(plies(10), 30, HISTORY_SCALE);
        let bad = lmr_reduction(plies(10), 30, 0);
        assert!(good < bad);
    }
}
