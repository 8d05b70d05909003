//! 探索統計
//!
//! Tree ごとに数え、探索の終わりに全 Tree 分を合算して `SearchDiagnostics` にする。

use serde::Serialize;

/// 探索統計カウンタ（Tree ごと）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// 通常探索のノード数
    pub nodes: u64,
    /// 静止探索のノード数
    pub qnodes: u64,
    pub tt_hits: u64,
    pub tt_cutoffs: u64,
    pub null_tries: u64,
    pub null_cutoffs: u64,
    pub razoring: u64,
    pub iid_searches: u64,
    pub futility_pruned: u64,
    pub move_count_pruned: u64,
    pub see_pruned: u64,
    pub lmr_reductions: u64,
    pub lmr_researches: u64,
    pub extensions_check: u64,
    pub extensions_one_reply: u64,
    pub extensions_recapture: u64,
    pub extensions_singular: u64,
    pub beta_cutoffs: u64,
    /// 最初に探索した手での beta cutoff
    pub first_move_cutoffs: u64,
    pub mate1_probes: u64,
    pub mate1_hits: u64,
    pub mate3_probes: u64,
    pub mate3_hits: u64,
    pub shek_hits: u64,
    /// このTreeが親として分割した回数
    pub splits: u64,
    /// 分割探索に協力した回数
    pub helped: u64,
    /// 非合法で飛ばした手
    pub rejected_moves: u64,
}

impl SearchStats {
    /// 他の Tree の統計を加算する
    pub fn merge(&mut self, other: &SearchStats) {
        macro_rules! add {
            ($($field:ident),* $(,)?) => {
                $(self.$field += other.$field;)*
            };
        }
        add!(
            nodes,
            qnodes,
            tt_hits,
            tt_cutoffs,
            null_tries,
            null_cutoffs,
            razoring,
            iid_searches,
            futility_pruned,
            move_count_pruned,
            see_pruned,
            lmr_reductions,
            lmr_researches,
            extensions_check,
            extensions_one_reply,
            extensions_recapture,
            extensions_singular,
            beta_cutoffs,
            first_move_cutoffs,
            mate1_probes,
            mate1_hits,
            mate3_probes,
            mate3_hits,
            shek_hits,
            splits,
            helped,
            rejected_moves,
        );
    }

    pub fn reset(&mut self) {
        *self = SearchStats::default();
    }
}

/// 直近の探索の結果と統計
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchDiagnostics {
    /// 完了した深さ（手数）
    pub depth: u32,
    /// 完了した深さでの評価値
    pub value: i32,
    /// 最善手（USI表記）
    pub best_move: Option<String>,
    /// 読み筋（USI表記）
    pub pv: Vec<String>,
    pub elapsed_ms: u64,
    pub nps: u64,
    /// 置換表の使用率（1000分率）
    pub hashfull: usize,
    /// 中断で打ち切られたか
    pub interrupted: bool,
    pub stats: SearchStats,
}
