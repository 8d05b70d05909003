//! History統計
//!
//! 指し手（from/打ち駒種 × to）ごとに「探索した回数」と「最善になった回数」を
//! 数え、静かな手の並べ替えと LMR の削減量に使う。
//! 全スレッドで共有するので各カウンタは atomic（緩い順序で十分）。

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::Move;

/// goodness の最大値
pub const HISTORY_SCALE: u32 = 256;

/// appear がこの値を超えたら半減させる
const SATURATION: u32 = 1 << 20;

#[derive(Default)]
struct HistoryEntry {
    appear: AtomicU32,
    good: AtomicU32,
}

impl HistoryEntry {
    fn halve(&self) {
        // 読みと書きの間に他スレッドの加算が入っても統計がずれるだけ
        let a = self.appear.load(Ordering::Relaxed);
        self.appear.store(a / 2, Ordering::Relaxed);
        let g = self.good.load(Ordering::Relaxed);
        self.good.store((g / 2).min(a / 2), Ordering::Relaxed);
    }
}

/// History テーブル
pub struct History {
    table: Box<[HistoryEntry]>,
}

impl History {
    pub fn new() -> History {
        History { table: (0..Move::HISTORY_SIZE).map(|_| HistoryEntry::default()).collect() }
    }

    /// 探索結果を記録する
    ///
    /// `weight` は深さに応じた重み、`good` は最善手になったか。
    pub fn add(&self, mv: Move, weight: u32, good: bool) {
        let entry = &self.table[mv.history_index()];
        let appear = entry.appear.fetch_add(weight, Ordering::Relaxed) + weight;
        if good {
            entry.good.fetch_add(weight, Ordering::Relaxed);
        }
        if appear > SATURATION {
            entry.halve();
        }
    }

    /// 最善になった割合（0..=HISTORY_SCALE）
    ///
    /// 記録のない手は中間値を返す。
    pub fn goodness(&self, mv: Move) -> u32 {
        let entry = &self.table[mv.history_index()];
        let appear = entry.appear.load(Ordering::Relaxed);
        let good = entry.good.load(Ordering::Relaxed).min(appear);
        ((good as u64 * 2 + 1) * HISTORY_SCALE as u64 / (appear as u64 * 2 + 2)) as u32
    }

    /// 全エントリを半減させる（反復深化の開始時）
    pub fn reduce(&self) {
        for entry in self.table.iter() {
            entry.halve();
        }
    }

    pub fn clear(&self) {
        for entry in self.table.iter() {
            entry.appear.store(0, Ordering::Relaxed);
            entry.good.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for History {
    fn default() -> History {
        History::new()
    }
}
