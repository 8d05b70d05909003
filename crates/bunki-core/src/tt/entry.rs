//! 置換表エントリ

use crate::types::{Bound, Depth, Move, Value};

/// 置換表エントリ
///
/// 値は `Value::to_tt` で格納したノードからの距離に補正済み。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtEntry {
    pub(super) key: u64,
    pub(super) checksum: u32,
    pub(super) generation: u8,
    pub(super) mate_threat: bool,
    pub(super) mv: Move,
    pub(super) value: Value,
    pub(super) bound: Bound,
    pub(super) depth: Depth,
}

impl TtEntry {
    pub const EMPTY: TtEntry = TtEntry {
        key: 0,
        checksum: 0,
        generation: 0,
        mate_threat: false,
        mv: Move::NONE,
        value: Value::ZERO,
        bound: Bound::None,
        depth: 0,
    };

    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.bound != Bound::None
    }

    /// 格納内容から計算するチェックサム
    pub(super) fn compute_checksum(&self) -> u32 {
        let mut h = self.key ^ 0x9E37_79B9_7F4A_7C15;
        for word in [
            self.mv.raw() as u64,
            self.value.raw() as u32 as u64,
            self.depth as u32 as u64,
            ((self.bound as u64) << 8) | ((self.mate_threat as u64) << 16) | self.generation as u64,
        ] {
            h = (h ^ word).wrapping_mul(0xFF51_AFD7_ED55_8CCD);
            h ^= h >> 33;
        }
        (h ^ (h >> 32)) as u32
    }

    #[inline]
    pub(super) fn is_valid(&self) -> bool {
        self.is_occupied() && self.checksum == self.compute_checksum()
    }

    #[inline]
    pub(super) fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }
}

/// 置換表から読み出したデータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtData {
    pub mv: Move,
    /// 読み出し側の ply に補正済みの値
    pub value: Value,
    pub bound: Bound,
    pub depth: Depth,
    pub mate_threat: bool,
    pub generation: u8,
}

impl TtData {
    /// この深さ・窓で枝刈りに使えるか
    #[inline]
    pub fn can_cutoff(&self, depth: Depth, alpha: Value, beta: Value) -> bool {
        self.depth >= depth && self.bound.can_cutoff(self.value, alpha, beta)
    }
}
