//! 詰み判定のキャッシュと統計

use std::sync::atomic::{AtomicU16, Ordering};

use crate::position::Position;
use crate::types::{Move, PieceType, Square};

/// 詰み判定の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MateEntity {
    key: u64,
    /// 詰ます手（不詰みなら NONE）
    mv: Move,
    checksum: u32,
}

impl MateEntity {
    const EMPTY: MateEntity = MateEntity { key: 0, mv: Move::NONE, checksum: 0 };

    fn new(key: u64, mv: Move) -> MateEntity {
        MateEntity { key, mv, checksum: Self::compute_checksum(key, mv) }
    }

    fn compute_checksum(key: u64, mv: Move) -> u32 {
        let h = (key ^ u64::from(mv.raw()).rotate_left(29)).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        ((h >> 32) as u32) | 1
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.checksum == Self::compute_checksum(self.key, self.mv)
    }
}

/// 詰み判定の結果キャッシュ（Tree ごと、直接写像）
pub struct MateCache {
    entries: Vec<MateEntity>,
    mask: usize,
}

impl MateCache {
    pub fn new(bits: u32) -> MateCache {
        let size = 1usize << bits;
        MateCache { entries: vec![MateEntity::EMPTY; size], mask: size - 1 }
    }

    /// 記録があれば `Some(結果)` を返す
    pub fn get(&self, key: u64) -> Option<Option<Move>> {
        let e = &self.entries[key as usize & self.mask];
        if e.key != key || !e.is_valid() {
            return None;
        }
        Some(if e.mv.is_none() { None } else { Some(e.mv) })
    }

    pub fn set(&mut self, key: u64, result: Option<Move>) {
        self.entries[key as usize & self.mask] = MateEntity::new(key, result.unwrap_or(Move::NONE));
    }

    pub fn clear(&mut self) {
        self.entries.fill(MateEntity::EMPTY);
    }
}

#[derive(Default)]
struct MateCounter {
    probed: AtomicU16,
    mate: AtomicU16,
    /// 統計で省いた回数
    skipped: AtomicU16,
}

/// 玉の位置と直前の手ごとの詰み判定の成功率（全スレッド共有）
///
/// 何度調べてもほとんど詰まない組み合わせでは判定を省く。
pub struct MateHistory {
    table: Box<[MateCounter]>,
}

impl MateHistory {
    /// この回数を超えてから統計を使う
    const MIN_PROBES: u16 = 16;
    /// 成功率がこの逆数を下回れば省く
    const MIN_RATE_INV: u32 = 64;
    /// 省いている組み合わせもこの回数に1回は調べ直す
    const RETRY_INTERVAL: u16 = 32;

    pub fn new() -> MateHistory {
        let size = Square::NUM * Square::NUM * PieceType::NUM;
        MateHistory { table: (0..size).map(|_| MateCounter::default()).collect() }
    }

    /// 攻め方の手番の局面での添字（相手玉の位置 × 直前の手の移動先・駒種）
    fn index(pos: &Position) -> Option<usize> {
        let ksq = pos.king_square(!pos.side_to_move())?;
        let prev = pos.last_move().filter(|m| m.is_normal())?;
        Some(
            (ksq.index() * Square::NUM + prev.to().index()) * PieceType::NUM
                + prev.piece_type_after().index(),
        )
    }

    /// 詰み判定をする価値があるか
    pub fn is_worth_probing(&self, pos: &Position) -> bool {
        let Some(i) = Self::index(pos) else {
            return true;
        };
        let c = &self.table[i];
        let probed = c.probed.load(Ordering::Relaxed);
        let mate = c.mate.load(Ordering::Relaxed);
        if probed < Self::MIN_PROBES || u32::from(mate) * Self::MIN_RATE_INV >= u32::from(probed) {
            return true;
        }
        let skipped = c.skipped.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        skipped % Self::RETRY_INTERVAL == 0
    }

    /// 判定結果を記録する
    pub fn record(&self, pos: &Position, mate: bool) {
        let Some(i) = Self::index(pos) else {
            return;
        };
        let c = &self.table[i];
        let probed = c.probed.fetch_add(1, Ordering::Relaxed);
        if mate {
            c.mate.fetch_add(1, Ordering::Relaxed);
        }
        if probed >= u16::MAX / 2 {
            c.probed.store(probed / 2, Ordering::Relaxed);
            let m = c.mate.load(Ordering::Relaxed);
            c.mate.store(m / 2, Ordering::Relaxed);
        }
    }

    /// 探索の開始時に統計を半分にする
    pub fn reduce(&self) {
        for c in self.table.iter() {
            let probed = c.probed.load(Ordering::Relaxed);
            if probed == 0 {
                continue;
            }
            c.probed.store(probed / 2, Ordering::Relaxed);
            let m = c.mate.load(Ordering::Relaxed);
            c.mate.store(m / 2, Ordering::Relaxed);
            c.skipped.store(0, Ordering::Relaxed);
        }
    }

    /// 記録した判定の総数
    #[cfg(test)]
    pub(crate) fn total_recorded(&self) -> u64 {
        self.table.iter().map(|c| u64::from(c.probed.load(Ordering::Relaxed))).sum()
    }

    pub fn clear(&self) {
        for c in self.table.iter() {
            c.probed.store(0, Ordering::Relaxed);
            c.mate.store(0, Ordering::Relaxed);
            c.skipped.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for MateHistory {
    fn default() -> MateHistory {
        MateHistory::new()
    }
}
