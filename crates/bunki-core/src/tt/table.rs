//! TranspositionTable本体

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;

use super::BUCKET_SIZE;
use super::entry::{TtData, TtEntry};
use crate::types::{Bound, Depth, Move, Value};

/// 同じインデックスを共有するエントリのグループ
#[derive(Clone, Copy)]
struct Bucket {
    entries: [TtEntry; BUCKET_SIZE],
    /// 上書き先の巡回位置
    next: u8,
}

impl Bucket {
    const EMPTY: Bucket = Bucket { entries: [TtEntry::EMPTY; BUCKET_SIZE], next: 0 };
}

/// 置換表
pub struct TranspositionTable {
    buckets: Vec<Mutex<Bucket>>,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// 新しい置換表を作成（サイズはMB単位）
    pub fn new(mb_size: usize) -> TranspositionTable {
        let count = Self::bucket_count(mb_size);
        TranspositionTable {
            buckets: (0..count).map(|_| Mutex::new(Bucket::EMPTY)).collect(),
            generation: AtomicU8::new(0),
        }
    }

    fn bucket_count(mb_size: usize) -> usize {
        (mb_size * 1024 * 1024 / std::mem::size_of::<Mutex<Bucket>>()).max(2)
    }

    /// サイズを変更（内容は消える）
    pub fn resize(&mut self, mb_size: usize) {
        let count = Self::bucket_count(mb_size);
        if count != self.buckets.len() {
            self.buckets = (0..count).map(|_| Mutex::new(Bucket::EMPTY)).collect();
        } else {
            self.clear();
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// 全エントリを消去
    pub fn clear(&self) {
        for bucket in &self.buckets {
            *bucket.lock() = Bucket::EMPTY;
        }
    }

    /// 全エントリの写し
    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<TtEntry> {
        self.buckets.iter().flat_map(|b| b.lock().entries).collect()
    }

    /// 新しい探索を開始（世代を進める）
    pub fn evolve(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len() * BUCKET_SIZE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[inline]
    fn bucket(&self, key: u64) -> &Mutex<Bucket> {
        // key * bucket_count / 2^64 でインデックスを計算
        let index = ((key as u128 * self.buckets.len() as u128) >> 64) as usize;
        &self.buckets[index]
    }

    /// 置換表を検索する
    ///
    /// チェックサムが合わないエントリはないものとして扱う。
    pub fn get(&self, key: u64, ply: i32) -> Option<TtData> {
        let bucket = self.bucket(key).lock();
        bucket.entries.iter().find(|e| e.key == key && e.is_valid()).map(|e| TtData {
            mv: e.mv,
            value: e.value.from_tt(ply),
            bound: e.bound,
            depth: e.depth,
            mate_threat: e.mate_threat,
            generation: e.generation,
        })
    }

    /// 探索結果を格納する
    ///
    /// 値は窓 (alpha, beta) に対して Exact/Lower/Upper に分類する。
    /// 同じ世代でより深い結果を浅い結果で上書きする場合は、値が確定した詰みの
    /// 境界でない限り拒否して false を返す。
    #[allow(clippy::too_many_arguments)]
    pub fn entry(
        &self,
        key: u64,
        alpha: Value,
        beta: Value,
        value: Value,
        depth: Depth,
        ply: i32,
        mv: Move,
        mate_threat: bool,
    ) -> bool {
        let bound = Bound::classify(value, alpha, beta);
        let proven = (value.is_win() && bound.is_lower()) || (value.is_loss() && bound.is_upper());
        let generation = self.generation();

        let mut bucket = self.bucket(key).lock();
        let same = bucket.entries.iter().position(|e| e.key == key && e.is_valid());
        let slot = match same {
            Some(i) => {
                let old = bucket.entries[i];
                if old.generation == generation && depth < old.depth && !proven {
                    return false;
                }
                i
            }
            None => match bucket
                .entries
                .iter()
                .position(|e| !e.is_valid() || e.generation != generation)
            {
                Some(i) => i,
                None => {
                    let i = bucket.next as usize;
                    bucket.next = ((i + 1) % BUCKET_SIZE) as u8;
                    i
                }
            },
        };

        let old = bucket.entries[slot];
        let keep_move = mv.is_none() && same.is_some();
        let mut entry = TtEntry {
            key,
            checksum: 0,
            generation,
            mate_threat,
            mv: if keep_move { old.mv } else { mv },
            value: value.to_tt(ply),
            bound,
            depth,
        };
        entry.seal();
        bucket.entries[slot] = entry;
        true
    }

    /// 使用率（1000分率、現在の世代のエントリのみ）
    pub fn hashfull(&self) -> usize {
        let generation = self.generation();
        let sample = self.buckets.len().min(250);
        let used: usize = self.buckets[..sample]
            .iter()
            .map(|b| {
                b.lock()
                    .entries
                    .iter()
                    .filter(|e| e.is_occupied() && e.generation == generation)
                    .count()
            })
            .sum();
        used * 1000 / (sample * BUCKET_SIZE)
    }

    #[cfg(test)]
    fn corrupt(&self, key: u64) {
        let mut bucket = self.bucket(key).lock();
        if let Some(e) = bucket.entries.iter_mut().find(|e| e.key == key) {
            e.depth += 1;
        }
    }
}
