//! SHEK（同一局面・優等局面の検出）
//!
//! 探索経路上の局面を盤面キー（手番・手駒を含まない）で記録し、現在の局面と
//! 盤面が同じで手番も同じ局面があれば手駒を比較する。
//! 盤上が同じなら駒の総数も同じなので、先手の手駒だけで優劣が決まる。
//!
//! - 手駒が同じ: 同一局面（千日手）
//! - 手番側の手駒が多い: 優等局面（手番側の得）
//! - 手番側の手駒が少ない: 劣等局面（手番側の損）

use smallvec::SmallVec;

use crate::types::{Color, Hand};

/// 以前の局面と比べた現在の局面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShekStat {
    /// 手番側にとって以前の局面より良い
    Superior,
    /// 手番側にとって以前の局面より悪い
    Inferior,
    /// 同一局面
    Equal,
}

/// 照合結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShekHit {
    pub stat: ShekStat,
    /// 以前の局面を記録した手数
    pub ply: u16,
}

/// 記録した局面
#[derive(Debug, Clone, Copy)]
pub struct ShekEntity {
    board_key: u64,
    black_hand: Hand,
    turn: Color,
    /// 最初に記録した手数
    ply: u16,
    /// 経路上に現れた回数
    count: u16,
}

impl ShekEntity {
    /// 盤面が同じ現在の局面（black_hand, turn）をこの記録と比べる
    ///
    /// 手番が違うか、手駒に優劣がつかない場合は None。
    pub fn compare_to(&self, black_hand: Hand, turn: Color) -> Option<ShekStat> {
        if turn != self.turn {
            return None;
        }
        let more = black_hand.is_superior_or_equal(self.black_hand);
        let less = self.black_hand.is_superior_or_equal(black_hand);
        let black_view = match (more, less) {
            (true, true) => return Some(ShekStat::Equal),
            (true, false) => ShekStat::Superior,
            (false, true) => ShekStat::Inferior,
            (false, false) => return None,
        };
        Some(match (turn, black_view) {
            (Color::Black, stat) => stat,
            (Color::White, ShekStat::Superior) => ShekStat::Inferior,
            (Color::White, _) => ShekStat::Superior,
        })
    }
}

/// SHEK テーブル（Tree ごと）
pub struct ShekTable {
    buckets: Vec<SmallVec<[ShekEntity; 2]>>,
    mask: usize,
}

impl ShekTable {
    const DEFAULT_BITS: u32 = 12;

    pub fn new() -> ShekTable {
        let size = 1usize << Self::DEFAULT_BITS;
        ShekTable { buckets: vec![SmallVec::new(); size], mask: size - 1 }
    }

    #[inline]
    fn bucket(&self, board_key: u64) -> &SmallVec<[ShekEntity; 2]> {
        &self.buckets[board_key as usize & self.mask]
    }

    /// 局面を記録する（その局面から指す直前に呼ぶ）
    pub fn set(&mut self, board_key: u64, black_hand: Hand, turn: Color, ply: u16) {
        let bucket = &mut self.buckets[board_key as usize & self.mask];
        if let Some(e) = bucket
            .iter_mut()
            .find(|e| e.board_key == board_key && e.black_hand == black_hand && e.turn == turn)
        {
            e.count += 1;
            return;
        }
        bucket.push(ShekEntity { board_key, black_hand, turn, ply, count: 1 });
    }

    /// `set` を取り消す（手を戻した直後に呼ぶ）
    pub fn unset(&mut self, board_key: u64, black_hand: Hand, turn: Color) {
        let bucket = &mut self.buckets[board_key as usize & self.mask];
        if let Some(i) = bucket
            .iter()
            .position(|e| e.board_key == board_key && e.black_hand == black_hand && e.turn == turn)
        {
            if bucket[i].count > 1 {
                bucket[i].count -= 1;
            } else {
                bucket.swap_remove(i);
            }
        }
    }

    /// 現在の局面を記録済みの局面と照合する
    ///
    /// 複数該当する場合は同一、優等、劣等の順に優先する。
    pub fn check(&self, board_key: u64, black_hand: Hand, turn: Color) -> Option<ShekHit> {
        let mut found: Option<ShekHit> = None;
        for e in self.bucket(board_key).iter().filter(|e| e.board_key == board_key) {
            let Some(stat) = e.compare_to(black_hand, turn) else {
                continue;
            };
            let hit = ShekHit { stat, ply: e.ply };
            let rank = |s: ShekStat| match s {
                ShekStat::Equal => 0,
                ShekStat::Superior => 1,
                ShekStat::Inferior => 2,
            };
            if found.is_none_or(|f| rank(stat) < rank(f.stat)) {
                found = Some(hit);
            }
        }
        found
    }

    /// 記録されている局面の数（延べ）
    pub fn len(&self) -> usize {
        self.buckets.iter().flatten().map(|e| e.count as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.is_empty())
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}

impl Default for ShekTable {
    fn default() -> ShekTable {
        ShekTable::new()
    }
}
