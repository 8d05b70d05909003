//! 探索深さ（Depth）
//!
//! 延長・削減を1手未満の単位で扱うため、1手を `ONE_PLY` 単位で表す。

/// 探索深さ
pub type Depth = i32;

/// 1手分の深さ
pub const ONE_PLY: Depth = 4;

/// 探索木の最大手数（Tree のスタック上限）
pub const MAX_PLY: usize = 128;

/// 手数を深さに変換
#[inline]
pub const fn plies(n: i32) -> Depth {
    n * ONE_PLY
}

// 定数間の関係をコンパイル時に検証する
const _: () = {
    assert!(ONE_PLY > 0);
    assert!(MAX_PLY < 256);
};
