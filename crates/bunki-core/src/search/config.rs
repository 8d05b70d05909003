//! 探索設定

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::MAX_PLY;

/// スレッド数の上限
pub const MAX_WORKERS: usize = 256;

/// 置換表サイズの上限（MB）
pub const MAX_TT_SIZE_MB: usize = 1 << 16;

/// 探索設定
///
/// TOML などから読み込めるよう、欠けたフィールドは既定値で補う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// 反復深化の最大深さ（手数）
    pub max_depth: u32,
    /// 探索スレッド数（呼び出し元のスレッドを含む）
    pub worker_count: usize,
    /// Tree の数（ルート探索と分割探索で使う）
    pub tree_count: usize,
    /// 置換表のサイズ（MB）
    pub tt_size_mb: usize,
    /// 思考時間の上限（ミリ秒）
    pub time_limit_ms: Option<u64>,
    /// 探索ノード数の上限
    pub node_limit: Option<u64>,
    /// 先読み中（easy move で打ち切らない）
    pub pondering: bool,
    /// 深さごとの進捗を info ログに出す
    pub logging: bool,
    /// 分割探索を始める残り深さ（手数）
    pub split_min_depth: u32,
    /// aspiration window の初期幅
    pub aspiration_width: i32,
}

impl Default for SearchConfig {
    fn default() -> SearchConfig {
        SearchConfig {
            max_depth: 64,
            worker_count: 1,
            tree_count: 8,
            tt_size_mb: 16,
            time_limit_ms: None,
            node_limit: None,
            pondering: false,
            logging: false,
            split_min_depth: 4,
            aspiration_width: 128,
        }
    }
}

/// 設定エラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_depth must be in 1..={max}, got {0}", max = MAX_PLY / 2)]
    InvalidDepth(u32),

    #[error("worker_count must be in 1..={max}, got {0}", max = MAX_WORKERS)]
    InvalidWorkerCount(usize),

    #[error("tree_count ({trees}) must be at least worker_count ({workers})")]
    InvalidTreeCount { trees: usize, workers: usize },

    #[error("tt_size_mb must be in 1..={max}, got {0}", max = MAX_TT_SIZE_MB)]
    InvalidHashSize(usize),

    #[error("aspiration_width must be positive, got {0}")]
    InvalidAspiration(i32),

    #[error("split_min_depth must be at least 2, got {0}")]
    InvalidSplitDepth(u32),

    #[error("failed to spawn search worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl SearchConfig {
    /// 値の範囲を検証する
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 || self.max_depth as usize > MAX_PLY / 2 {
            return Err(ConfigError::InvalidDepth(self.max_depth));
        }
        if self.worker_count == 0 || self.worker_count > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount(self.worker_count));
        }
        if self.tree_count < self.worker_count {
            return Err(ConfigError::InvalidTreeCount {
                trees: self.tree_count,
                workers: self.worker_count,
            });
        }
        if self.tt_size_mb == 0 || self.tt_size_mb > MAX_TT_SIZE_MB {
            return Err(ConfigError::InvalidHashSize(self.tt_size_mb));
        }
        if self.aspiration_width <= 0 {
            return Err(ConfigError::InvalidAspiration(self.aspiration_width));
        }
        if self.split_min_depth < 2 {
            return Err(ConfigError::InvalidSplitDepth(self.split_min_depth));
        }
        Ok(())
    }
}
