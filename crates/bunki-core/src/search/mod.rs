//! 探索モジュール
//!
//! 反復深化・PVS と各種枝刈り、分割点による並列探索。
//!
//! - `Searcher`: 反復深化、aspiration window、スレッドプールの管理
//! - `alpha_beta` / `qsearch`: 通常探索と静止探索
//! - `tree` / `node`: スレッドごとの探索スタック
//! - `tlp` / `worker`: 分割点と探索スレッド
//! - `history` / `movepicker`: 指し手オーダリング

mod alpha_beta;
mod config;
mod history;
mod movepicker;
mod node;
mod pruning;
mod qsearch;
mod searcher;
mod shared;
mod stats;
mod tlp;
mod tree;
mod worker;

pub use config::{ConfigError, MAX_TT_SIZE_MB, MAX_WORKERS, SearchConfig};
pub use history::{HISTORY_SCALE, History};
pub use node::PvLine;
pub use searcher::{SearchHandle, Searcher};
pub use stats::{SearchDiagnostics, SearchStats};
