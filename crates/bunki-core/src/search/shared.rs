//! 全スレッドで共有する探索の状態

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

use super::config::SearchConfig;
use super::history::History;
use super::tree::{Tree, TreeParams};
use super::worker::{WorkerSlot, WorkerState};
use crate::bitboard::AttackTables;
use crate::eval::Evaluator;
use crate::mate::MateHistory;
use crate::tt::TranspositionTable;

/// 時間・ノード数の上限
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limits {
    pub start: Instant,
    pub deadline: Option<Instant>,
    pub node_limit: Option<u64>,
}

impl Limits {
    pub fn new(time_limit_ms: Option<u64>, node_limit: Option<u64>) -> Limits {
        let start = Instant::now();
        Limits {
            start,
            deadline: time_limit_ms.map(|ms| start + Duration::from_millis(ms)),
            node_limit,
        }
    }
}

/// 探索スレッド間の共有状態
pub(crate) struct SearchShared {
    pub tt: TranspositionTable,
    pub history: History,
    pub mate_history: MateHistory,
    pub evaluator: Arc<dyn Evaluator>,
    /// 中断要求（強制中断・時間切れ・ノード数超過）
    pub stop: AtomicBool,
    pub running: AtomicBool,
    /// 全 Tree の探索ノード数（まとめて加算するので概数）
    pub nodes: AtomicU64,
    pub limits: Mutex<Limits>,
    /// 探索開始時に決まる Tree の設定（協力者は仕事ごとに写す）
    pub params: Mutex<TreeParams>,
    pub slots: Vec<CachePadded<WorkerSlot>>,
    /// 使っていない Tree
    pub trees: Mutex<Vec<Box<Tree>>>,
    /// 分割点の作成と協力者の割り当てを直列化する
    pub split_lock: Mutex<()>,
    /// 待機中のスレッド数の目安（割り当てる前にロックなしで確かめる）
    pub idle: AtomicUsize,
}

impl SearchShared {
    /// スレッド 0 は呼び出し側なので探索中の状態から始める
    pub fn new(
        config: &SearchConfig,
        evaluator: Arc<dyn Evaluator>,
        tables: &Arc<AttackTables>,
    ) -> SearchShared {
        let slots = (0..config.worker_count)
            .map(|id| {
                let state = if id == 0 { WorkerState::Running } else { WorkerState::Idle };
                CachePadded::new(WorkerSlot::new(state))
            })
            .collect();
        let trees = (0..config.tree_count).map(|id| Box::new(Tree::new(id, Arc::clone(tables)))).collect();
        SearchShared {
            tt: TranspositionTable::new(config.tt_size_mb),
            history: History::new(),
            mate_history: MateHistory::new(),
            evaluator,
            stop: AtomicBool::new(false),
            running: AtomicBool::new(false),
            nodes: AtomicU64::new(0),
            limits: Mutex::new(Limits::new(None, None)),
            params: Mutex::new(TreeParams::default()),
            slots,
            trees: Mutex::new(trees),
            split_lock: Mutex::new(()),
            idle: AtomicUsize::new(config.worker_count.saturating_sub(1)),
        }
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// ノード数を加算し、上限を超えていれば中断を要求する
    pub fn add_nodes(&self, n: u64) {
        let total = self.nodes.fetch_add(n, Ordering::Relaxed) + n;
        let limits = *self.limits.lock();
        let over_nodes = limits.node_limit.is_some_and(|limit| total >= limit);
        let over_time = limits.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        if over_nodes || over_time {
            self.stop.store(true, Ordering::Relaxed);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.limits.lock().start.elapsed()
    }

    pub fn claim_tree(&self) -> Option<Box<Tree>> {
        self.trees.lock().pop()
    }

    pub fn release_tree(&self, tree: Box<Tree>) {
        self.trees.lock().push(tree);
    }
}
