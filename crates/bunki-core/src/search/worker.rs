//! 探索スレッド
//!
//! スレッド 0 は `idsearch` を呼んだスレッドそのもので、ルートから探索する。
//! それ以外のスレッドは待機ループで分割点への割り当てを待つ。
//!
//! 分割点の親は協力者が抜けるのを待つ間も遊ばず、自分の分割点の子孫に
//! 限って協力者として割り当てを受ける（helpful master）。

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::alpha_beta::search_split;
use super::config::ConfigError;
use super::shared::SearchShared;
use super::tlp::SplitPoint;
use super::tree::Tree;

/// 探索スレッドのスタックサイズ
const WORKER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// 分割点の手を探索する仕事
pub(crate) struct Job {
    tree: Box<Tree>,
    split: Arc<SplitPoint>,
}

pub(crate) enum WorkerState {
    Idle,
    Running,
    /// 自分の分割点の協力者を待っている
    Waiting(Arc<SplitPoint>),
    Assigned(Job),
    Exit,
}

pub(crate) struct WorkerSlot {
    pub state: Mutex<WorkerState>,
    pub cond: Condvar,
}

impl WorkerSlot {
    pub fn new(state: WorkerState) -> WorkerSlot {
        WorkerSlot { state: Mutex::new(state), cond: Condvar::new() }
    }
}

/// スレッド 0 以外の探索スレッドを起動する
pub(crate) fn spawn_helpers(shared: &Arc<SearchShared>) -> Result<Vec<JoinHandle<()>>, ConfigError> {
    let mut threads = Vec::with_capacity(shared.slots.len().saturating_sub(1));
    for id in 1..shared.slots.len() {
        let worker_shared = Arc::clone(shared);
        let spawned = thread::Builder::new()
            .name(format!("bunki-worker-{id}"))
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || idle_loop(worker_shared, id));
        match spawned {
            Ok(handle) => threads.push(handle),
            Err(e) => {
                log::error!("failed to spawn worker {id}: {e}");
                shutdown(shared, threads);
                return Err(ConfigError::Spawn(e));
            }
        }
    }
    log::debug!("spawned {} helper threads", threads.len());
    Ok(threads)
}

/// 待機中のスレッドに終了を伝えて合流する
pub(crate) fn shutdown(shared: &SearchShared, threads: Vec<JoinHandle<()>>) {
    for slot in shared.slots.iter().skip(1) {
        *slot.state.lock() = WorkerState::Exit;
        slot.cond.notify_all();
    }
    for handle in threads {
        if handle.join().is_err() {
            log::error!("worker thread panicked outside a search job");
        }
    }
}

fn idle_loop(shared: Arc<SearchShared>, id: usize) {
    let slot = &shared.slots[id];
    let mut state = slot.state.lock();
    loop {
        match std::mem::replace(&mut *state, WorkerState::Running) {
            WorkerState::Assigned(job) => {
                MutexGuard::unlocked(&mut state, || run_job(&shared, id, job));
                if matches!(*state, WorkerState::Running) {
                    *state = WorkerState::Idle;
                    shared.idle.fetch_add(1, Ordering::AcqRel);
                }
            }
            WorkerState::Exit => {
                *state = WorkerState::Exit;
                return;
            }
            other => {
                *state = other;
                slot.cond.wait(&mut state);
            }
        }
    }
}

/// 分割点の局面を再現して残りの手を探索する
///
/// 探索中の panic はこのスレッドで止め、分割点には抜けたことだけを伝える。
fn run_job(shared: &SearchShared, id: usize, job: Job) {
    let Job { tree, split } = job;
    let sp = Arc::clone(&split);
    let result = panic::catch_unwind(AssertUnwindSafe(move || {
        let mut tree = tree;
        tree.worker = id;
        tree.params = *shared.params.lock();
        log::trace!("worker {id} joins a split at ply {} with tree {}", sp.path.len(), tree.id);
        if tree.replay(&sp.root, &sp.path, shared.evaluator.as_ref()) {
            tree.split = Some(Arc::clone(&sp));
            tree.stats.helped += 1;
            search_split(&mut tree, shared, &sp);
        } else {
            log::warn!("worker {id}: could not replay split path of {} moves", sp.path.len());
        }
        tree.flush_nodes(shared);
        tree.split = None;
        tree
    }));
    match result {
        Ok(tree) => shared.release_tree(tree),
        Err(_) => log::error!("worker {id}: split search panicked, tree discarded"),
    }
    split.child_finished(shared);
}

/// 空いているスレッドを分割点に割り当てる
///
/// 待機中のスレッドか、この分割点の祖先を待っているスレッドが対象。
/// 割り当てた数を返す。
pub(crate) fn recruit(shared: &SearchShared, split: &Arc<SplitPoint>) -> usize {
    let _guard = shared.split_lock.lock();
    let mut count = 0;
    for (id, slot) in shared.slots.iter().enumerate() {
        if id == split.master {
            continue;
        }
        let mut state = slot.state.lock();
        let eligible = match &*state {
            WorkerState::Idle => true,
            WorkerState::Waiting(waiting) => split.descends_from(waiting),
            _ => false,
        };
        if !eligible {
            continue;
        }
        let Some(tree) = shared.claim_tree() else {
            break;
        };
        split.add_child();
        *state = WorkerState::Assigned(Job { tree, split: Arc::clone(split) });
        shared.idle.fetch_sub(1, Ordering::AcqRel);
        slot.cond.notify_all();
        count += 1;
    }
    count
}

/// 協力者がすべて抜けるまで待つ。その間に割り当てられた仕事は自分で探索する
pub(crate) fn wait_for_helpers(shared: &SearchShared, worker: usize, split: &Arc<SplitPoint>) {
    let slot = &shared.slots[worker];
    let mut state = slot.state.lock();
    loop {
        if let WorkerState::Assigned(job) = std::mem::replace(&mut *state, WorkerState::Running) {
            MutexGuard::unlocked(&mut state, || run_job(shared, worker, job));
            continue;
        }
        if split.children() == 0 {
            break;
        }
        *state = WorkerState::Waiting(Arc::clone(split));
        shared.idle.fetch_add(1, Ordering::AcqRel);
        slot.cond.wait(&mut state);
        if matches!(*state, WorkerState::Waiting(_)) {
            shared.idle.fetch_sub(1, Ordering::AcqRel);
        }
    }
    *state = WorkerState::Running;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::MaterialEvaluator;
    use crate::search::SearchConfig;

    fn shared(workers: usize, trees: usize) -> Arc<SearchShared> {
        let config = SearchConfig { worker_count: workers, tree_count: trees, ..SearchConfig::default() };
        let tables = Arc::new(crate::bitboard::AttackTables::new());
        Arc::new(SearchShared::new(&config, Arc::new(MaterialEvaluator::new()), &tables))
    }

    #[test]
    fn test_helpers_exit_on_shutdown() {
        let shared = shared(3, 3);
        let threads = spawn_helpers(&shared).unwrap();
        assert_eq!(threads.len(), 2);
        shutdown(&shared, threads);
        for slot in shared.slots.iter().skip(1) {
            assert!(matches!(*slot.state.lock(), WorkerState::Exit));
        }
    }

    #[test]
    fn test_recruit_skips_busy_workers() {
        let shared = shared(3, 3);
        *shared.slots[2].state.lock() = WorkerState::Running;
        let root = crate::position::Position::startpos(Arc::new(crate::bitboard::AttackTables::new()));
        let ctx = crate::search::alpha_beta::MoveContext {
            depth: crate::types::plies(4),
            beta: crate::types::Value::new(1),
            in_check: false,
            stand_pat: crate::types::Value::ZERO,
            hash_move: crate::types::Move::NONE,
            singular: false,
            mate_threat: false,
            pv: false,
            one_reply: false,
            killers: [crate::types::Move::NONE; 2],
            recapture: None,
        };
        let split = Arc::new(SplitPoint::new(
            None,
            0,
            root,
            Vec::new(),
            ctx,
            Vec::new(),
            Default::default(),
        ));
        // スレッドを起動していないので割り当ては状態に残る
        assert_eq!(recruit(&shared, &split), 1);
        assert_eq!(split.children(), 1);
        assert!(matches!(*shared.slots[1].state.lock(), WorkerState::Assigned(_)));
        assert_eq!(shared.trees.lock().len(), 2);
    }
}
