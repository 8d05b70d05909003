//! 分割点（SplitPoint）
//!
//! 分割したノードの残りの手を親（master）と協力者（helper）で分け合って探索する。
//! 窓と最善値はロックで守り、beta cutoff が起きたら `shutdown` を立てる。
//! 各 Tree は参加している分割点から祖先をたどって打ち切りを確かめるので、
//! 打ち切られたノードの子孫もすべて止まる。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::alpha_beta::{LoopState, MoveContext};
use super::shared::SearchShared;
use crate::position::Position;
use crate::types::{Move, Value};

struct SplitState {
    moves: Vec<Move>,
    next: usize,
    result: LoopState,
}

pub(crate) struct SplitPoint {
    parent: Option<Arc<SplitPoint>>,
    /// 分割したスレッド
    pub master: usize,
    shutdown: AtomicBool,
    /// 探索中の協力者の数
    children: AtomicUsize,
    /// 分割した Tree のルート局面
    pub root: Position,
    /// ルートから分割点までの手
    pub path: Vec<Move>,
    pub context: MoveContext,
    state: Mutex<SplitState>,
}

impl SplitPoint {
    pub fn new(
        parent: Option<Arc<SplitPoint>>,
        master: usize,
        root: Position,
        path: Vec<Move>,
        context: MoveContext,
        moves: Vec<Move>,
        result: LoopState,
    ) -> SplitPoint {
        SplitPoint {
            parent,
            master,
            shutdown: AtomicBool::new(false),
            children: AtomicUsize::new(0),
            root,
            path,
            context,
            state: Mutex::new(SplitState { moves, next: 0, result }),
        }
    }

    /// この分割点か祖先が打ち切られたか
    pub fn is_stopped(&self) -> bool {
        let mut sp = Some(self);
        while let Some(p) = sp {
            if p.shutdown.load(Ordering::Acquire) {
                return true;
            }
            sp = p.parent.as_deref();
        }
        false
    }

    /// ancestor の子孫の分割点か
    pub fn descends_from(&self, ancestor: &Arc<SplitPoint>) -> bool {
        let mut sp = self.parent.as_ref();
        while let Some(p) = sp {
            if Arc::ptr_eq(p, ancestor) {
                return true;
            }
            sp = p.parent.as_ref();
        }
        false
    }

    /// 次に探索する手と、それまでに試した手の数、現在の alpha
    ///
    /// 試した手の数は枝刈りか探索の結果を返したときに増える。非合法手は数えない。
    pub fn next_move(&self) -> Option<(Move, usize, Value)> {
        let mut st = self.state.lock();
        if st.result.cutoff {
            return None;
        }
        let mv = *st.moves.get(st.next)?;
        st.next += 1;
        Some((mv, st.result.move_count, st.result.alpha))
    }

    /// 枝刈りした手を数える
    pub fn record_pruned(&self) {
        self.state.lock().result.move_count += 1;
    }

    /// 探索結果を反映する。beta cutoff なら打ち切りを立てて true
    pub fn report(&self, mv: Move, value: Value, pv: &[Move], historical: bool) -> bool {
        let mut st = self.state.lock();
        st.result.move_count += 1;
        st.result.searched += 1;
        if !mv.is_tactical() {
            st.result.quiets.push(mv);
        }
        let cutoff = st.result.update(mv, value, self.context.beta, pv, historical);
        if cutoff {
            self.shutdown.store(true, Ordering::Release);
        }
        cutoff
    }

    /// 全員が抜けた後の結果
    pub fn take_result(&self) -> LoopState {
        std::mem::take(&mut self.state.lock().result)
    }

    #[inline]
    pub fn add_child(&self) {
        self.children.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn children(&self) -> usize {
        self.children.load(Ordering::Acquire)
    }

    /// 協力者が抜けたことを親に知らせる
    pub fn child_finished(&self, shared: &SearchShared) {
        self.children.fetch_sub(1, Ordering::AcqRel);
        let slot = &shared.slots[self.master];
        let _state = slot.state.lock();
        slot.cond.notify_all();
    }
}
