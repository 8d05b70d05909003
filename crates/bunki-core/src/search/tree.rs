//! Tree（スレッドごとの探索スタック）
//!
//! 局面と ply ごとの `Node`、SHEK テーブル、詰み判定のキャッシュを持つ。
//! 手の実行と取り消しは必ず `make_move` / `unmake_move` を通し、
//! 局面・SHEK・評価値・王手の履歴を揃えて進める。

use std::sync::Arc;

use super::history::History;
use super::node::Node;
use super::shared::SearchShared;
use super::stats::SearchStats;
use super::tlp::SplitPoint;
use crate::bitboard::AttackTables;
use crate::eval::Evaluator;
use crate::mate::{MateCache, gives_mate, mate_1ply, mate_3ply};
use crate::position::Position;
use crate::see::See;
use crate::shek::{ShekStat, ShekTable};
use crate::types::{Color, Depth, MAX_PLY, Move, Value, plies};

/// 何ノードごとに時間とノード数を確かめるか
const POLL_INTERVAL: u32 = 1024;

/// 詰み判定キャッシュのサイズ（2の累乗の指数）
const MATE_CACHE_BITS: u32 = 14;

/// 探索中に変わらない設定
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    /// 分割探索を始める残り深さ
    pub split_min_depth: Depth,
    /// 協力者のいるスレッド構成か
    pub parallel: bool,
}

impl Default for TreeParams {
    fn default() -> TreeParams {
        TreeParams { split_min_depth: plies(4), parallel: false }
    }
}

pub(crate) struct Tree {
    pub id: usize,
    /// 今この Tree を使っているスレッド
    pub worker: usize,
    /// 探索開始局面
    pub root: Position,
    pub pos: Position,
    pub nodes: Vec<Node>,
    pub ply: usize,
    /// 経路上のパスの数
    pub null_depth: usize,
    pub shek: ShekTable,
    pub mate1_cache: MateCache,
    pub mate3_cache: MateCache,
    pub stats: SearchStats,
    /// 参加している最も内側の分割点
    pub split: Option<Arc<SplitPoint>>,
    pub params: TreeParams,
    poll_count: u32,
}

impl Tree {
    pub fn new(id: usize, tables: Arc<AttackTables>) -> Tree {
        let root = Position::empty(tables);
        Tree {
            id,
            worker: 0,
            pos: root.clone(),
            root,
            nodes: (0..MAX_PLY + 2).map(|_| Node::new()).collect(),
            ply: 0,
            null_depth: 0,
            shek: ShekTable::new(),
            mate1_cache: MateCache::new(MATE_CACHE_BITS),
            mate3_cache: MateCache::new(MATE_CACHE_BITS),
            stats: SearchStats::default(),
            split: None,
            params: TreeParams::default(),
            poll_count: 0,
        }
    }

    /// ルート局面から探索を始められる状態にする
    pub fn setup(&mut self, root: &Position, evaluator: &dyn Evaluator) {
        self.root = root.clone();
        self.pos = root.clone();
        self.ply = 0;
        self.null_depth = 0;
        self.shek.clear();
        self.split = None;
        self.poll_count = 0;
        for node in &mut self.nodes {
            node.clear_heuristics();
        }
        let eval = evaluator.evaluate(&self.pos);
        let in_check = self.pos.in_check();
        self.nodes[0].enter(Move::NONE, eval, in_check, false);
    }

    /// 探索をまたいで残るキャッシュと統計を消す
    pub fn clear_caches(&mut self) {
        self.mate1_cache.clear();
        self.mate3_cache.clear();
        self.stats.reset();
    }

    /// ルートから path の手を順に指して、分割点の局面を再現する
    pub fn replay(&mut self, root: &Position, path: &[Move], evaluator: &dyn Evaluator) -> bool {
        self.setup(root, evaluator);
        for &mv in path {
            if mv.is_null() {
                self.make_null_move();
            } else if !self.make_move(mv, evaluator) {
                return false;
            }
        }
        true
    }

    #[inline]
    pub fn node(&self) -> &Node {
        &self.nodes[self.ply]
    }

    #[inline]
    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.nodes[self.ply]
    }

    /// 現在のノードの MovePicker から次の手
    pub fn next_move(&mut self, see: &See<'_>, history: &History) -> Option<Move> {
        self.nodes[self.ply].picker.next(&mut self.pos, see, history)
    }

    /// 現在のノードの残りの手
    pub fn remaining_moves(&mut self, see: &See<'_>, history: &History) -> Vec<Move> {
        self.nodes[self.ply].picker.drain(&mut self.pos, see, history)
    }

    /// ルートから現在のノードまでの手（パスは NULL）
    pub fn path(&self) -> Vec<Move> {
        self.nodes[1..=self.ply].iter().map(|n| n.mv).collect()
    }

    // =========================================================================
    // 手の実行
    // =========================================================================

    /// 手を指す。非合法なら何もせず false
    pub fn make_move(&mut self, mv: Move, evaluator: &dyn Evaluator) -> bool {
        let turn = self.pos.side_to_move();
        let board_key = self.pos.board_key();
        let black_hand = self.pos.hand(Color::Black);
        self.shek.set(board_key, black_hand, turn, self.ply as u16);
        if !self.pos.do_move(mv) {
            self.shek.unset(board_key, black_hand, turn);
            self.stats.rejected_moves += 1;
            return false;
        }
        let last = self.pos.last_move().unwrap_or(mv);
        let eval = evaluator.update(self.nodes[self.ply].eval, &self.pos, last);
        self.ply += 1;
        let null = self.null_depth > 0;
        let in_check = self.pos.in_check();
        self.nodes[self.ply].enter(last, eval, in_check, null);
        true
    }

    pub fn unmake_move(&mut self) {
        self.pos.undo_move();
        self.ply -= 1;
        let black_hand = self.pos.hand(Color::Black);
        self.shek.unset(self.pos.board_key(), black_hand, self.pos.side_to_move());
    }

    pub fn make_null_move(&mut self) {
        self.pos.do_null_move();
        let eval = self.nodes[self.ply].eval;
        self.ply += 1;
        self.null_depth += 1;
        let in_check = self.pos.in_check();
        self.nodes[self.ply].enter(Move::NULL, eval, in_check, true);
    }

    pub fn unmake_null_move(&mut self) {
        self.pos.undo_null_move();
        self.ply -= 1;
        self.null_depth -= 1;
    }

    // =========================================================================
    // 中断
    // =========================================================================

    /// 中断要求か、参加している分割点（祖先を含む）の打ち切り
    #[inline]
    pub fn interrupted(&self, shared: &SearchShared) -> bool {
        shared.is_stopped() || self.split.as_ref().is_some_and(|sp| sp.is_stopped())
    }

    /// ノードを1つ数え、一定間隔で時間とノード数を確かめる
    pub fn poll(&mut self, shared: &SearchShared) -> bool {
        self.poll_count += 1;
        if self.poll_count >= POLL_INTERVAL {
            shared.add_nodes(u64::from(self.poll_count));
            self.poll_count = 0;
        }
        self.interrupted(shared)
    }

    /// 数えかけのノード数を共有カウンタへ反映する
    pub fn flush_nodes(&mut self, shared: &SearchShared) {
        if self.poll_count > 0 {
            shared.add_nodes(u64::from(self.poll_count));
            self.poll_count = 0;
        }
    }

    // =========================================================================
    // SHEK
    // =========================================================================

    /// 経路上の局面との同一・優劣による値
    ///
    /// パスの後の部分木では判定しない。
    pub fn shek_value(&mut self) -> Option<Value> {
        if self.ply == 0 || self.node().null {
            return None;
        }
        let hit = self.shek.check(
            self.pos.board_key(),
            self.pos.hand(Color::Black),
            self.pos.side_to_move(),
        )?;
        self.stats.shek_hits += 1;
        let ply = self.ply as i32;
        Some(match hit.stat {
            ShekStat::Superior => Value::win_in(ply),
            ShekStat::Inferior => Value::lose_in(ply),
            ShekStat::Equal => self.repetition_value(hit.ply as usize),
        })
    }

    /// 同一局面の繰り返しの値
    ///
    /// 以前の局面以降、一方が王手をかけ続けていればかけた側の負け。
    fn repetition_value(&self, earlier: usize) -> Value {
        let current = self.ply;
        let range = earlier + 1..=current;
        let own_checked = range
            .clone()
            .filter(|i| (current - i) % 2 == 0)
            .all(|i| self.nodes[i].in_check);
        let opponent_checked =
            range.filter(|i| (current - i) % 2 == 1).all(|i| self.nodes[i].in_check);
        let ply = self.ply as i32;
        if own_checked {
            Value::win_in(ply)
        } else if opponent_checked {
            Value::lose_in(ply)
        } else {
            Value::DRAW
        }
    }

    // =========================================================================
    // 詰み判定
    // =========================================================================

    /// 1手詰め（キャッシュと統計で判定を省く）
    pub fn probe_mate_1ply(&mut self, shared: &SearchShared) -> Option<Move> {
        let key = self.pos.key();
        if let Some(result) = self.mate1_cache.get(key) {
            return result.filter(|&mv| self.pos.is_pseudo_legal(mv));
        }
        if !shared.mate_history.is_worth_probing(&self.pos) {
            return None;
        }
        self.stats.mate1_probes += 1;
        let result = mate_1ply(&mut self.pos);
        shared.mate_history.record(&self.pos, result.is_some());
        self.mate1_cache.set(key, result);
        if result.is_some() {
            self.stats.mate1_hits += 1;
        }
        result
    }

    /// 3手詰め。初手と詰みまでの手数を返す
    ///
    /// 初手で詰んでいれば手数は 1。
    pub fn probe_mate_3ply(&mut self, shared: &SearchShared) -> Option<(Move, i32)> {
        let key = self.pos.key();
        let result = match self.mate3_cache.get(key) {
            Some(result) => result.filter(|&mv| self.pos.is_pseudo_legal(mv)),
            None => {
                if !shared.mate_history.is_worth_probing(&self.pos) {
                    return None;
                }
                self.stats.mate3_probes += 1;
                let result = mate_3ply(&mut self.pos);
                shared.mate_history.record(&self.pos, result.is_some());
                self.mate3_cache.set(key, result);
                if result.is_some() {
                    self.stats.mate3_hits += 1;
                }
                result
            }
        }?;
        let distance = if gives_mate(&mut self.pos, result) { 1 } else { 3 };
        Some((result, distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::MaterialEvaluator;

    fn tree_at(sfen: &str) -> Tree {
        let tables = Arc::new(AttackTables::new());
        let pos = Position::from_sfen(sfen, Arc::clone(&tables)).unwrap();
        let mut tree = Tree::new(0, tables);
        tree.setup(&pos, &MaterialEvaluator::new());
        tree
    }

    fn play(tree: &mut Tree, usi: &str) {
        let mv = tree.pos.parse_usi_move(usi).unwrap();
        assert!(tree.make_move(mv, &MaterialEvaluator::new()), "{usi}");
    }

    #[test]
    fn test_make_unmake_keeps_shek_in_lockstep() {
        let mut tree = tree_at(crate::position::SFEN_HIRATE);
        let key = tree.pos.key();
        play(&mut tree, "7g7f");
        play(&mut tree, "3c3d");
        assert_eq!(tree.ply, 2);
        assert_eq!(tree.shek.len(), 2);
        assert_eq!(tree.path().len(), 2);
        tree.unmake_move();
        tree.unmake_move();
        assert_eq!(tree.ply, 0);
        assert!(tree.shek.is_empty());
        assert_eq!(tree.pos.key(), key);
    }

    #[test]
    fn test_rejected_move_leaves_tree_unchanged() {
        // 5八の金は角にピンされている
        let mut tree = tree_at("4k4/9/9/9/b8/9/9/3G5/4K4 b - 1");
        let mv = tree.pos.parse_usi_move("6h6g").unwrap();
        assert!(!tree.make_move(mv, &MaterialEvaluator::new()));
        assert_eq!(tree.ply, 0);
        assert!(tree.shek.is_empty());
        assert_eq!(tree.stats.rejected_moves, 1);
    }

    #[test]
    fn test_repetition_is_draw() {
        let mut tree = tree_at("4k4/9/9/9/9/9/9/9/G3K4 b - 1");
        for usi in ["9i9h", "5a4a", "9h9i", "4a5a"] {
            assert!(tree.shek_value().is_none());
            play(&mut tree, usi);
        }
        assert_eq!(tree.shek_value(), Some(Value::DRAW));
    }

    #[test]
    fn test_perpetual_check_loses() {
        // 先手の飛車が九筋から王手をかけ続ける
        let mut tree = tree_at("8k/R8/9/9/9/9/9/9/4K4 b - 1");
        for usi in ["9b9a", "1a1b", "9a9b", "1b1a"] {
            play(&mut tree, usi);
        }
        // 王手をかけ続けた側の手番で同一局面
        assert_eq!(tree.shek_value(), Some(Value::lose_in(4)));
        play(&mut tree, "9b9a");
        assert!(tree.pos.in_check());
        assert_eq!(tree.shek_value(), Some(Value::win_in(5)));
    }

    #[test]
    fn test_superior_position() {
        // 先手が歩を取り、後手が歩を打ち直して盤面だけ元に戻る
        let mut tree = tree_at("8k/9/4p4/9/9/4R4/9/9/4K4 b p 1");
        for usi in ["5f5c", "1a1b", "5c5d", "P*5c", "5d5f", "1b1a"] {
            play(&mut tree, usi);
        }
        assert_eq!(tree.shek_value(), Some(Value::win_in(6)));

        // パスの後の部分木では判定しない
        tree.make_null_move();
        assert!(tree.shek_value().is_none());
        tree.unmake_null_move();
        assert_eq!(tree.null_depth, 0);
    }

    #[test]
    fn test_mate_3ply_reports_immediate_mate() {
        let tables = Arc::new(AttackTables::new());
        let config = crate::search::SearchConfig { tt_size_mb: 1, tree_count: 1, ..Default::default() };
        let shared = SearchShared::new(&config, Arc::new(MaterialEvaluator::new()), &tables);
        let pos = Position::from_sfen("8k/9/8P/9/9/9/9/9/K8 b G 1", Arc::clone(&tables)).unwrap();
        let mut tree = Tree::new(0, tables);
        tree.setup(&pos, &MaterialEvaluator::new());

        let (mv, distance) = tree.probe_mate_3ply(&shared).unwrap();
        assert_eq!(distance, 1);
        assert!(gives_mate(&mut tree.pos, mv));
        // キャッシュからでも同じ手数
        assert_eq!(tree.probe_mate_3ply(&shared), Some((mv, 1)));
        assert_eq!(tree.stats.mate3_probes, 1);
    }

    #[test]
    fn test_replay_reproduces_position() {
        let tables = Arc::new(AttackTables::new());
        let root = Position::startpos(Arc::clone(&tables));
        let eval = MaterialEvaluator::new();
        let mut master = Tree::new(0, Arc::clone(&tables));
        master.setup(&root, &eval);
        for usi in ["7g7f", "3c3d", "8h2b+"] {
            let mv = master.pos.parse_usi_move(usi).unwrap();
            assert!(master.make_move(mv, &eval));
        }
        master.make_null_move();

        let mut helper = Tree::new(1, tables);
        assert!(helper.replay(&master.root, &master.path(), &eval));
        assert_eq!(helper.ply, master.ply);
        assert_eq!(helper.pos.key(), master.pos.key());
        assert_eq!(helper.null_depth, 1);
        assert_eq!(helper.node().eval, master.node().eval);
        assert_eq!(helper.shek.len(), master.shek.len());
    }
}
