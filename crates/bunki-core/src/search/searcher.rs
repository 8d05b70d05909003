//! Searcher（反復深化とスレッドプールの管理）

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use super::alpha_beta::{NodeStat, search};
use super::config::{ConfigError, SearchConfig};
use super::node::PvLine;
use super::shared::{Limits, SearchShared};
use super::stats::{SearchDiagnostics, SearchStats};
use super::tree::{Tree, TreeParams};
use super::worker;
use crate::bitboard::AttackTables;
use crate::eval::Evaluator;
use crate::position::{MoveList, Position};
use crate::see::See;
use crate::types::{Depth, Move, ONE_PLY, Value, plies};

/// 失敗するたびに aspiration window を何倍に広げるか
const ASPIRATION_GROWTH: i32 = 4;

/// 最善手が何回続けて変わらなければ easy move とみなすか
const EASY_MOVE_STABLE_DEPTHS: u32 = 3;

/// ルートの手
#[derive(Debug, Clone)]
struct RootMove {
    mv: Move,
    pv: PvLine,
}

/// 完了した反復の結果
#[derive(Debug, Clone)]
struct Iteration {
    depth: u32,
    value: Value,
    /// alpha を超える手がなければルートの先頭の手
    best: Move,
    pv: PvLine,
}

/// 別スレッドから探索を止めるためのハンドル
#[derive(Clone)]
pub struct SearchHandle {
    shared: Arc<SearchShared>,
}

impl SearchHandle {
    /// 探索中なら中断を要求する
    pub fn force_interrupt(&self) {
        self.shared.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

/// 並列探索エンジン
///
/// ```no_run
/// use std::sync::Arc;
/// use bunki_core::eval::MaterialEvaluator;
/// use bunki_core::position::Position;
/// use bunki_core::search::{SearchConfig, Searcher};
/// use bunki_core::types::{Move, Value};
///
/// let config = SearchConfig { max_depth: 6, worker_count: 4, ..SearchConfig::default() };
/// let mut searcher = Searcher::new(config, Arc::new(MaterialEvaluator::new())).unwrap();
/// let pos = Position::startpos(Arc::clone(searcher.tables()));
/// let mut best = Move::NONE;
/// if searcher.idsearch(&pos, &mut best, -Value::INFINITE, Value::INFINITE) {
///     println!("bestmove {}", best.to_usi());
/// }
/// ```
pub struct Searcher {
    config: SearchConfig,
    tables: Arc<AttackTables>,
    shared: Arc<SearchShared>,
    threads: Vec<JoinHandle<()>>,
    diagnostics: SearchDiagnostics,
}

impl Searcher {
    pub fn new(config: SearchConfig, evaluator: Arc<dyn Evaluator>) -> Result<Searcher, ConfigError> {
        Self::with_tables(config, evaluator, Arc::new(AttackTables::new()))
    }

    /// 既存の利き表を共有して作る
    pub fn with_tables(
        config: SearchConfig,
        evaluator: Arc<dyn Evaluator>,
        tables: Arc<AttackTables>,
    ) -> Result<Searcher, ConfigError> {
        config.validate()?;
        let shared = Arc::new(SearchShared::new(&config, evaluator, &tables));
        let threads = worker::spawn_helpers(&shared)?;
        log::debug!(
            "searcher ready: {} workers, {} trees, {} MB hash",
            config.worker_count,
            config.tree_count,
            config.tt_size_mb
        );
        Ok(Searcher { config, tables, shared, threads, diagnostics: SearchDiagnostics::default() })
    }

    pub fn tables(&self) -> &Arc<AttackTables> {
        &self.tables
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// 直近の探索の結果と統計
    pub fn diagnostics(&self) -> &SearchDiagnostics {
        &self.diagnostics
    }

    pub fn handle(&self) -> SearchHandle {
        SearchHandle { shared: Arc::clone(&self.shared) }
    }

    pub fn force_interrupt(&self) {
        self.handle().force_interrupt();
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// 設定を変える
    ///
    /// スレッド数・Tree の数・置換表のサイズが変わる場合はプールを作り直すので、
    /// 置換表と History も空になる。
    pub fn set_config(&mut self, config: SearchConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let rebuild = config.worker_count != self.config.worker_count
            || config.tree_count != self.config.tree_count
            || config.tt_size_mb != self.config.tt_size_mb;
        if rebuild {
            worker::shutdown(&self.shared, std::mem::take(&mut self.threads));
            let evaluator = Arc::clone(&self.shared.evaluator);
            self.shared = Arc::new(SearchShared::new(&config, evaluator, &self.tables));
            self.threads = worker::spawn_helpers(&self.shared)?;
            log::debug!("rebuilt search pool for {} workers", config.worker_count);
        }
        self.config = config;
        Ok(())
    }

    /// 置換表・History・詰み判定のキャッシュを消す
    pub fn clear(&mut self) {
        self.shared.tt.clear();
        self.shared.history.clear();
        self.shared.mate_history.clear();
        for tree in self.shared.trees.lock().iter_mut() {
            tree.clear_caches();
        }
        self.diagnostics = SearchDiagnostics::default();
    }

    /// 反復深化で探索する
    ///
    /// 完了した最も深い反復の最善手を `best` に書く。合法手がない、負けが確定した、
    /// または深さ 1 を終える前に中断された場合は false。
    ///
    /// 値が呼び出し側の alpha を超えなかった場合も、並べ替えたルートの先頭の手を
    /// `best` に書く（値は alpha 以下の上界）。
    pub fn idsearch(&mut self, pos: &Position, best: &mut Move, alpha: Value, beta: Value) -> bool {
        let shared = Arc::clone(&self.shared);
        shared.stop.store(false, Ordering::Relaxed);
        shared.nodes.store(0, Ordering::Relaxed);
        *shared.limits.lock() = Limits::new(self.config.time_limit_ms, self.config.node_limit);
        let params = TreeParams {
            split_min_depth: plies(self.config.split_min_depth as i32),
            parallel: self.config.worker_count > 1,
        };
        *shared.params.lock() = params;
        shared.history.reduce();
        shared.mate_history.reduce();
        shared.tt.evolve();

        let Some(mut tree) = shared.claim_tree() else {
            log::warn!("no tree available for the root search");
            return false;
        };
        shared.running.store(true, Ordering::Release);
        tree.worker = 0;
        tree.params = params;
        tree.setup(pos, shared.evaluator.as_ref());

        let completed = self.iterate(&mut tree, &shared, alpha, beta);
        let interrupted = tree.interrupted(&shared);
        tree.flush_nodes(&shared);
        shared.release_tree(tree);
        shared.running.store(false, Ordering::Release);

        self.diagnostics = self.collect(completed.as_ref(), interrupted);
        match completed {
            Some(it) => {
                *best = it.best;
                it.value > -Value::WIN_IN_MAX_PLY
            }
            None => false,
        }
    }

    fn iterate(
        &self,
        tree: &mut Tree,
        shared: &SearchShared,
        alpha: Value,
        beta: Value,
    ) -> Option<Iteration> {
        let mut root_moves = order_root_moves(tree, shared);
        if root_moves.is_empty() {
            log::debug!("no legal moves at the root");
            return None;
        }

        let width = self.config.aspiration_width;
        let widths = [width, width.saturating_mul(ASPIRATION_GROWTH)];
        let easy_allowed = self.config.time_limit_ms.is_some() && !self.config.pondering;
        let mut completed: Option<Iteration> = None;
        let mut prev = Value::ZERO;
        let mut last_best = Move::NONE;
        let mut stable = 0;

        'deepening: for d in 1..=self.config.max_depth {
            let depth = plies(d as i32);
            let mut attempt = 0;
            let value = loop {
                let (a, b) = match widths.get(attempt) {
                    Some(&w) if d > 1 && !prev.is_decisive() => (
                        Value::new((prev.raw() - w).max(alpha.raw())),
                        Value::new((prev.raw() + w).min(beta.raw())),
                    ),
                    _ => (alpha, beta),
                };
                let value = search_root(tree, shared, &mut root_moves, depth, a, b);
                if tree.interrupted(shared) {
                    break 'deepening;
                }
                if (value <= a && a > alpha) || (value >= b && b < beta) {
                    log::debug!("depth {d}: aspiration [{a}, {b}] failed with {value}");
                    attempt += 1;
                    continue;
                }
                break value;
            };

            let best_move = root_moves[0].mv;
            completed =
                Some(Iteration { depth: d, value, best: best_move, pv: root_moves[0].pv.clone() });
            if self.config.logging {
                log::info!(
                    "depth {d} score {value} nodes {} time {}ms pv {}",
                    shared.nodes.load(Ordering::Relaxed),
                    shared.elapsed().as_millis(),
                    format_pv(&root_moves[0].pv)
                );
            }

            if value <= alpha || value >= beta || value.is_mate_score() {
                break;
            }
            if best_move == last_best {
                stable += 1;
            } else {
                stable = 0;
                last_best = best_move;
            }
            if easy_allowed {
                if root_moves.len() == 1 {
                    log::debug!("single legal move at the root");
                    break;
                }
                let quarter = self.config.time_limit_ms.unwrap_or(0) / 4;
                if stable >= EASY_MOVE_STABLE_DEPTHS && shared.elapsed().as_millis() as u64 >= quarter {
                    log::debug!("easy move {} after depth {d}", best_move.to_usi());
                    break;
                }
            }
            prev = value;
        }
        completed
    }

    /// Tree ごとの統計をまとめる
    fn collect(&self, completed: Option<&Iteration>, interrupted: bool) -> SearchDiagnostics {
        let mut stats = SearchStats::default();
        for tree in self.shared.trees.lock().iter_mut() {
            stats.merge(&tree.stats);
            tree.stats.reset();
        }
        let elapsed_ms = self.shared.elapsed().as_millis() as u64;
        let nodes = stats.nodes + stats.qnodes;
        SearchDiagnostics {
            depth: completed.map_or(0, |it| it.depth),
            value: completed.map_or(0, |it| it.value.raw()),
            best_move: completed.map(|it| it.best.to_usi()),
            pv: completed.map_or_else(Vec::new, |it| it.pv.iter().map(|mv| mv.to_usi()).collect()),
            elapsed_ms,
            nps: nodes * 1000 / elapsed_ms.max(1),
            hashfull: self.shared.tt.hashfull(),
            interrupted,
            stats,
        }
    }
}

impl Drop for Searcher {
    fn drop(&mut self) {
        worker::shutdown(&self.shared, std::mem::take(&mut self.threads));
    }
}

/// ルートの合法手を並べる（取る手は SEE 順、他は History 順）
fn order_root_moves(tree: &mut Tree, shared: &SearchShared) -> Vec<RootMove> {
    let see = See::new(shared.evaluator.as_ref());
    let mut list = MoveList::new();
    tree.pos.generate_legal(&mut list);
    let mut scored: Vec<(i32, Move)> = list
        .into_iter()
        .map(|mv| {
            let score = if mv.is_capture() {
                (1 << 16) + see.evaluate(&tree.pos, mv, false)
            } else {
                shared.history.goodness(mv) as i32
            };
            (score, mv)
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .map(|(_, mv)| RootMove { mv, pv: PvLine::new() })
        .collect()
}

/// ルートの探索
///
/// alpha を更新した手を先頭へ移す。ルートでは分割しない。
fn search_root(
    tree: &mut Tree,
    shared: &SearchShared,
    root_moves: &mut [RootMove],
    depth: Depth,
    alpha: Value,
    beta: Value,
) -> Value {
    let evaluator = Arc::clone(&shared.evaluator);
    let mut alpha = alpha;
    let mut best = -Value::INFINITE;
    for i in 0..root_moves.len() {
        let mv = root_moves[i].mv;
        let extension = if tree.pos.gives_check(mv) { ONE_PLY } else { 0 };
        let new_depth = depth - ONE_PLY + extension;
        if !tree.make_move(mv, evaluator.as_ref()) {
            continue;
        }
        let mut value;
        if i == 0 {
            value = -search(tree, shared, new_depth, -beta, -alpha, NodeStat::default());
        } else {
            value = -search(tree, shared, new_depth, -(alpha + 1), -alpha, NodeStat::default());
            if value > alpha && value < beta && !tree.interrupted(shared) {
                value = -search(tree, shared, new_depth, -beta, -alpha, NodeStat::default());
            }
        }
        let child_pv = tree.nodes[tree.ply].pv.clone();
        tree.unmake_move();
        if tree.interrupted(shared) {
            break;
        }
        best = best.max(value);
        if value > alpha {
            alpha = value;
            let rm = &mut root_moves[i];
            rm.pv.clear();
            rm.pv.push(mv);
            rm.pv.extend_from_slice(&child_pv);
            root_moves[..=i].rotate_right(1);
            if value >= beta {
                break;
            }
        }
    }
    best
}

fn format_pv(pv: &[Move]) -> String {
    pv.iter().map(|mv| mv.to_usi()).collect::<Vec<_>>().join(" ")
}
