//! 探索全体の結合テスト

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bunki_core::eval::MaterialEvaluator;
use bunki_core::position::{Position, SFEN_HIRATE};
use bunki_core::search::{SearchConfig, Searcher};
use bunki_core::types::{Move, Value};

/// 1手詰めの局面
const MATE_IN_ONE: &[&str] = &[
    "4k4/9/4P4/9/9/9/9/9/4K4 b G 1",
    "8k/9/8P/9/9/9/9/9/K8 b G 1",
    "8k/7pp/9/9/9/9/9/9/K8 b R 1",
];

/// 序盤の局面（平手から数手）
const OPENING: &str = "lnsgkgsnl/1r5b1/ppppppp1p/7p1/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL b - 5";

fn searcher(config: SearchConfig) -> Searcher {
    Searcher::new(config, Arc::new(MaterialEvaluator::new())).unwrap()
}

/// mv を指すと相手が詰んでいるか
fn mates(searcher: &Searcher, sfen: &str, mv: Move) -> bool {
    let mut pos = Position::from_sfen(sfen, Arc::clone(searcher.tables())).unwrap();
    if !pos.is_legal(mv) || !pos.do_move(mv) {
        return false;
    }
    pos.in_check() && !pos.has_legal_move()
}

fn search(searcher: &mut Searcher, sfen: &str) -> (bool, Move) {
    let pos = Position::from_sfen(sfen, Arc::clone(searcher.tables())).unwrap();
    let mut best = Move::NONE;
    let ok = searcher.idsearch(&pos, &mut best, -Value::INFINITE, Value::INFINITE);
    (ok, best)
}

#[test]
fn test_single_thread_is_deterministic() {
    let config = SearchConfig { max_depth: 4, ..SearchConfig::default() };
    let mut a = searcher(config.clone());
    let mut b = searcher(config);

    let (ok_a, best_a) = search(&mut a, OPENING);
    let (ok_b, best_b) = search(&mut b, OPENING);
    assert!(ok_a && ok_b);
    assert_eq!(best_a, best_b);
    assert_eq!(a.diagnostics().value, b.diagnostics().value);
    assert_eq!(a.diagnostics().pv, b.diagnostics().pv);
    assert_eq!(a.diagnostics().stats, b.diagnostics().stats);

    // clear 後は新しい Searcher と同じ探索になる
    let first = a.diagnostics().clone();
    a.clear();
    let (_, best_again) = search(&mut a, OPENING);
    assert_eq!(best_again, best_a);
    assert_eq!(a.diagnostics().value, first.value);
    assert_eq!(a.diagnostics().stats, first.stats);
}

#[test]
fn test_mate_in_one_single_and_parallel() {
    for &sfen in MATE_IN_ONE {
        let mut single = searcher(SearchConfig { max_depth: 5, ..SearchConfig::default() });
        let mut parallel = searcher(SearchConfig {
            max_depth: 5,
            worker_count: 4,
            tree_count: 8,
            ..SearchConfig::default()
        });
        let (ok_s, best_s) = search(&mut single, sfen);
        let (ok_p, best_p) = search(&mut parallel, sfen);
        assert!(ok_s && ok_p, "{sfen}");
        assert!(mates(&single, sfen, best_s), "{sfen}: {}", best_s.to_usi());
        assert!(mates(&parallel, sfen, best_p), "{sfen}: {}", best_p.to_usi());
        assert_eq!(single.diagnostics().value, Value::mate_in(1).raw(), "{sfen}");
        assert_eq!(parallel.diagnostics().value, single.diagnostics().value, "{sfen}");
    }
}

#[test]
fn test_parallel_search_splits() {
    let config = SearchConfig {
        max_depth: 5,
        worker_count: 4,
        tree_count: 8,
        split_min_depth: 3,
        ..SearchConfig::default()
    };
    let mut s = searcher(config);
    let (ok, best) = search(&mut s, SFEN_HIRATE);
    assert!(ok);

    let mut pos = Position::startpos(Arc::clone(s.tables()));
    assert!(pos.is_legal(best));
    let diag = s.diagnostics();
    assert_eq!(diag.depth, 5);
    assert!(diag.stats.splits > 0);
    assert!(diag.stats.helped > 0);
    assert!(!s.is_running());

    // 同じ Searcher で続けて探索できる
    let (ok, _) = search(&mut s, OPENING);
    assert!(ok);
}

#[test]
fn test_split_search_agrees_with_single_thread() {
    for (sfen, depth) in [(OPENING, 4), (SFEN_HIRATE, 4), (SFEN_HIRATE, 5)] {
        let mut single = searcher(SearchConfig { max_depth: depth, ..SearchConfig::default() });
        let mut parallel = searcher(SearchConfig {
            max_depth: depth,
            worker_count: 4,
            tree_count: 8,
            split_min_depth: 2,
            ..SearchConfig::default()
        });
        let (ok_s, _) = search(&mut single, sfen);
        let (ok_p, best_p) = search(&mut parallel, sfen);
        assert!(ok_s && ok_p, "{sfen} depth {depth}");

        let mut pos = Position::from_sfen(sfen, Arc::clone(parallel.tables())).unwrap();
        assert!(pos.is_legal(best_p), "{sfen}: {}", best_p.to_usi());
        assert_eq!(parallel.diagnostics().depth, depth);
        assert_eq!(
            single.diagnostics().value,
            parallel.diagnostics().value,
            "{sfen} depth {depth}"
        );
    }
}

#[test]
fn test_repetitions_are_detected() {
    // 玉と金だけなので同じ局面が何度も現れる
    let mut s = searcher(SearchConfig { max_depth: 6, ..SearchConfig::default() });
    let (ok, _) = search(&mut s, "4k4/9/9/9/9/9/9/9/G3K4 b - 1");
    assert!(ok);
    assert!(s.diagnostics().stats.shek_hits > 0);
}

#[test]
fn test_force_interrupt_from_another_thread() {
    let mut s = searcher(SearchConfig { max_depth: 60, worker_count: 2, ..SearchConfig::default() });
    let handle = s.handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        handle.force_interrupt();
    });

    let start = Instant::now();
    let (ok, best) = search(&mut s, SFEN_HIRATE);
    stopper.join().unwrap();
    assert!(ok);
    assert!(best.is_some());
    assert!(s.diagnostics().interrupted);
    assert!(start.elapsed() < Duration::from_secs(30));
}

#[test]
fn test_time_limit_stops_search() {
    let config = SearchConfig { max_depth: 60, time_limit_ms: Some(300), ..SearchConfig::default() };
    let mut s = searcher(config);
    let start = Instant::now();
    let (ok, best) = search(&mut s, OPENING);
    assert!(ok);
    assert!(best.is_some());
    assert!(start.elapsed() < Duration::from_secs(30));
    assert!(s.diagnostics().depth >= 1);
}

#[test]
fn test_hard_bounds_stop_iteration() {
    // 駒得の局面で beta を低く与えると深さ 1 で止まる
    let mut s = searcher(SearchConfig { max_depth: 6, ..SearchConfig::default() });
    let pos = Position::from_sfen("4k4/9/9/9/9/9/9/9/4K4 b RB 1", Arc::clone(s.tables())).unwrap();
    let mut best = Move::NONE;
    assert!(s.idsearch(&pos, &mut best, -Value::INFINITE, Value::new(100)));
    assert_eq!(s.diagnostics().depth, 1);
    assert!(s.diagnostics().value >= 100);
}
