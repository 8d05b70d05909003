//! 局面を1つ探索して結果を表示するツール
//!
//! 設定は TOML ファイルから読み、コマンドラインで与えた値で上書きする。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bunki_core::eval::MaterialEvaluator;
use bunki_core::position::{Position, SFEN_HIRATE};
use bunki_core::search::{SearchConfig, Searcher};
use bunki_core::types::{Move, Value};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bunki-search")]
#[command(about = "分割並列探索で局面の最善手を求める")]
struct Cli {
    /// 探索する局面（省略時は平手初期局面）
    #[arg(long)]
    sfen: Option<String>,

    /// 局面から続けて指す手（USI形式）
    #[arg(long, num_args = 1..)]
    moves: Vec<String>,

    /// 最大探索深さ（手数）
    #[arg(long)]
    depth: Option<u32>,

    /// 探索スレッド数
    #[arg(long)]
    threads: Option<usize>,

    /// 探索木の数
    #[arg(long)]
    trees: Option<usize>,

    /// 置換表サイズ（MB）
    #[arg(long)]
    hash_mb: Option<usize>,

    /// 思考時間の上限（ミリ秒）
    #[arg(long)]
    time_ms: Option<u64>,

    /// 探索ノード数の上限
    #[arg(long)]
    nodes: Option<u64>,

    /// 設定ファイル（TOML）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 深さごとの進捗をログに出す
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// 結果を JSON で出力する
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl Cli {
    fn search_config(&self) -> Result<SearchConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                toml::from_str::<SearchConfig>(&text)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
            None => SearchConfig::default(),
        };
        if let Some(depth) = self.depth {
            config.max_depth = depth;
        }
        if let Some(threads) = self.threads {
            config.worker_count = threads;
            // 木の数を指定しなければスレッド数の2倍にする
            if self.trees.is_none() {
                config.tree_count = config.tree_count.max(threads * 2);
            }
        }
        if let Some(trees) = self.trees {
            config.tree_count = trees;
        }
        if let Some(mb) = self.hash_mb {
            config.tt_size_mb = mb;
        }
        if self.time_ms.is_some() {
            config.time_limit_ms = self.time_ms;
        }
        if self.nodes.is_some() {
            config.node_limit = self.nodes;
        }
        config.logging |= self.verbose;
        config.validate().context("invalid search config")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.search_config()?;
    log::debug!("search config: {config:?}");

    let mut searcher = Searcher::new(config, Arc::new(MaterialEvaluator::new()))
        .context("failed to start searcher")?;

    let sfen = cli.sfen.as_deref().unwrap_or(SFEN_HIRATE);
    let mut pos = Position::from_sfen(sfen, Arc::clone(searcher.tables()))
        .with_context(|| format!("invalid sfen: {sfen}"))?;
    for usi in &cli.moves {
        let mv = pos.parse_usi_move(usi).with_context(|| format!("invalid move: {usi}"))?;
        if !pos.is_legal(mv) || !pos.do_move(mv) {
            bail!("illegal move: {usi}");
        }
    }

    let mut best = Move::NONE;
    let ok = searcher.idsearch(&pos, &mut best, -Value::INFINITE, Value::INFINITE);
    let diagnostics = searcher.diagnostics();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(diagnostics)?);
    } else {
        let value = Value::new(diagnostics.value);
        println!("bestmove {}", if best.is_some() { best.to_usi() } else { "resign".to_string() });
        println!("score {value} depth {}", diagnostics.depth);
        println!("pv {}", diagnostics.pv.join(" "));
        println!(
            "nodes {} qnodes {} nps {} time {}ms hashfull {}",
            diagnostics.stats.nodes,
            diagnostics.stats.qnodes,
            diagnostics.nps,
            diagnostics.elapsed_ms,
            diagnostics.hashfull
        );
        println!("splits {} helped {}", diagnostics.stats.splits, diagnostics.stats.helped);
    }

    if !ok {
        log::info!("no move keeps the game alive");
    }
    Ok(())
}
