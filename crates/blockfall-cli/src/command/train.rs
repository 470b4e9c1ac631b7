use std::path::PathBuf;

use blockfall_agent::{
    DecayParams, EpisodeReport, FileStore, QLearning, QLearningParams, RewardConfig, Trainer,
    TrainerConfig,
};
use blockfall_engine::PieceSeed;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::BoardArg;
use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Number of self-play games
    #[arg(long, default_value_t = 1000)]
    episodes: usize,
    /// Directory the Q-table is loaded from and saved to
    #[arg(long, default_value = "./data/agent/")]
    store: PathBuf,
    /// 32 hex digit seed for a reproducible run (random if omitted)
    #[arg(long)]
    seed: Option<PieceSeed>,
    /// Save the Q-table every this many episodes (0: only at the end)
    #[arg(long, default_value_t = 100)]
    save_every: usize,
    /// Pieces after which a game is cut short
    #[arg(long, default_value_t = 1000)]
    max_pieces: usize,
    /// Ignore a previously saved Q-table
    #[arg(long)]
    fresh: bool,
    #[clap(flatten)]
    pub(crate) board: BoardArg,
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f32,
    #[arg(long, default_value_t = 0.9)]
    discount_factor: f32,
    /// Initial exploration rate (a resumed Q-table keeps its own)
    #[arg(long, default_value_t = 0.1)]
    exploration_rate: f32,
    /// Output file for the JSON run report (stdout if omitted)
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrainingReport {
    trained_at: DateTime<Utc>,
    seed: PieceSeed,
    config: TrainerConfig,
    params: QLearningParams,
    states: usize,
    episodes: Vec<EpisodeReport>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let board = arg.board.config()?;
    let config = TrainerConfig {
        board,
        rewards: RewardConfig::default(),
        max_pieces: arg.max_pieces,
    };
    let params = QLearningParams {
        learning_rate: arg.learning_rate,
        discount_factor: arg.discount_factor,
        exploration_rate: arg.exploration_rate,
    };

    let mut store = FileStore::new(arg.store.clone());
    let mut agent = QLearning::new(board.action_count(), params, DecayParams::default());
    if !arg.fresh && agent.load(&store) {
        info!(
            states = agent.len(),
            epsilon = agent.exploration_rate(),
            "resuming from {}",
            arg.store.display()
        );
    }

    let seed = arg.seed.unwrap_or_else(rand::random);
    info!(%seed, episodes = arg.episodes, "training started");
    let mut trainer = Trainer::new(agent, config, seed);
    let episodes = trainer.train(arg.episodes, &mut store, arg.save_every)?;
    let agent = trainer.into_agent();

    #[expect(clippy::cast_precision_loss)]
    let mean_rows = if episodes.is_empty() {
        0.0
    } else {
        episodes.iter().map(|e| e.cleared_rows).sum::<usize>() as f64 / episodes.len() as f64
    };
    info!(
        states = agent.len(),
        mean_rows,
        "training finished, Q-table saved to {}",
        store.dir().display()
    );

    let report = TrainingReport {
        trained_at: Utc::now(),
        seed,
        config,
        params: *agent.params(),
        states: agent.len(),
        episodes,
    };
    util::save_json(&report, arg.report.as_deref())?;
    Ok(())
}
