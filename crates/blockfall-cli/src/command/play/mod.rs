use std::path::PathBuf;

use anyhow::Context as _;
use blockfall_agent::{DecayParams, FileStore, QLearning, QLearningParams};
use blockfall_engine::{GameBoard, GameState, PieceSeed, TimingConfig};
use tracing::info;

use self::app::{Driver, PlayApp};
use super::BoardArg;
use crate::tui::Runtime;

mod app;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// 32 hex digit seed of the piece sequence (random if omitted)
    #[arg(long)]
    seed: Option<PieceSeed>,
    #[clap(flatten)]
    pub(crate) board: BoardArg,
    /// Write logs to this file (the terminal is taken by the game)
    #[arg(long)]
    pub(crate) log_file: Option<PathBuf>,
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AutoPlayArg {
    #[clap(flatten)]
    pub(crate) play: PlayArg,
    /// Directory holding the trained Q-table (it must match the board flags)
    #[arg(long, default_value = "./data/agent/")]
    store: PathBuf,
}

fn new_game(arg: &PlayArg) -> anyhow::Result<GameState> {
    let config = arg.board.config()?;
    let seed = arg.seed.unwrap_or_else(rand::random);
    info!(%seed, width = config.width, height = config.height, "new game");
    let board = GameBoard::new(config, seed)?;
    Ok(GameState::new(board, TimingConfig::default()))
}

pub(crate) fn run_manual(arg: &PlayArg) -> anyhow::Result<()> {
    let mut app = PlayApp::new(new_game(arg)?, Driver::Manual);
    Runtime::new()
        .run(&mut app)
        .context("Terminal UI failed")?;
    app.log_summary();
    Ok(())
}

pub(crate) fn run_auto(arg: &AutoPlayArg) -> anyhow::Result<()> {
    let game = new_game(&arg.play)?;
    let mut agent = QLearning::new(
        game.board().config().action_count(),
        QLearningParams::default(),
        DecayParams::default(),
    );
    if !agent.load(&FileStore::new(arg.store.clone())) {
        anyhow::bail!(
            "No Q-table for a {}-wide board found in {}",
            game.board().config().width,
            arg.store.display()
        );
    }
    agent.set_exploration_rate(0.0);
    info!(states = agent.len(), "agent loaded");

    let mut app = PlayApp::new(game, Driver::agent(agent));
    Runtime::new()
        .run(&mut app)
        .context("Terminal UI failed")?;
    app.log_summary();
    Ok(())
}
