use std::{fs::File, path::Path, sync::Mutex};

use anyhow::Context as _;
use blockfall_engine::BoardConfig;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

use self::{
    play::{AutoPlayArg, PlayArg},
    train::TrainArg,
};

mod play;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Play the game in the terminal
    Play(#[clap(flatten)] PlayArg),
    /// Watch a trained agent play
    AutoPlay(#[clap(flatten)] AutoPlayArg),
    /// Train the Q-learning agent by self-play
    Train(#[clap(flatten)] TrainArg),
}

/// Board dimensions shared by every mode.
///
/// A Q-table only fits the board width it was trained on, so `auto-play` takes the same
/// flags as `train`.
#[derive(Debug, Clone, Copy, clap::Args)]
pub(crate) struct BoardArg {
    #[arg(long, default_value_t = 10)]
    width: i32,
    #[arg(long, default_value_t = 20)]
    height: i32,
    /// Stack rows encoded into the state key
    #[arg(long, default_value_t = 5)]
    key_rows: i32,
}

impl Default for BoardArg {
    fn default() -> Self {
        let BoardConfig {
            width,
            height,
            key_rows,
            ..
        } = BoardConfig::default();
        Self {
            width,
            height,
            key_rows,
        }
    }
}

impl BoardArg {
    pub(crate) fn config(&self) -> anyhow::Result<BoardConfig> {
        let config = BoardConfig {
            width: self.width,
            height: self.height,
            key_rows: self.key_rows,
            ..BoardConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode.unwrap_or(Mode::Play(PlayArg::default())) {
        Mode::Play(arg) => {
            init_tracing(args.verbose, arg.log_file.as_deref(), false)?;
            play::run_manual(&arg)?;
        }
        Mode::AutoPlay(arg) => {
            init_tracing(args.verbose, arg.play.log_file.as_deref(), false)?;
            play::run_auto(&arg)?;
        }
        Mode::Train(arg) => {
            init_tracing(args.verbose, None, true)?;
            train::run(&arg)?;
        }
    }
    Ok(())
}

/// Installs the log subscriber.
///
/// Logs go to `log_file` when given, otherwise to stderr if `stderr` is set. Terminal UI
/// modes pass `stderr = false` since stderr shares the screen.
fn init_tracing(verbose: u8, log_file: Option<&Path>, stderr: bool) -> anyhow::Result<()> {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .with(level)
            .init();
    } else if stderr {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(level)
            .init();
    }
    Ok(())
}
