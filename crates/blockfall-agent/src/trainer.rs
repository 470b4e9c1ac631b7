use blockfall_engine::{
    BoardConfig, ConfigError, GameBoard, GameStats, MoveError, PieceSeed, Placement, StateKey,
    enumerate_placements,
};
use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{KeyValueStore, PersistError, QLearning};

/// Rewards handed to the agent after each placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardConfig {
    /// Reward by number of rows completed by the placement (0 to 4).
    pub per_row: [f32; 5],
    /// Added when the next piece spawns.
    pub survive: f32,
    /// Added instead of `survive` when the next piece cannot spawn.
    pub game_over: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            per_row: [0.0, 1.0, 3.0, 5.0, 8.0],
            survive: 0.1,
            game_over: -10.0,
        }
    }
}

impl RewardConfig {
    #[must_use]
    pub fn reward(&self, rows: usize, game_over: bool) -> f32 {
        let rows = self.per_row[rows.min(self.per_row.len() - 1)];
        rows + if game_over { self.game_over } else { self.survive }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerConfig {
    pub board: BoardConfig,
    pub rewards: RewardConfig,
    /// Episodes end after this many pieces even if the game goes on.
    pub max_pieces: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            rewards: RewardConfig::default(),
            max_pieces: 1000,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainError {
    #[display("invalid board configuration: {_0}")]
    Config(ConfigError),
    #[display("placement rejected: {_0}")]
    Move(MoveError),
    #[display("failed to save the agent: {_0}")]
    Persist(PersistError),
}

/// Summary of one self-play game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeReport {
    pub episode: usize,
    pub seed: PieceSeed,
    pub pieces: usize,
    pub cleared_rows: usize,
    pub score: usize,
    pub total_reward: f32,
    pub game_over: bool,
    /// Exploration rate after the end-of-episode decay.
    pub exploration_rate: f32,
    /// States in the Q-table at the end of the episode.
    pub states: usize,
}

/// The agent's pick for the active piece of a board.
#[derive(Debug)]
pub struct Decision {
    pub state: StateKey,
    pub action: usize,
    pub placement: Placement,
}

fn candidates(board: &GameBoard) -> (Vec<Placement>, Vec<usize>) {
    let Some(piece) = board.active_piece() else {
        return (vec![], vec![]);
    };
    let placements = enumerate_placements(board, piece);
    let width = board.config().width;
    let slots = placements.iter().map(|p| p.action_slot(width)).collect();
    (placements, slots)
}

/// Lets `agent` choose a placement for the active piece of `board`.
///
/// Returns `None` without an active piece or when the piece has no placement.
pub fn decide<R>(agent: &mut QLearning, board: &GameBoard, rng: &mut R) -> Option<Decision>
where
    R: Rng + ?Sized,
{
    let kind = board.active_piece()?.kind();
    let state = board.state_key(kind);
    let (placements, slots) = candidates(board);
    let action = agent.select_action(state, &slots, rng)?;
    let index = slots.iter().position(|&slot| slot == action)?;
    let placement = placements.into_iter().nth(index)?;
    Some(Decision {
        state,
        action,
        placement,
    })
}

/// Self-play loop teaching a [`QLearning`] agent.
#[derive(Debug)]
pub struct Trainer {
    agent: QLearning,
    config: TrainerConfig,
    rng: Pcg32,
}

impl Trainer {
    /// `seed` drives both exploration and the piece seeds of the episodes.
    #[must_use]
    pub fn new(agent: QLearning, config: TrainerConfig, seed: PieceSeed) -> Self {
        Self {
            agent,
            config,
            rng: Pcg32::from_seed(seed.to_bytes()),
        }
    }

    #[must_use]
    pub fn agent(&self) -> &QLearning {
        &self.agent
    }

    #[must_use]
    pub fn into_agent(self) -> QLearning {
        self.agent
    }

    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Plays one game with pieces drawn from `seed`, updating the agent after every
    /// placement and decaying its exploration rate at the end.
    pub fn run_episode(
        &mut self,
        episode: usize,
        seed: PieceSeed,
    ) -> Result<EpisodeReport, TrainError> {
        let mut board = GameBoard::new(self.config.board, seed)?;
        let mut stats = GameStats::new();
        let mut total_reward = 0.0;
        let mut game_over = board.start_piece().is_err();

        while !game_over && stats.completed_pieces() < self.config.max_pieces {
            let Some(decision) = decide(&mut self.agent, &board, &mut self.rng) else {
                game_over = true;
                break;
            };
            let rows = board.apply_placement(&decision.placement)?;
            board.collapse_completed_rows();
            stats.complete_piece(rows);

            let (next_state, next_available) = match board.start_piece() {
                Ok(state) => (state, candidates(&board).1),
                Err(_) => {
                    game_over = true;
                    (board.stack_top_key(), vec![])
                }
            };
            let reward = self.config.rewards.reward(rows, game_over);
            self.agent.update(
                decision.state,
                decision.action,
                reward,
                next_state,
                &next_available,
            );
            total_reward += reward;
        }

        let exploration_rate = self.agent.decay();
        Ok(EpisodeReport {
            episode,
            seed,
            pieces: stats.completed_pieces(),
            cleared_rows: stats.cleared_rows(),
            score: stats.score(),
            total_reward,
            game_over,
            exploration_rate,
            states: self.agent.len(),
        })
    }

    /// Runs `episodes` games, saving the agent to `store` every `save_every` episodes
    /// (never if 0) and once more at the end.
    pub fn train<S>(
        &mut self,
        episodes: usize,
        store: &mut S,
        save_every: usize,
    ) -> Result<Vec<EpisodeReport>, TrainError>
    where
        S: KeyValueStore + ?Sized,
    {
        let mut reports = Vec::with_capacity(episodes);
        for episode in 0..episodes {
            let seed = self.rng.random();
            let report = self.run_episode(episode, seed)?;
            info!(
                episode,
                pieces = report.pieces,
                rows = report.cleared_rows,
                score = report.score,
                reward = report.total_reward,
                epsilon = report.exploration_rate,
                states = report.states,
                "episode finished"
            );
            reports.push(report);
            if save_every > 0 && (episode + 1) % save_every == 0 {
                self.agent.save(store)?;
                info!(episode, "checkpoint saved");
            }
        }
        self.agent.save(store)?;
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use blockfall_engine::{CellColor, Piece, PieceKind};
    use rand::SeedableRng as _;

    use super::*;
    use crate::{DecayParams, MemoryStore, QLearningParams, STORE_KEY};

    const SEED: [u8; 16] = [5; 16];

    fn small_config() -> TrainerConfig {
        TrainerConfig {
            board: BoardConfig {
                width: 6,
                height: 8,
                key_rows: 4,
                ..BoardConfig::default()
            },
            rewards: RewardConfig::default(),
            max_pieces: 50,
        }
    }

    fn trainer(exploration_rate: f32) -> Trainer {
        let config = small_config();
        let agent = QLearning::new(
            config.board.action_count(),
            QLearningParams {
                exploration_rate,
                ..QLearningParams::default()
            },
            DecayParams::default(),
        );
        Trainer::new(agent, config, SEED.into())
    }

    #[test]
    fn test_reward() {
        let rewards = RewardConfig::default();
        assert!((rewards.reward(0, false) - 0.1).abs() < 1e-6);
        assert!((rewards.reward(4, false) - 8.1).abs() < 1e-6);
        assert!((rewards.reward(9, false) - 8.1).abs() < 1e-6);
        assert!((rewards.reward(1, true) + 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_decide_picks_enumerated_slot() {
        let mut board = GameBoard::new(BoardConfig::default(), SEED.into()).unwrap();
        let mut agent = QLearning::new(40, QLearningParams::default(), DecayParams::default());
        let mut rng = Pcg32::seed_from_u64(1);
        assert!(decide(&mut agent, &board, &mut rng).is_none());

        board
            .spawn_piece(Piece::new(PieceKind::Square, CellColor::Red))
            .unwrap();
        let decision = decide(&mut agent, &board, &mut rng).unwrap();
        assert_eq!(decision.state, board.state_key(PieceKind::Square));
        assert_eq!(decision.action, decision.placement.action_slot(10));
        assert!(board.valid_position(&decision.placement.piece));
    }

    #[test]
    fn test_episode_learns_and_decays() {
        let mut trainer = trainer(0.5);
        let report = trainer.run_episode(0, SEED.into()).unwrap();
        assert!(report.pieces > 0);
        assert!(report.pieces <= 50);
        assert!(report.game_over || report.pieces == 50);
        assert!(report.states > 0);
        assert!((report.exploration_rate - 0.4975).abs() < 1e-6);
        assert_eq!(report.states, trainer.agent().len());
    }

    #[test]
    fn test_episode_is_reproducible() {
        let a = trainer(0.3).run_episode(0, SEED.into()).unwrap();
        let b = trainer(0.3).run_episode(0, SEED.into()).unwrap();
        assert_eq!(a.pieces, b.pieces);
        assert_eq!(a.score, b.score);
        assert_eq!(a.states, b.states);
    }

    #[test]
    fn test_train_saves_agent() {
        let mut trainer = trainer(0.2);
        let mut store = MemoryStore::new();
        let reports = trainer.train(3, &mut store, 2).unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(
            reports.iter().map(|r| r.episode).collect::<Vec<_>>(),
            [0, 1, 2]
        );
        assert!(store.get(STORE_KEY).unwrap().is_some());

        let mut loaded = QLearning::new(
            small_config().board.action_count(),
            QLearningParams::default(),
            DecayParams::default(),
        );
        assert!(loaded.load(&store));
        assert_eq!(loaded.len(), trainer.agent().len());
        assert!((loaded.exploration_rate() - trainer.agent().exploration_rate()).abs() < 1e-6);
    }
}
