//! Game logic on top of the raster primitives.
//!
//! - [`GameBoard`] - stack, active piece, ghost, row completion and the state key
//! - [`GameState`] - timed phase machine (ready, descent, collapse, pause, end)
//! - [`enumerate_placements`] - every resting position of a piece, for agents
//! - [`GameStats`] - score and row counters
//! - [`PieceGenerator`] - seeded piece sequence
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use blockfall_engine::{BoardConfig, GameBoard, GameState, Phase, TickEvent, TimingConfig};
//!
//! let board = GameBoard::new(BoardConfig::default(), [0; 16].into()).unwrap();
//! let mut state = GameState::new(board, TimingConfig::default());
//!
//! assert_eq!(state.start_button_clicked(Duration::ZERO), Phase::Descent);
//! assert_eq!(state.tick(Duration::from_millis(100)), TickEvent::Idle);
//! assert_eq!(state.tick(Duration::from_secs(1)), TickEvent::Descended);
//! ```

pub use self::{
    game_board::*, game_state::*, game_stats::*, piece_generator::*, placement::*,
};

mod game_board;
mod game_state;
mod game_stats;
mod piece_generator;
mod placement;
