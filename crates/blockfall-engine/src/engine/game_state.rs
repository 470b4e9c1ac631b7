use std::time::Duration;

use crate::{GameBoard, GameStats, MoveError, Placement};

/// Phase of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Phase {
    /// Board built, game not started yet.
    Ready,
    /// A piece is falling.
    Descent,
    /// Completed rows are flashing before they are removed.
    Collapse,
    Pause,
    /// The last spawn was blocked.
    End,
}

/// Timing of the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Period at which the front end is expected to call [`GameState::tick`].
    pub tick_interval: Duration,
    /// Time between two automatic descent steps.
    pub descent_interval: Duration,
    /// How long completed rows stay visible before collapsing.
    pub collapse_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            descent_interval: Duration::from_millis(1000),
            collapse_delay: Duration::from_millis(1000),
        }
    }
}

/// What a call to [`GameState::tick`] (or a placement) did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum TickEvent {
    /// Nothing was due.
    Idle,
    /// The active piece moved down one row.
    Descended,
    /// The piece settled without completing rows and the next one spawned.
    Placed,
    /// The piece settled and completed this many rows.
    RowsMarked(usize),
    /// This many rows were removed and the next piece spawned.
    RowsCollapsed(usize),
    /// The next piece could not spawn.
    GameOver,
}

/// Arrow keys of the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrow {
    Left,
    Right,
    Up,
    Down,
}

/// A player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Nudge { dx: i32, dy: i32 },
    Rotate { clockwise: bool },
    StartPause,
}

impl Command {
    /// Maps an arrow key: plain arrows nudge one cell, shifted arrows rotate.
    ///
    /// Shift+Right and Shift+Up rotate clockwise, Shift+Left and Shift+Down
    /// counter-clockwise.
    #[must_use]
    pub const fn from_arrow(arrow: Arrow, shift: bool) -> Self {
        match (arrow, shift) {
            (Arrow::Left, false) => Command::Nudge { dx: -1, dy: 0 },
            (Arrow::Right, false) => Command::Nudge { dx: 1, dy: 0 },
            (Arrow::Up, false) => Command::Nudge { dx: 0, dy: -1 },
            (Arrow::Down, false) => Command::Nudge { dx: 0, dy: 1 },
            (Arrow::Right | Arrow::Up, true) => Command::Rotate { clockwise: true },
            (Arrow::Left | Arrow::Down, true) => Command::Rotate { clockwise: false },
        }
    }
}

/// A game in progress: the board, its score and the phase machine driving it.
///
/// Time is supplied by the caller as a monotonic [`Duration`] since any fixed origin.
/// [`GameState::tick`] performs at most one descent or collapse step per call and does
/// nothing until the threshold of the current phase has elapsed.
#[derive(Debug)]
pub struct GameState {
    board: GameBoard,
    stats: GameStats,
    timing: TimingConfig,
    phase: Phase,
    resume_phase: Phase,
    last_descent: Duration,
    collapse_started: Duration,
}

impl GameState {
    #[must_use]
    pub fn new(board: GameBoard, timing: TimingConfig) -> Self {
        Self {
            board,
            stats: GameStats::new(),
            timing,
            phase: Phase::Ready,
            resume_phase: Phase::Descent,
            last_descent: Duration::ZERO,
            collapse_started: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn board(&self) -> &GameBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut GameBoard {
        &mut self.board
    }

    #[must_use]
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    #[must_use]
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Starts, pauses or resumes depending on the phase.
    ///
    /// * `Ready`, `End`: starts a new game (a finished board is cleared first).
    /// * `Descent`, `Collapse`: pauses, remembering the phase.
    /// * `Pause`: resumes, restarting the timer of the resumed phase at `now`.
    pub fn start_button_clicked(&mut self, now: Duration) -> Phase {
        match self.phase {
            Phase::Ready | Phase::End => self.new_game(now),
            Phase::Descent | Phase::Collapse => {
                self.resume_phase = self.phase;
                self.phase = Phase::Pause;
            }
            Phase::Pause => {
                self.phase = self.resume_phase;
                match self.phase {
                    Phase::Collapse => self.collapse_started = now,
                    _ => self.last_descent = now,
                }
            }
        }
        self.phase
    }

    fn new_game(&mut self, now: Duration) {
        if self.phase.is_end() {
            self.board.reset();
        }
        self.stats = GameStats::new();
        self.spawn_next(now);
    }

    fn spawn_next(&mut self, now: Duration) -> bool {
        if self.board.start_piece().is_ok() {
            self.phase = Phase::Descent;
            self.last_descent = now;
            true
        } else {
            self.phase = Phase::End;
            false
        }
    }

    /// Advances the game if the current phase's timer has run out.
    pub fn tick(&mut self, now: Duration) -> TickEvent {
        match self.phase {
            Phase::Descent => {
                if now.saturating_sub(self.last_descent) < self.timing.descent_interval {
                    return TickEvent::Idle;
                }
                self.last_descent = now;
                match self.board.offset_piece(0, 1) {
                    Ok(()) => TickEvent::Descended,
                    Err(MoveError::Blocked) => {
                        let rows = self.board.place_active_piece();
                        self.settle(rows, now)
                    }
                    Err(MoveError::NoActivePiece) => self.spawned_event(now, TickEvent::Placed),
                }
            }
            Phase::Collapse => {
                if now.saturating_sub(self.collapse_started) < self.timing.collapse_delay {
                    return TickEvent::Idle;
                }
                let rows = self.board.collapse_completed_rows();
                self.spawned_event(now, TickEvent::RowsCollapsed(rows))
            }
            Phase::Ready | Phase::Pause | Phase::End => TickEvent::Idle,
        }
    }

    /// Settles the active piece at `placement` right away, as an agent move.
    pub fn place(&mut self, placement: &Placement, now: Duration) -> Result<TickEvent, MoveError> {
        if !self.phase.is_descent() {
            return Err(MoveError::NoActivePiece);
        }
        let rows = self.board.apply_placement(placement)?;
        self.last_descent = now;
        Ok(self.settle(rows, now))
    }

    fn settle(&mut self, rows: usize, now: Duration) -> TickEvent {
        self.stats.complete_piece(rows);
        if rows > 0 {
            self.phase = Phase::Collapse;
            self.collapse_started = now;
            return TickEvent::RowsMarked(rows);
        }
        self.spawned_event(now, TickEvent::Placed)
    }

    fn spawned_event(&mut self, now: Duration, event: TickEvent) -> TickEvent {
        if self.spawn_next(now) {
            event
        } else {
            TickEvent::GameOver
        }
    }

    /// Applies a player command. Returns `false` if it had no effect.
    ///
    /// Moves are only accepted while a piece is descending. A downward nudge scores one
    /// point per row.
    pub fn apply(&mut self, command: Command, now: Duration) -> bool {
        match command {
            Command::StartPause => {
                self.start_button_clicked(now);
                true
            }
            _ if !self.phase.is_descent() => false,
            Command::Nudge { dx, dy } => {
                let moved = self.board.offset_piece(dx, dy).is_ok();
                if moved && let Ok(rows) = usize::try_from(dy) {
                    self.stats.add_drop_points(rows);
                }
                moved
            }
            Command::Rotate { clockwise } => self.board.rotate_piece(clockwise).is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoardConfig, CellColor, Piece, PieceKind};

    const SEED: [u8; 16] = [11; 16];

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn state(art: &str) -> GameState {
        let board = GameBoard::from_ascii(BoardConfig::default(), SEED.into(), art);
        GameState::new(board, TimingConfig::default())
    }

    fn replace_active(state: &mut GameState, kind: PieceKind) {
        let board = state.board_mut();
        board.update_piece(None);
        board.spawn_piece(Piece::new(kind, CellColor::Yellow)).unwrap();
    }

    #[test]
    fn test_arrow_mapping() {
        assert_eq!(
            Command::from_arrow(Arrow::Left, false),
            Command::Nudge { dx: -1, dy: 0 }
        );
        assert_eq!(
            Command::from_arrow(Arrow::Down, false),
            Command::Nudge { dx: 0, dy: 1 }
        );
        assert_eq!(
            Command::from_arrow(Arrow::Up, true),
            Command::Rotate { clockwise: true }
        );
        assert_eq!(
            Command::from_arrow(Arrow::Down, true),
            Command::Rotate { clockwise: false }
        );
    }

    #[test]
    fn test_start_and_timed_descent() {
        let mut state = state("");
        assert!(state.phase().is_ready());
        assert_eq!(state.tick(ms(5000)), TickEvent::Idle);
        assert_eq!(state.start_button_clicked(ms(0)), Phase::Descent);
        assert!(state.board().active_piece().is_some());
        assert_eq!(state.tick(ms(100)), TickEvent::Idle);
        assert_eq!(state.tick(ms(999)), TickEvent::Idle);
        assert_eq!(state.tick(ms(1000)), TickEvent::Descended);
        assert_eq!(state.tick(ms(1100)), TickEvent::Idle);
        assert_eq!(state.tick(ms(2000)), TickEvent::Descended);
    }

    #[test]
    fn test_pause_resume_resets_timer() {
        let mut state = state("");
        state.start_button_clicked(ms(0));
        assert_eq!(state.start_button_clicked(ms(500)), Phase::Pause);
        assert_eq!(state.tick(ms(5000)), TickEvent::Idle);
        assert!(!state.apply(Command::Nudge { dx: 1, dy: 0 }, ms(5000)));
        assert_eq!(state.start_button_clicked(ms(5000)), Phase::Descent);
        assert_eq!(state.tick(ms(5500)), TickEvent::Idle);
        assert_eq!(state.tick(ms(6000)), TickEvent::Descended);
    }

    #[test]
    fn test_complete_row_collapses_after_delay() {
        let mut state = state(
            "
            #########.
            ",
        );
        state.start_button_clicked(ms(0));
        replace_active(&mut state, PieceKind::Bar);
        for _ in 0..4 {
            assert!(state.apply(Command::Nudge { dx: 1, dy: 0 }, ms(0)));
        }
        let mut now = ms(0);
        let event = loop {
            now += ms(1000);
            match state.tick(now) {
                TickEvent::Descended => {}
                event => break event,
            }
        };
        assert_eq!(event, TickEvent::RowsMarked(1));
        assert!(state.phase().is_collapse());
        assert_eq!(state.tick(now + ms(500)), TickEvent::Idle);
        assert_eq!(state.tick(now + ms(1000)), TickEvent::RowsCollapsed(1));
        assert!(state.phase().is_descent());
        assert!(!state.board().has_completed_rows());
        assert_eq!(state.board().stack_image().visible_cell_count(), 3);
        assert_eq!(state.stats().cleared_rows(), 1);
        assert_eq!(state.stats().score(), 100);
    }

    #[test]
    fn test_pause_during_collapse_resumes_collapse() {
        let mut state = state(
            "
            #########.
            ",
        );
        state.start_button_clicked(ms(0));
        replace_active(&mut state, PieceKind::Bar);
        let board = state.board();
        let piece = board.resting_position(&board.active_piece().unwrap().offset_by(4, 0));
        let placement = Placement {
            rotation: 0,
            x: 9,
            piece,
        };
        assert_eq!(state.place(&placement, ms(0)), Ok(TickEvent::RowsMarked(1)));
        assert_eq!(state.start_button_clicked(ms(200)), Phase::Pause);
        assert_eq!(state.start_button_clicked(ms(3000)), Phase::Collapse);
        assert_eq!(state.tick(ms(3500)), TickEvent::Idle);
        assert_eq!(state.tick(ms(4000)), TickEvent::RowsCollapsed(1));
    }

    #[test]
    fn test_drop_nudge_scores_per_row() {
        let mut state = state("");
        state.start_button_clicked(ms(0));
        assert!(state.apply(Command::Nudge { dx: 0, dy: 1 }, ms(10)));
        assert!(state.apply(Command::Nudge { dx: 0, dy: 1 }, ms(20)));
        assert!(state.apply(Command::Nudge { dx: 1, dy: 0 }, ms(30)));
        assert_eq!(state.stats().score(), 2);
    }

    #[test]
    fn test_blocked_spawn_ends_game_and_restart_clears() {
        let board = GameBoard::from_ascii(
            BoardConfig {
                height: 2,
                key_rows: 2,
                ..BoardConfig::default()
            },
            SEED.into(),
            "
            ..######..
            ..........
            ",
        );
        let mut state = GameState::new(board, TimingConfig::default());
        assert_eq!(state.start_button_clicked(ms(0)), Phase::End);
        assert_eq!(state.tick(ms(2000)), TickEvent::Idle);
        assert_eq!(state.start_button_clicked(ms(3000)), Phase::Descent);
        assert_eq!(state.board().stack_image().visible_cell_count(), 0);
    }
}
