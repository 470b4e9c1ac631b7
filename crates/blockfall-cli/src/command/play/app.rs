use std::time::Duration;

use blockfall_agent::{QLearning, decide};
use blockfall_engine::{
    Arrow, ColorGrid, Command, GameState, Rect, RenderSink as _, TickEvent,
};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout},
    widgets::{Block as BlockWidget, Borders},
};
use tracing::{debug, info, warn};

use crate::{
    tui::{App, RenderMode, Runtime},
    ui::widgets::{GridDisplay, KeyBinding, KeyBindingDisplay, StatsDisplay},
};

const FPS: f64 = 30.0;

const MANUAL_BINDINGS: &[KeyBinding] = &[
    (&["←", "→", "↑", "↓"], "Move"),
    (&["Shift+→", "Shift+↑"], "Rotate right"),
    (&["Shift+←", "Shift+↓"], "Rotate left"),
    (&["Space"], "Start/Pause"),
    (&["q"], "Quit"),
];

const AUTO_BINDINGS: &[KeyBinding] = &[(&["Space"], "Start/Pause"), (&["q"], "Quit")];

/// Who moves the pieces.
#[derive(Debug)]
pub enum Driver {
    Manual,
    Agent {
        agent: QLearning,
        last_placement: Duration,
    },
}

impl Driver {
    pub fn agent(agent: QLearning) -> Self {
        Self::Agent {
            agent,
            last_placement: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Game(Command),
    Quit,
}

fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let arrow = match key.code {
        KeyCode::Left => Arrow::Left,
        KeyCode::Right => Arrow::Right,
        KeyCode::Up => Arrow::Up,
        KeyCode::Down => Arrow::Down,
        KeyCode::Char(' ') => return Some(KeyAction::Game(Command::StartPause)),
        KeyCode::Char('q') | KeyCode::Esc => return Some(KeyAction::Quit),
        _ => return None,
    };
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    Some(KeyAction::Game(Command::from_arrow(arrow, shift)))
}

#[derive(Debug)]
pub struct PlayApp {
    game: GameState,
    driver: Driver,
    board_view: ColorGrid,
    key_view: ColorGrid,
    is_exiting: bool,
}

impl PlayApp {
    pub fn new(game: GameState, driver: Driver) -> Self {
        let config = *game.board().config();
        let mut app = Self {
            board_view: ColorGrid::new(game.board().bounds()),
            key_view: ColorGrid::new(Rect::from_size(0, 0, config.width, config.key_rows)),
            game,
            driver,
            is_exiting: false,
        };
        app.refresh_views();
        app
    }

    pub fn log_summary(&self) {
        let stats = self.game.stats();
        info!(
            score = stats.score(),
            pieces = stats.completed_pieces(),
            rows = stats.cleared_rows(),
            "game closed"
        );
    }

    fn refresh_views(&mut self) {
        self.game.board_mut().update_display(&mut self.board_view);
        let window = self.game.board().key_window_image();
        let bounds = self.key_view.bounds();
        self.key_view.display_image(&window, bounds);
    }

    fn place_for_agent(&mut self, now: Duration) {
        let Driver::Agent {
            agent,
            last_placement,
        } = &mut self.driver
        else {
            return;
        };
        if !self.game.phase().is_descent()
            || now.saturating_sub(*last_placement) < self.game.timing().descent_interval
        {
            return;
        }
        *last_placement = now;
        let Some(decision) = decide(agent, self.game.board(), &mut rand::rng()) else {
            return;
        };
        debug!(state = %decision.state, action = decision.action, "agent placement");
        match self.game.place(&decision.placement, now) {
            Ok(event) => log_event(event),
            Err(e) => warn!("agent placement rejected: {e}"),
        }
    }
}

fn log_event(event: TickEvent) {
    match event {
        TickEvent::RowsMarked(rows) => debug!(rows, "rows completed"),
        TickEvent::GameOver => info!("game over"),
        _ => {}
    }
}

impl App for PlayApp {
    fn init(&mut self, runtime: &mut Runtime) {
        runtime.set_tick_interval(Some(self.game.timing().tick_interval));
        runtime.set_render_mode(RenderMode::throttled_from_rate(FPS));
    }

    fn should_exit(&self) -> bool {
        self.is_exiting
    }

    fn handle_event(&mut self, runtime: &mut Runtime, event: Event) {
        let Some(key) = event.as_key_event() else {
            return;
        };
        match key_action(&key) {
            Some(KeyAction::Quit) => self.is_exiting = true,
            Some(KeyAction::Game(command)) => {
                let manual = matches!(self.driver, Driver::Manual);
                if manual || command == Command::StartPause {
                    self.game.apply(command, runtime.now());
                    self.refresh_views();
                }
            }
            None => {}
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let board = GridDisplay::new(&self.board_view)
            .block(BlockWidget::new().borders(Borders::ALL).title(" blockfall "));
        let key_window = GridDisplay::new(&self.key_view)
            .block(BlockWidget::new().borders(Borders::ALL).title(" stack key "));
        let stats = StatsDisplay::new(&self.game)
            .block(BlockWidget::new().borders(Borders::ALL).title(" stats "));
        let bindings = match self.driver {
            Driver::Manual => MANUAL_BINDINGS,
            Driver::Agent { .. } => AUTO_BINDINGS,
        };

        let side_width = stats.width().max(key_window.width());
        let [main_area, help_area] =
            Layout::vertical([Constraint::Length(board.height()), Constraint::Length(1)])
                .areas(frame.area());
        let [board_area, side_area] = Layout::horizontal([
            Constraint::Length(board.width()),
            Constraint::Length(side_width),
        ])
        .flex(Flex::Center)
        .areas(main_area);
        let [stats_area, key_area] = Layout::vertical([
            Constraint::Length(stats.height()),
            Constraint::Length(key_window.height()),
        ])
        .areas(side_area);

        frame.render_widget(board, board_area);
        frame.render_widget(stats, stats_area);
        frame.render_widget(key_window, key_area);
        frame.render_widget(KeyBindingDisplay::new(bindings), help_area);
    }

    fn update(&mut self, runtime: &mut Runtime) {
        let now = runtime.now();
        log_event(self.game.tick(now));
        self.place_for_agent(now);
        self.refresh_views();
    }
}

#[cfg(test)]
mod tests {
    use blockfall_engine::{BoardConfig, GameBoard, Phase, TimingConfig};

    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn app(driver: Driver) -> PlayApp {
        let board = GameBoard::new(BoardConfig::default(), [1; 16].into()).unwrap();
        PlayApp::new(GameState::new(board, TimingConfig::default()), driver)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(
            key_action(&key(KeyCode::Left, KeyModifiers::NONE)),
            Some(KeyAction::Game(Command::Nudge { dx: -1, dy: 0 }))
        );
        assert_eq!(
            key_action(&key(KeyCode::Right, KeyModifiers::SHIFT)),
            Some(KeyAction::Game(Command::Rotate { clockwise: true }))
        );
        assert_eq!(
            key_action(&key(KeyCode::Char(' '), KeyModifiers::NONE)),
            Some(KeyAction::Game(Command::StartPause))
        );
        assert_eq!(
            key_action(&key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(KeyAction::Quit)
        );
        assert_eq!(key_action(&key(KeyCode::Char('x'), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_rotate_hints_match_key_mapping() {
        let hinted = |name: &str| -> Vec<&str> {
            MANUAL_BINDINGS
                .iter()
                .filter(|(_, action)| *action == name)
                .flat_map(|(keys, _)| keys.iter().copied())
                .collect()
        };
        for (label, code, clockwise) in [
            ("Shift+→", KeyCode::Right, true),
            ("Shift+↑", KeyCode::Up, true),
            ("Shift+←", KeyCode::Left, false),
            ("Shift+↓", KeyCode::Down, false),
        ] {
            assert_eq!(
                key_action(&key(code, KeyModifiers::SHIFT)),
                Some(KeyAction::Game(Command::Rotate { clockwise }))
            );
            let name = if clockwise { "Rotate right" } else { "Rotate left" };
            assert!(hinted(name).contains(&label), "{label}");
        }
    }

    #[test]
    fn test_views_follow_the_board() {
        let mut app = app(Driver::Manual);
        app.game.apply(Command::StartPause, Duration::ZERO);
        app.refresh_views();
        assert_eq!(app.game.phase(), Phase::Descent);

        // A fresh spawn shows only its lowest row inside the board.
        let piece = app.game.board().active_piece().unwrap();
        let color = piece.color().rgb();
        let shown = piece
            .visible_bounds()
            .cells()
            .filter(|&(x, y)| !piece.image().value_at(x, y).is_transparent())
            .filter(|&(x, y)| app.board_view.get(x, y) == Some(color))
            .count();
        assert!(shown >= 1);
        assert!(app.board_view.get(0, -1).is_none());
    }

    #[test]
    fn test_agent_places_one_piece_per_interval() {
        let mut agent = QLearning::new(
            BoardConfig::default().action_count(),
            blockfall_agent::QLearningParams::default(),
            blockfall_agent::DecayParams::default(),
        );
        agent.set_exploration_rate(0.0);
        let mut app = app(Driver::agent(agent));
        app.game.apply(Command::StartPause, Duration::ZERO);

        app.place_for_agent(Duration::from_millis(500));
        assert_eq!(app.game.stats().completed_pieces(), 0);
        app.place_for_agent(Duration::from_millis(1000));
        assert_eq!(app.game.stats().completed_pieces(), 1);
        app.place_for_agent(Duration::from_millis(1500));
        assert_eq!(app.game.stats().completed_pieces(), 1);
    }
}
