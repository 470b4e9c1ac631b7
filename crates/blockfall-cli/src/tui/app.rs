use crossterm::event::Event;
use ratatui::Frame;

use crate::tui::Runtime;

/// A terminal application run by [`Runtime::run`].
pub trait App {
    /// Called once before the loop starts, typically to set the tick interval.
    fn init(&mut self, runtime: &mut Runtime);

    fn should_exit(&self) -> bool;

    /// Handles key presses, resizes and other terminal events.
    fn handle_event(&mut self, runtime: &mut Runtime, event: Event);

    fn draw(&self, frame: &mut Frame);

    /// Advances the application by one tick.
    fn update(&mut self, runtime: &mut Runtime);
}
