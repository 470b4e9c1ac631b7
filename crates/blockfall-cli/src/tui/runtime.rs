use std::{
    io,
    time::{Duration, Instant},
};

use crate::tui::{
    App, RenderMode,
    event::TuiEvent,
    event_loop::EventLoop,
};

/// Runs an [`App`] in the terminal's alternate screen.
///
/// The runtime also owns the game clock: [`Runtime::now`] is the monotonic time since
/// the runtime was created.
#[derive(Debug)]
pub struct Runtime {
    events: EventLoop,
    started: Instant,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    #[must_use]
    pub fn new() -> Self {
        let started = Instant::now();
        Self {
            events: EventLoop::new(started),
            started,
        }
    }

    /// Time elapsed since the runtime was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.started.elapsed()
    }

    /// Sets the tick interval; `None` disables ticks.
    pub fn set_tick_interval(&mut self, interval: Option<Duration>) {
        self.events.set_tick_interval(interval);
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.events.set_render_mode(mode);
    }

    /// Calls `app.init()`, then dispatches events until `app.should_exit()`.
    pub fn run<A>(mut self, app: &mut A) -> io::Result<()>
    where
        A: App,
    {
        app.init(&mut self);

        ratatui::run(|terminal| {
            while !app.should_exit() {
                match self.events.next()? {
                    TuiEvent::Tick => app.update(&mut self),
                    TuiEvent::Render => {
                        terminal.draw(|f| app.draw(f))?;
                    }
                    TuiEvent::Crossterm(event) => app.handle_event(&mut self, event),
                }
            }
            Ok(())
        })
    }
}
