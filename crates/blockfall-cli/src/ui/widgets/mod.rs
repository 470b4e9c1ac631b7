use ratatui::{layout::Rect, widgets::Block as BlockWidget};

pub use self::{grid_display::*, key_binding_display::*, stats_display::*};

mod grid_display;
mod key_binding_display;
mod stats_display;

pub mod style {
    use blockfall_engine::Rgb;
    use ratatui::style::{Color, Style};

    pub const DEFAULT: Style = Style::new().fg(Color::White).bg(Color::Black);
    pub const HELP: Style = Style::new().fg(Color::DarkGray);

    pub const fn color(rgb: Rgb) -> Color {
        Color::Rgb(rgb.0, rgb.1, rgb.2)
    }

    /// A solid cell of the given colour.
    pub const fn cell(rgb: Rgb) -> Style {
        let color = color(rgb);
        Style::new().fg(color).bg(color)
    }
}

fn block_vertical_margin(block: Option<&BlockWidget>) -> u16 {
    let dummy_rect = Rect::new(0, 0, 100, 100);
    let inner_rect = block.map_or(dummy_rect, |block| block.inner(dummy_rect));
    dummy_rect.height - inner_rect.height
}

fn block_horizontal_margin(block: Option<&BlockWidget>) -> u16 {
    let dummy_rect = Rect::new(0, 0, 100, 100);
    let inner_rect = block.map_or(dummy_rect, |block| block.inner(dummy_rect));
    dummy_rect.width - inner_rect.width
}
