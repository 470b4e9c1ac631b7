use blockfall_engine::ColorGrid;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Block as BlockWidget, BlockExt as _, Widget},
};

use crate::ui::widgets::style;

/// Terminal columns used by one board cell.
const CELL_WIDTH: u16 = 2;

/// Draws a [`ColorGrid`] with one coloured two-column block per cell.
#[derive(Debug)]
pub struct GridDisplay<'a> {
    grid: &'a ColorGrid,
    block: Option<BlockWidget<'a>>,
}

impl<'a> GridDisplay<'a> {
    pub fn new(grid: &'a ColorGrid) -> Self {
        Self { grid, block: None }
    }

    pub fn block(self, block: BlockWidget<'a>) -> Self {
        Self {
            block: Some(block),
            ..self
        }
    }

    pub fn width(&self) -> u16 {
        let cells = u16::try_from(self.grid.bounds().width()).unwrap_or(0);
        cells * CELL_WIDTH + super::block_horizontal_margin(self.block.as_ref())
    }

    pub fn height(&self) -> u16 {
        let cells = u16::try_from(self.grid.bounds().height()).unwrap_or(0);
        cells + super::block_vertical_margin(self.block.as_ref())
    }
}

impl Widget for GridDisplay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.block.as_ref().render(area, buf);
        let area = self.block.inner_if_some(area);

        for (row, y) in self.grid.rows().zip(area.top()..area.bottom()) {
            let columns = (area.left()..area.right()).step_by(usize::from(CELL_WIDTH));
            for (&rgb, x) in row.iter().zip(columns) {
                let cell = Rect::new(x, y, CELL_WIDTH.min(area.right() - x), 1);
                buf.set_style(cell, style::cell(rgb));
            }
        }
    }
}
