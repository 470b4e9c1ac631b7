use std::iter;

use blockfall_engine::{GameState, Phase};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::{Block as BlockWidget, BlockExt as _, Widget},
};

use crate::ui::widgets::style;

/// Score, counters and phase of a game.
pub struct StatsDisplay<'a> {
    state: &'a GameState,
    block: Option<BlockWidget<'a>>,
}

impl<'a> StatsDisplay<'a> {
    pub fn new(state: &'a GameState) -> Self {
        Self { state, block: None }
    }

    pub fn block(self, block: BlockWidget<'a>) -> Self {
        Self {
            block: Some(block),
            ..self
        }
    }

    pub fn width(&self) -> u16 {
        20 + super::block_horizontal_margin(self.block.as_ref())
    }

    pub fn height(&self) -> u16 {
        u16::try_from(ROWS.len()).unwrap_or(u16::MAX)
            + super::block_vertical_margin(self.block.as_ref())
    }
}

#[derive(Clone, Copy)]
enum Row {
    Empty,
    FullLabel(&'static str),
    FullValue(&'static dyn Fn(&GameState) -> String),
    LabelValue(&'static str, &'static dyn Fn(&GameState) -> String),
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Ready => "READY",
        Phase::Descent => "PLAYING",
        Phase::Collapse => "CLEAR!",
        Phase::Pause => "PAUSED",
        Phase::End => "GAME OVER",
    }
}

const ROWS: &[Row] = &[
    Row::FullLabel("SCORE:"),
    Row::FullValue(&|state| state.stats().score().to_string()),
    Row::Empty,
    Row::LabelValue("STATE:", &|state| phase_label(state.phase()).to_owned()),
    Row::LabelValue("NEXT:", &|state| {
        state.board().next_kind().as_char().to_string()
    }),
    Row::Empty,
    Row::LabelValue("PIECES:", &|state| {
        state.stats().completed_pieces().to_string()
    }),
    Row::LabelValue("ROWS:", &|state| state.stats().cleared_rows().to_string()),
    Row::LabelValue("SINGLES:", &|state| {
        state.stats().row_clear_counter()[1].to_string()
    }),
    Row::LabelValue("DOUBLES:", &|state| {
        state.stats().row_clear_counter()[2].to_string()
    }),
    Row::LabelValue("TRIPLES:", &|state| {
        state.stats().row_clear_counter()[3].to_string()
    }),
    Row::LabelValue("QUADS:", &|state| {
        state.stats().row_clear_counter()[4].to_string()
    }),
];

impl Widget for StatsDisplay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.block.as_ref().render(area, buf);
        let area = self.block.inner_if_some(area);

        let style = style::DEFAULT;
        let rows_areas =
            Layout::vertical((0..ROWS.len()).map(|_| Constraint::Length(1))).split(area);

        for (row, area) in iter::zip(ROWS.iter().copied(), rows_areas.iter().copied()) {
            match row {
                Row::Empty => {}
                Row::FullLabel(label) => {
                    Line::styled(label, style).left_aligned().render(area, buf);
                }
                Row::FullValue(value) => {
                    Line::styled(value(self.state), style)
                        .right_aligned()
                        .render(area, buf);
                }
                Row::LabelValue(label, value) => {
                    let [label_area, value_area] = area.layout(&Layout::horizontal([
                        Constraint::Fill(1),
                        Constraint::Fill(1),
                    ]));
                    Line::styled(label, style)
                        .left_aligned()
                        .render(label_area, buf);
                    Line::styled(value(self.state), style)
                        .right_aligned()
                        .render(value_area, buf);
                }
            }
        }
    }
}
