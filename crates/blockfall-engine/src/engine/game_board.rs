use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    CellColor, CopyMode, IndexedImage, Piece, PieceGenerator, PieceKind, PieceSeed, Placement,
    Rect, RenderSink, Rotation, visible_overlap,
};

/// Number of bits reserved above the stack window for the piece discriminant.
const PIECE_KEY_BITS: i32 = 3;

/// Board dimensions and tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardConfig {
    pub width: i32,
    pub height: i32,
    /// Rows above row 0 in which a piece may still be positioned.
    pub headroom: i32,
    /// Extra columns searched on both sides when a widening rotation is kicked.
    pub kick_slack: i32,
    /// Height of the stack window encoded into the state key.
    pub key_rows: i32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 20,
            headroom: 4,
            kick_slack: 0,
            key_rows: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("board must be at least 1x1, got {width}x{height}")]
    EmptyBoard { width: i32, height: i32 },
    #[display("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: i32 },
    #[display("key window of {key_rows} rows does not fit a board of {height} rows")]
    KeyRowsOutOfRange { key_rows: i32, height: i32 },
    #[display("state key needs {bits} bits, more than the 128 available")]
    KeyTooWide { bits: i32 },
    #[display("board of {width}x{height} cells with {headroom} rows of headroom is too large")]
    TooLarge {
        width: i32,
        height: i32,
        headroom: i32,
    },
}

impl BoardConfig {
    /// Checks that the board can be built and its state key fits in a [`StateKey`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self {
            width,
            height,
            headroom,
            kick_slack,
            key_rows,
        } = *self;
        if width < 1 || height < 1 {
            return Err(ConfigError::EmptyBoard { width, height });
        }
        for (name, value) in [("headroom", headroom), ("kick slack", kick_slack)] {
            if value < 0 {
                return Err(ConfigError::Negative { name, value });
            }
        }
        let area = height
            .checked_add(headroom)
            .and_then(|rows| rows.checked_mul(width));
        if area.is_none() {
            return Err(ConfigError::TooLarge {
                width,
                height,
                headroom,
            });
        }
        if key_rows < 1 || key_rows > height {
            return Err(ConfigError::KeyRowsOutOfRange { key_rows, height });
        }
        let bits = key_rows.saturating_mul(width).saturating_add(PIECE_KEY_BITS);
        if bits > 128 {
            return Err(ConfigError::KeyTooWide { bits });
        }
        Ok(())
    }

    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Board bounds grown by the headroom rows above row 0.
    #[must_use]
    pub const fn playable_bounds(&self) -> Rect {
        Rect::new(0, -self.headroom, self.width, self.height)
    }

    /// Number of actions in the fixed `(rotation, column)` action space.
    #[expect(clippy::cast_sign_loss)]
    #[must_use]
    pub const fn action_count(&self) -> usize {
        4 * self.width as usize
    }
}

/// Fingerprint of the board top and the active piece kind.
///
/// The low `key_rows × width` bits hold the normalised stack window (bit 0 is the
/// top-left cell, row-major); the bits above hold `kind index + 1`, so a bare stack key
/// never collides with a combined one.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StateKey(u128);

impl StateKey {
    #[must_use]
    pub const fn from_bits(bits: u128) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u128 {
        self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("piece colliding when spawning")]
pub struct PieceCollisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MoveError {
    #[display("no active piece")]
    NoActivePiece,
    #[display("piece blocked")]
    Blocked,
}

/// The playing field: settled cells, the active piece and its ghost, and the composite
/// image shown to the player.
///
/// Every mutation records the touched area in an invalidation rectangle. The composite is
/// repainted only inside that rectangle by [`GameBoard::update_composite`], and
/// [`GameBoard::update_display`] forwards just that region to a [`RenderSink`].
///
/// Rows are numbered from 0 at the top. Pieces may extend into `headroom` rows above
/// row 0; those cells are never drawn and are dropped if a piece settles there.
pub struct GameBoard {
    config: BoardConfig,
    stack: IndexedImage,
    composite: IndexedImage,
    active: Option<Piece>,
    ghost: Option<Piece>,
    completed_rows: BTreeSet<i32>,
    inval_rect: Rect,
    generator: PieceGenerator,
    state_key: Option<StateKey>,
}

impl fmt::Debug for GameBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameBoard")
            .field("config", &self.config)
            .field("active", &self.active)
            .field("completed_rows", &self.completed_rows)
            .field("inval_rect", &self.inval_rect)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl GameBoard {
    /// Creates an empty board whose pieces come from `seed`.
    pub fn new(config: BoardConfig, seed: PieceSeed) -> Result<Self, ConfigError> {
        config.validate()?;
        let bounds = config.bounds();
        Ok(Self {
            config,
            stack: IndexedImage::new(config.width, config.height),
            composite: IndexedImage::new(config.width, config.height),
            active: None,
            ghost: None,
            completed_rows: BTreeSet::new(),
            inval_rect: bounds,
            generator: PieceGenerator::with_seed(seed),
            state_key: None,
        })
    }

    /// Builds a board whose bottom rows are given as ASCII art, for tests and fixtures.
    ///
    /// `#` is a settled cell and `.` is empty. The art is aligned to the bottom of the
    /// board; rows above it are empty.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid, a row is not `config.width` cells wide, or
    /// there are more rows than the board has.
    #[must_use]
    pub fn from_ascii(config: BoardConfig, seed: PieceSeed, art: &str) -> Self {
        let mut board = Self::new(config, seed).unwrap();
        let rows = IndexedImage::from_ascii(art, CellColor::Red);
        if rows.height() == 0 {
            return board;
        }
        assert_eq!(rows.width(), config.width, "rows must be {} wide", config.width);
        assert!(rows.height() <= config.height, "too many rows");
        board.stack.copy_rect(
            rows.bounds(),
            &rows,
            0,
            config.height - rows.height(),
            CopyMode::Replace,
        );
        board
    }

    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.config.bounds()
    }

    #[must_use]
    pub fn stack_image(&self) -> &IndexedImage {
        &self.stack
    }

    #[must_use]
    pub fn composite_image(&self) -> &IndexedImage {
        &self.composite
    }

    #[must_use]
    pub fn active_piece(&self) -> Option<&Piece> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn ghost_piece(&self) -> Option<&Piece> {
        self.ghost.as_ref()
    }

    #[must_use]
    pub fn inval_rect(&self) -> Rect {
        self.inval_rect
    }

    /// Kind of the piece [`Self::start_piece`] will spawn next.
    #[must_use]
    pub fn next_kind(&self) -> PieceKind {
        self.generator.peek_kind()
    }

    /// Combined state key computed by the last successful spawn.
    #[must_use]
    pub fn last_state_key(&self) -> Option<StateKey> {
        self.state_key
    }

    /// Clears the board for a new game. The piece sequence continues.
    pub fn reset(&mut self) {
        self.stack.fill(CellColor::Transparent);
        self.completed_rows.clear();
        self.active = None;
        self.ghost = None;
        self.state_key = None;
        self.inval_composite(None);
    }

    /// Spawns the next generated piece.
    ///
    /// Returns the combined state key of the new position. An error means the spawn area
    /// is blocked, which ends the game.
    pub fn start_piece(&mut self) -> Result<StateKey, PieceCollisionError> {
        let piece = self.generator.next_piece();
        self.spawn_piece(piece)
    }

    /// Spawns `piece` centred horizontally with its lowest visible row on board row 0.
    pub fn spawn_piece(&mut self, mut piece: Piece) -> Result<StateKey, PieceCollisionError> {
        let visible = piece.visible_bounds();
        let left = (self.config.width - visible.width() + 1).div_euclid(2);
        piece.offset(left - visible.left, 1 - visible.bottom);
        if !self.valid_position(&piece) {
            return Err(PieceCollisionError);
        }
        let key = self.state_key(piece.kind());
        self.update_piece(Some(piece));
        self.state_key = Some(key);
        Ok(key)
    }

    /// Returns `true` if `piece` lies inside the playable area without touching the stack.
    #[must_use]
    pub fn valid_position(&self, piece: &Piece) -> bool {
        self.config
            .playable_bounds()
            .contains(piece.visible_bounds())
            && !visible_overlap(piece.image(), &self.stack)
    }

    /// Lowest valid position reached by moving `piece` straight down.
    ///
    /// `piece` itself is returned unchanged (as a shallow clone) if it cannot move.
    #[must_use]
    pub fn resting_position(&self, piece: &Piece) -> Piece {
        let mut resting = piece.shallow_clone();
        loop {
            let next = resting.offset_by(0, 1);
            if !self.valid_position(&next) {
                return resting;
            }
            resting = next;
        }
    }

    pub fn offset_piece(&mut self, dx: i32, dy: i32) -> Result<(), MoveError> {
        let active = self.active.as_ref().ok_or(MoveError::NoActivePiece)?;
        let moved = active.offset_by(dx, dy);
        if !self.valid_position(&moved) {
            return Err(MoveError::Blocked);
        }
        self.update_piece(Some(moved));
        Ok(())
    }

    /// Rotates the active piece a quarter turn.
    ///
    /// A rotation that lands in an invalid position is retried at other columns only if
    /// it made the piece wider. The candidates are the visible left columns from
    /// `old.right - new.width` to `old.left`, widened by `kick_slack` on both sides; the
    /// first valid one wins.
    pub fn rotate_piece(&mut self, clockwise: bool) -> Result<(), MoveError> {
        let active = self.active.as_ref().ok_or(MoveError::NoActivePiece)?;
        let mut rotated = active.rotated(Rotation::from_clockwise(clockwise));
        if !self.valid_position(&rotated) {
            let old = active.visible_bounds();
            let new = rotated.visible_bounds();
            if new.width() <= old.width() {
                return Err(MoveError::Blocked);
            }
            let slack = self.config.kick_slack;
            let first = old.right - new.width() - slack;
            let last = old.left + slack;
            let kicked = (first..=last)
                .filter(|&x| x != new.left)
                .map(|x| rotated.offset_by(x - new.left, 0))
                .find(|candidate| self.valid_position(candidate))
                .ok_or(MoveError::Blocked)?;
            rotated = kicked;
        }
        self.update_piece(Some(rotated));
        Ok(())
    }

    /// Replaces the active piece and recomputes the ghost.
    ///
    /// Old and new piece and ghost areas are invalidated. `None` clears both.
    pub fn update_piece(&mut self, piece: Option<Piece>) {
        if let Some(old) = self.active.take() {
            self.inval_composite(Some(old.visible_bounds()));
        }
        if let Some(old) = self.ghost.take() {
            self.inval_composite(Some(old.visible_bounds()));
        }
        if let Some(piece) = &piece {
            let ghost = self.resting_position(piece);
            self.inval_composite(Some(piece.visible_bounds()));
            self.inval_composite(Some(ghost.visible_bounds()));
            self.ghost = Some(ghost);
        }
        self.active = piece;
    }

    /// Merges the active piece into the stack and marks the rows it completed.
    ///
    /// Returns the number of rows newly marked, or 0 without an active piece.
    pub fn place_active_piece(&mut self) -> usize {
        if let Some(ghost) = self.ghost.take() {
            self.inval_composite(Some(ghost.visible_bounds()));
        }
        let Some(piece) = self.active.take() else {
            return 0;
        };
        let visible = piece.visible_bounds();
        self.stack.merge_rect(visible, piece.image());
        let marked = self.mark_completed_rows(visible.top, visible.bottom);
        self.inval_composite(Some(visible));
        marked
    }

    /// Places a resting piece from the placement enumerator as if it had dropped there.
    pub fn apply_placement(&mut self, placement: &Placement) -> Result<usize, MoveError> {
        if !self.valid_position(&placement.piece) {
            return Err(MoveError::Blocked);
        }
        self.update_piece(Some(placement.piece.shallow_clone()));
        Ok(self.place_active_piece())
    }

    /// Flags the complete rows in `start..end` and flashes them with the marker colour.
    ///
    /// Returns the number of rows that were not already flagged.
    pub fn mark_completed_rows(&mut self, start: i32, end: i32) -> usize {
        let bounds = self.bounds();
        let mut marked = 0;
        for y in start.max(bounds.top)..end.min(bounds.bottom) {
            let complete = (bounds.left..bounds.right)
                .all(|x| !self.stack.value_at(x, y).is_transparent());
            if !complete {
                continue;
            }
            let row = Rect::new(bounds.left, y, bounds.right, y + 1);
            self.stack.fill_rect(row, CellColor::MARKER);
            self.inval_composite(Some(row));
            if self.completed_rows.insert(y) {
                marked += 1;
            }
        }
        marked
    }

    /// Removes the flagged rows, moving the rows above them down.
    ///
    /// Returns the number of rows removed.
    pub fn collapse_completed_rows(&mut self) -> usize {
        if self.completed_rows.is_empty() {
            return 0;
        }
        let bounds = self.bounds();
        let mut collapsed = IndexedImage::new(bounds.width(), bounds.height());
        let mut dst_row = bounds.bottom - 1;
        for src_row in (bounds.top..bounds.bottom).rev() {
            if self.completed_rows.contains(&src_row) {
                continue;
            }
            let row = Rect::new(bounds.left, src_row, bounds.right, src_row + 1);
            collapsed.copy_rect(row, &self.stack, bounds.left, dst_row, CopyMode::Replace);
            dst_row -= 1;
        }
        self.stack = collapsed;
        let count = self.completed_rows.len();
        self.completed_rows.clear();
        if let Some(active) = self.active.take() {
            self.update_piece(Some(active));
        }
        self.inval_composite(None);
        count
    }

    #[must_use]
    pub fn has_completed_rows(&self) -> bool {
        !self.completed_rows.is_empty()
    }

    #[must_use]
    pub fn completed_rows(&self) -> &BTreeSet<i32> {
        &self.completed_rows
    }

    /// Adds `rect` to the area needing a repaint, or the whole board for `None`.
    pub fn inval_composite(&mut self, rect: Option<Rect>) {
        self.inval_rect = match rect {
            Some(rect) => self.inval_rect.union(rect).intersection(self.bounds()),
            None => self.bounds(),
        };
    }

    /// Repaints the invalidated part of the composite and returns it.
    pub fn update_composite(&mut self) -> Rect {
        let area = self.inval_rect;
        if area.empty() {
            return area;
        }
        self.composite.fill_rect(area, CellColor::Transparent);
        self.composite
            .merge_rect(self.stack.bounds().intersection(area), &self.stack);
        if let Some(ghost) = &self.ghost {
            let image = ghost.image();
            for (x, y) in ghost.visible_bounds().intersection(area).cells() {
                if !image.value_at(x, y).is_transparent() {
                    self.composite.set_value_at(x, y, CellColor::GHOST);
                }
            }
        }
        if let Some(active) = &self.active {
            self.composite
                .merge_rect(active.bounds().intersection(area), active.image());
        }
        self.inval_rect = Rect::EMPTY;
        area
    }

    /// Repaints the composite and sends the changed region to `sink`.
    pub fn update_display<S>(&mut self, sink: &mut S)
    where
        S: RenderSink + ?Sized,
    {
        let area = self.update_composite();
        if !area.empty() {
            sink.display_image(&self.composite, area);
        }
    }

    fn key_window(&self) -> Rect {
        let rows = self.config.key_rows;
        let bounds = self.bounds();
        let visible = self.stack.visible_bounds();
        let top = if visible.empty() {
            bounds.bottom - rows
        } else {
            visible.top.min(bounds.bottom - rows)
        };
        Rect::new(bounds.left, top, bounds.right, top + rows)
    }

    /// The normalised stack window behind [`Self::stack_top_key`], moved to the origin.
    ///
    /// Holes and overhang shadows are filled with the marker colour: below the first
    /// occupied cell of every column, every cell of the window counts as occupied.
    #[must_use]
    pub fn key_window_image(&self) -> IndexedImage {
        let window = self.key_window();
        let mut image = IndexedImage::new(window.width(), window.height());
        image.move_to(window.left, window.top);
        image.copy_rect(window, &self.stack, window.left, window.top, CopyMode::Replace);
        for x in window.left..window.right {
            let Some(surface) =
                (window.top..window.bottom).find(|&y| !image.value_at(x, y).is_transparent())
            else {
                continue;
            };
            for y in surface..window.bottom {
                if image.value_at(x, y).is_transparent() {
                    image.set_value_at(x, y, CellColor::MARKER);
                }
            }
        }
        image.move_to(0, 0);
        image
    }

    /// Packs the normalised stack window into a key, bit 0 being the top-left cell.
    #[must_use]
    pub fn stack_top_key(&self) -> StateKey {
        let window = self.key_window_image();
        let bits = window
            .bounds()
            .cells()
            .enumerate()
            .filter(|&(_, (x, y))| !window.value_at(x, y).is_transparent())
            .fold(0_u128, |bits, (i, _)| bits | (1_u128 << i));
        StateKey(bits)
    }

    /// Stack key combined with the kind of the piece about to be played.
    #[expect(clippy::cast_sign_loss)]
    #[must_use]
    pub fn state_key(&self, kind: PieceKind) -> StateKey {
        let shift = (self.config.key_rows * self.config.width) as u32;
        let piece_bits = (kind.index() as u128 + 1) << shift;
        StateKey(self.stack_top_key().0 | piece_bits)
    }
}
