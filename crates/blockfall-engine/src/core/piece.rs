use arrayvec::ArrayVec;
use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};

use super::{
    geometry::Rect,
    palette::CellColor,
    raster::IndexedImage,
    rotation::{Rotation, transpose_image},
};

/// The seven piece shapes.
///
/// Discriminants follow the order used for the piece bits of the state key, so
/// `index()` must stay stable once Q-tables have been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum PieceKind {
    /// Straight four-cell bar.
    Bar = 0,
    L = 1,
    J = 2,
    S = 3,
    Z = 4,
    T = 5,
    /// 2×2 square.
    Square = 6,
}

const TEMPLATES: [&str; PieceKind::LEN] = [
    "
    .#..
    .#..
    .#..
    .#..
    ",
    "
    .#.
    .#.
    .##
    ",
    "
    .#.
    .#.
    ##.
    ",
    "
    #..
    ##.
    .#.
    ",
    "
    ..#
    .##
    .#.
    ",
    "
    ...
    ###
    .#.
    ",
    "
    ...
    .##
    .##
    ",
];

impl Distribution<PieceKind> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceKind {
        PieceKind::ALL[rng.random_range(0..PieceKind::LEN)]
    }
}

impl PieceKind {
    /// Number of piece kinds (7).
    pub const LEN: usize = 7;

    pub const ALL: [PieceKind; Self::LEN] = [
        PieceKind::Bar,
        PieceKind::L,
        PieceKind::J,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::T,
        PieceKind::Square,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the single character representation of this piece kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use blockfall_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::Bar.as_char(), 'I');
    /// assert_eq!(PieceKind::Square.as_char(), 'O');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::Bar => 'I',
            PieceKind::L => 'L',
            PieceKind::J => 'J',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::T => 'T',
            PieceKind::Square => 'O',
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PieceKind::Bar),
            'L' => Some(PieceKind::L),
            'J' => Some(PieceKind::J),
            'S' => Some(PieceKind::S),
            'Z' => Some(PieceKind::Z),
            'T' => Some(PieceKind::T),
            'O' => Some(PieceKind::Square),
            _ => None,
        }
    }

    /// Instantiates the kind's template at the origin in `color`.
    #[must_use]
    pub fn template(self, color: CellColor) -> IndexedImage {
        IndexedImage::from_ascii(TEMPLATES[self.index()], color)
    }
}

/// A piece image of one kind and colour.
///
/// The image template is 3×3 or 4×4 with transparent padding, so the image bounds and
/// the visible bounds differ. Collision and placement always work on the visible bounds.
///
/// Pieces are moved by shallow cloning: [`Piece::shallow_clone`] shares the pixel
/// buffer, so a candidate position can be tried without copying cells.
#[derive(Debug)]
pub struct Piece {
    kind: PieceKind,
    color: CellColor,
    image: IndexedImage,
}

/// One rotation-distinct orientation of a piece.
///
/// `rotation` is 0 for the spawn orientation, 1 for clockwise, 2 for a half turn and 3
/// for counter-clockwise.
#[derive(Debug)]
pub struct Orientation {
    pub rotation: usize,
    pub piece: Piece,
}

impl Piece {
    #[must_use]
    pub fn new(kind: PieceKind, color: CellColor) -> Self {
        Self {
            kind,
            color,
            image: kind.template(color),
        }
    }

    /// Draws a uniformly random kind and piece colour.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let kind = rng.random();
        let color = rng.random();
        Self::new(kind, color)
    }

    #[must_use]
    pub fn shallow_clone(&self) -> Self {
        Self {
            kind: self.kind,
            color: self.color,
            image: self.image.shallow_clone(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    #[must_use]
    pub fn color(&self) -> CellColor {
        self.color
    }

    #[must_use]
    pub fn image(&self) -> &IndexedImage {
        &self.image
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.image.bounds()
    }

    #[must_use]
    pub fn visible_bounds(&self) -> Rect {
        self.image.visible_bounds()
    }

    #[must_use]
    pub fn visible_cell_count(&self) -> usize {
        self.image.visible_cell_count()
    }

    pub fn offset(&mut self, dx: i32, dy: i32) {
        self.image.offset(dx, dy);
    }

    /// Returns a copy translated by `(dx, dy)`, sharing pixels with `self`.
    #[must_use]
    pub fn offset_by(&self, dx: i32, dy: i32) -> Self {
        let mut piece = self.shallow_clone();
        piece.offset(dx, dy);
        piece
    }

    /// Moves the piece so that its visible top-left corner lands on `(x, y)`.
    pub fn move_visible_to(&mut self, x: i32, y: i32) {
        let visible = self.visible_bounds();
        self.offset(x - visible.left, y - visible.top);
    }

    #[must_use]
    pub fn rotated(&self, rotation: Rotation) -> Self {
        Self {
            kind: self.kind,
            color: self.color,
            image: transpose_image(&self.image, rotation),
        }
    }

    /// Visible cells as ASCII art, independent of position and padding.
    #[must_use]
    pub fn shape(&self) -> String {
        self.image
            .sub_image(self.visible_bounds())
            .map(|image| image.to_ascii())
            .unwrap_or_default()
    }

    /// Returns the rotation-distinct orientations of this piece at its current position.
    ///
    /// Orientations are tried as spawn, clockwise, half turn, counter-clockwise; one whose
    /// visible shape repeats an earlier orientation is dropped. The square yields one
    /// orientation, the bar, S and Z yield two, the rest four.
    #[must_use]
    pub fn orientations(&self) -> ArrayVec<Orientation, 4> {
        let candidates = [
            None,
            Some(Rotation::Clockwise),
            Some(Rotation::Half),
            Some(Rotation::CounterClockwise),
        ];
        let mut shapes = ArrayVec::<String, 4>::new();
        let mut orientations = ArrayVec::new();
        for (rotation, candidate) in candidates.into_iter().enumerate() {
            let piece = match candidate {
                None => self.shallow_clone(),
                Some(r) => self.rotated(r),
            };
            let shape = piece.shape();
            if shapes.contains(&shape) {
                continue;
            }
            shapes.push(shape);
            orientations.push(Orientation { rotation, piece });
        }
        orientations
    }
}
