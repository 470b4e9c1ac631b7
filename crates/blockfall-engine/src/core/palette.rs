use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};

/// A 24-bit colour used by render sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses a `#rrggbb` literal at compile time.
    #[expect(clippy::cast_possible_truncation)]
    const fn from_hex(hex: u32) -> Self {
        Self((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }
}

/// Background used for [`CellColor::Transparent`] cells.
pub const EMPTY_BACKGROUND: Rgb = Rgb::from_hex(0x20_20_20);

/// Palette index stored in every raster cell.
///
/// The palette is fixed. `White` doubles as the row-clear flash and the hole marker of the
/// stack-top key; `Gray` is the ghost piece colour. Neither is ever used by a real piece.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(u8)]
pub enum CellColor {
    Black = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
    Yellow = 4,
    White = 5,
    #[default]
    Transparent = 6,
    Gray = 7,
}

const COLOR_TABLE: [Rgb; CellColor::LEN] = [
    Rgb::from_hex(0x00_00_00),
    Rgb::from_hex(0xC0_00_00),
    Rgb::from_hex(0x00_C0_00),
    Rgb::from_hex(0x00_00_C0),
    Rgb::from_hex(0xC0_C0_00),
    Rgb::from_hex(0xFF_FF_FF),
    Rgb::from_hex(0x00_00_00),
    Rgb::from_hex(0x80_80_80),
];

impl CellColor {
    pub const LEN: usize = 8;

    /// Colours a piece can be drawn in.
    pub const PIECE_COLORS: [CellColor; 4] = [
        CellColor::Red,
        CellColor::Green,
        CellColor::Blue,
        CellColor::Yellow,
    ];

    /// Marker for rows about to collapse and for filled holes in the stack key.
    pub const MARKER: CellColor = CellColor::White;

    /// Colour of the ghost projection.
    pub const GHOST: CellColor = CellColor::Gray;

    #[must_use]
    pub const fn is_transparent(self) -> bool {
        matches!(self, CellColor::Transparent)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks up the fixed display colour. Transparent cells map to [`EMPTY_BACKGROUND`].
    #[must_use]
    pub const fn rgb(self) -> Rgb {
        match self {
            CellColor::Transparent => EMPTY_BACKGROUND,
            _ => COLOR_TABLE[self.index()],
        }
    }
}

/// Uniformly picks one of [`CellColor::PIECE_COLORS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PieceColor;

impl Distribution<CellColor> for PieceColor {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> CellColor {
        CellColor::PIECE_COLORS[rng.random_range(0..CellColor::PIECE_COLORS.len())]
    }
}

impl Distribution<CellColor> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> CellColor {
        PieceColor.sample(rng)
    }
}
