use super::{geometry::Rect, raster::IndexedImage};

/// The rotations a piece image supports.
///
/// Each kind is a fixed pair of destination size and coordinate mapping from
/// source-local `(x, y)` to destination-local coordinates, for a `w × h` source:
///
/// | kind               | size    | mapping                     |
/// |--------------------|---------|-----------------------------|
/// | `Clockwise`        | `h × w` | `(h - 1 - y, x)`            |
/// | `CounterClockwise` | `h × w` | `(y, w - 1 - x)`            |
/// | `Half`             | `w × h` | `(w - 1 - x, h - 1 - y)`    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
    Half,
}

impl Rotation {
    #[must_use]
    pub const fn from_clockwise(clockwise: bool) -> Self {
        if clockwise {
            Rotation::Clockwise
        } else {
            Rotation::CounterClockwise
        }
    }

    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Rotation::Clockwise => Rotation::CounterClockwise,
            Rotation::CounterClockwise => Rotation::Clockwise,
            Rotation::Half => Rotation::Half,
        }
    }

    /// Destination size for a `width × height` source.
    #[must_use]
    pub const fn dst_size(self, width: i32, height: i32) -> (i32, i32) {
        match self {
            Rotation::Clockwise | Rotation::CounterClockwise => (height, width),
            Rotation::Half => (width, height),
        }
    }

    /// Maps a source-local cell to its destination-local cell.
    #[must_use]
    pub const fn map(self, x: i32, y: i32, width: i32, height: i32) -> (i32, i32) {
        match self {
            Rotation::Clockwise => (height - 1 - y, x),
            Rotation::CounterClockwise => (y, width - 1 - x),
            Rotation::Half => (width - 1 - x, height - 1 - y),
        }
    }
}

/// Builds a rotated copy of `src`.
///
/// Every source cell is copied through the rotation's mapping into a fresh image, which
/// is then moved so that its rounded pixel-centre matches the source's rounded
/// pixel-centre. Rotating back and forth therefore never drifts the piece.
#[must_use]
pub fn transpose_image(src: &IndexedImage, rotation: Rotation) -> IndexedImage {
    let bounds = src.bounds();
    let (width, height) = (bounds.width(), bounds.height());
    let (dst_width, dst_height) = rotation.dst_size(width, height);
    let mut dst = IndexedImage::new(dst_width, dst_height);
    for (x, y) in Rect::from_size(0, 0, width, height).cells() {
        let value = src.value_at(bounds.left + x, bounds.top + y);
        let (dx, dy) = rotation.map(x, y, width, height);
        dst.set_value_at(dx, dy, value);
    }
    let offset = bounds.center().round() - dst.bounds().center().round();
    dst.offset(offset.x, offset.y);
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellColor;

    fn l_shape() -> IndexedImage {
        IndexedImage::from_ascii(
            "
            .#.
            .#.
            .##
            ",
            CellColor::Red,
        )
    }

    #[test]
    fn test_clockwise() {
        let rotated = transpose_image(&l_shape(), Rotation::Clockwise);
        assert_eq!(rotated.to_ascii(), "...\n###\n#..");
        assert_eq!(rotated.bounds(), Rect::new(0, 0, 3, 3));
    }

    #[test]
    fn test_counter_clockwise() {
        let rotated = transpose_image(&l_shape(), Rotation::CounterClockwise);
        assert_eq!(rotated.to_ascii(), "..#\n###\n...");
    }

    #[test]
    fn test_half() {
        let rotated = transpose_image(&l_shape(), Rotation::Half);
        assert_eq!(rotated.to_ascii(), "##.\n.#.\n.#.");
    }

    #[test]
    fn test_non_square_swaps_size_and_recentres() {
        let mut bar = IndexedImage::from_ascii("####", CellColor::Blue);
        bar.move_to(3, 5);
        let rotated = transpose_image(&bar, Rotation::Clockwise);
        assert_eq!(rotated.width(), 1);
        assert_eq!(rotated.height(), 4);
        // Centre (5.0, 5.5) rounds to (5, 6); the rotated centre (0.5, 2.0) rounds to (1, 2).
        assert_eq!(rotated.bounds(), Rect::new(4, 4, 5, 8));
    }

    #[test]
    fn test_rotation_round_trip_restores_pattern_and_position() {
        let mut src = l_shape();
        src.move_to(4, -2);
        for rotation in [Rotation::Clockwise, Rotation::CounterClockwise, Rotation::Half] {
            let there = transpose_image(&src, rotation);
            let back = transpose_image(&there, rotation.inverse());
            assert_eq!(back.to_ascii(), src.to_ascii(), "{rotation:?}");
            assert_eq!(back.bounds(), src.bounds(), "{rotation:?}");
        }
    }

    #[test]
    fn test_four_quarter_turns_are_identity() {
        let src = l_shape();
        let mut image = src.shallow_clone();
        for _ in 0..4 {
            image = transpose_image(&image, Rotation::Clockwise);
        }
        assert_eq!(image.to_ascii(), src.to_ascii());
        assert_eq!(image.bounds(), src.bounds());
    }
}
