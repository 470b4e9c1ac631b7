//! Output side of the board: images are pushed to a [`RenderSink`] region by region.

use crate::{EMPTY_BACKGROUND, IndexedImage, Rect, Rgb};

/// Receives repainted board regions.
pub trait RenderSink {
    /// Shows the part of `image` inside `rect`.
    ///
    /// Only cells inside the sink's own area, the image bounds and `rect` are touched.
    fn display_image(&mut self, image: &IndexedImage, rect: Rect);
}

/// A grid of display colours covering a fixed area of board coordinates.
///
/// Transparent cells are shown as [`EMPTY_BACKGROUND`].
#[derive(Debug, Clone)]
pub struct ColorGrid {
    bounds: Rect,
    cells: Vec<Rgb>,
}

impl ColorGrid {
    /// Creates a grid covering `bounds`, cleared to the background colour.
    ///
    /// # Panics
    ///
    /// Panics if the area of `bounds` does not fit in an `i32`.
    #[must_use]
    pub fn new(bounds: Rect) -> Self {
        let area = IndexedImage::cell_count(bounds.width().max(0), bounds.height().max(0))
            .expect("grid area should fit in i32");
        Self {
            bounds,
            cells: vec![EMPTY_BACKGROUND; area],
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[expect(clippy::cast_sign_loss)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.bounds.contains_point(x, y).then(|| {
            ((y - self.bounds.top) * self.bounds.width() + (x - self.bounds.left)) as usize
        })
    }

    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Rgb> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Iterates the rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        let width = usize::try_from(self.bounds.width()).unwrap_or(0).max(1);
        self.cells.chunks(width)
    }
}

impl RenderSink for ColorGrid {
    fn display_image(&mut self, image: &IndexedImage, rect: Rect) {
        let area = self.bounds.intersection(image.bounds()).intersection(rect);
        for (x, y) in area.cells() {
            if let Some(i) = self.index(x, y) {
                self.cells[i] = image.value_at(x, y).rgb();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellColor;

    #[test]
    fn test_writes_only_the_clipped_region() {
        let mut grid = ColorGrid::new(Rect::new(0, 0, 4, 3));
        let mut image = IndexedImage::filled(3, 3, CellColor::Green);
        image.move_to(2, 1);
        image.set_value_at(3, 1, CellColor::Transparent);
        grid.display_image(&image, Rect::new(0, 0, 10, 2));

        assert_eq!(grid.get(2, 1), Some(CellColor::Green.rgb()));
        assert_eq!(grid.get(3, 1), Some(EMPTY_BACKGROUND));
        // Outside `rect`.
        assert_eq!(grid.get(2, 2), Some(EMPTY_BACKGROUND));
        // Outside the image.
        assert_eq!(grid.get(1, 1), Some(EMPTY_BACKGROUND));
        // Outside the grid.
        assert_eq!(grid.get(4, 1), None);
    }

    #[test]
    fn test_empty_bounds_make_an_empty_grid() {
        let grid = ColorGrid::new(Rect::new(3, 3, 1, 1));
        assert_eq!(grid.rows().count(), 0);
        assert_eq!(grid.get(1, 1), None);
    }

    #[test]
    #[should_panic(expected = "grid area should fit in i32")]
    fn test_oversized_grid_panics() {
        let _ = ColorGrid::new(Rect::new(0, 0, 65_536, 65_536));
    }

    #[test]
    fn test_transparent_overwrites_with_background() {
        let mut grid = ColorGrid::new(Rect::new(0, 0, 2, 1));
        grid.display_image(&IndexedImage::filled(2, 1, CellColor::Red), Rect::new(0, 0, 2, 1));
        grid.display_image(&IndexedImage::new(2, 1), Rect::new(1, 0, 2, 1));
        let rows: Vec<_> = grid.rows().collect();
        assert_eq!(rows, vec![&[CellColor::Red.rgb(), EMPTY_BACKGROUND][..]]);
    }
}
