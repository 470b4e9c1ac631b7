use std::{cell::RefCell, fmt, rc::Rc};

use super::{geometry::Rect, palette::CellColor};

/// Failure to build a raster from caller-supplied cells.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum RasterError {
    #[display("raster buffer too small: expected at least {expected} cells, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
    #[display("raster dimensions must not be negative: {width}x{height}")]
    NegativeSize { width: i32, height: i32 },
    #[display("raster of {width}x{height} cells is too large")]
    TooLarge { width: i32, height: i32 },
}

/// How [`IndexedImage::copy_rect`] treats transparent source cells.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Every source cell overwrites the destination.
    #[default]
    Replace,
    /// Transparent source cells leave the destination untouched.
    Merge,
}

/// Pixel storage shared by every view of an image.
///
/// The visible-bounds cache lives here, in buffer-local coordinates, so a write through
/// any view invalidates it for all of them.
#[derive(Debug)]
struct PixelBuffer {
    width: i32,
    height: i32,
    cells: Vec<CellColor>,
    visible: Option<Rect>,
}

impl PixelBuffer {
    fn area(&self) -> usize {
        usize::try_from(self.width * self.height).unwrap_or(0)
    }

    fn compute_visible(&self) -> Rect {
        let mut visible = Rect::EMPTY;
        let width = usize::try_from(self.width).unwrap_or(0);
        if width == 0 {
            return visible;
        }
        for (i, cell) in self.cells[..self.area()].iter().enumerate() {
            if cell.is_transparent() {
                continue;
            }
            #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let (x, y) = ((i % width) as i32, (i / width) as i32);
            visible = visible.union(Rect::new(x, y, x + 1, y + 1));
        }
        visible
    }
}

/// A palette-indexed raster positioned in board coordinates.
///
/// An `IndexedImage` is a *view*: a `bounds` rectangle placed over a reference-counted
/// pixel buffer. [`shallow_clone`](Self::shallow_clone) creates a second view of the same
/// pixels that can be moved independently, which is how pieces are translated without
/// copying their cells. [`deep_clone`](Self::deep_clone) copies the pixels.
///
/// All coordinates taken by accessors are absolute board coordinates; they are turned
/// into a buffer offset with `(y - top) * width + (x - left)`. Accessing a cell outside
/// [`bounds`](Self::bounds) is a programmer error and panics.
///
/// # Example
///
/// ```
/// use blockfall_engine::{CellColor, IndexedImage, Rect};
///
/// let image = IndexedImage::new(3, 3);
/// let mut alias = image.shallow_clone();
/// alias.offset(5, 0);
/// alias.set_value_at(6, 1, CellColor::Red);
///
/// // Same pixels, independent placement.
/// assert_eq!(image.value_at(1, 1), CellColor::Red);
/// assert_eq!(image.bounds(), Rect::new(0, 0, 3, 3));
/// assert_eq!(alias.bounds(), Rect::new(5, 0, 8, 3));
/// ```
pub struct IndexedImage {
    buffer: Rc<RefCell<PixelBuffer>>,
    bounds: Rect,
}

impl fmt::Debug for IndexedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedImage")
            .field("bounds", &self.bounds)
            .field("cells", &self.to_ascii())
            .finish()
    }
}

impl IndexedImage {
    /// Creates a fully transparent image at the origin.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self::filled(width, height, CellColor::Transparent)
    }

    /// Creates an image at the origin with every cell set to `value`.
    ///
    /// Negative dimensions are treated as zero.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` does not fit in an `i32`.
    #[must_use]
    pub fn filled(width: i32, height: i32, value: CellColor) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let area = Self::cell_count(width, height).expect("raster area should fit in i32");
        Self::from_parts(width, height, vec![value; area])
    }

    /// Number of cells in a `width` by `height` raster.
    pub fn cell_count(width: i32, height: i32) -> Result<usize, RasterError> {
        if width < 0 || height < 0 {
            return Err(RasterError::NegativeSize { width, height });
        }
        width
            .checked_mul(height)
            .and_then(|area| usize::try_from(area).ok())
            .ok_or(RasterError::TooLarge { width, height })
    }

    /// Wraps caller-supplied cells, row-major.
    ///
    /// Extra trailing cells are kept but never addressed.
    pub fn from_cells(
        width: i32,
        height: i32,
        cells: Vec<CellColor>,
    ) -> Result<Self, RasterError> {
        let expected = Self::cell_count(width, height)?;
        if cells.len() < expected {
            return Err(RasterError::BufferTooSmall {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self::from_parts(width, height, cells))
    }

    /// Builds an image from fixed-width rows (top to bottom).
    #[must_use]
    pub fn from_rows<const N: usize>(rows: &[[CellColor; N]]) -> Self {
        let cells: Vec<_> = rows.iter().flatten().copied().collect();
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let (width, height) = (N as i32, rows.len() as i32);
        Self::from_parts(width, height, cells)
    }

    /// Builds an image from ASCII art, as used by the piece templates and test fixtures.
    ///
    /// `#` is a `color` cell and `.` is transparent; blank lines and other characters are
    /// ignored.
    ///
    /// # Panics
    ///
    /// Panics if the rows have different widths.
    #[must_use]
    pub fn from_ascii(art: &str, color: CellColor) -> Self {
        let rows: Vec<Vec<CellColor>> = art
            .lines()
            .map(|line| {
                line.chars()
                    .filter_map(|c| match c {
                        '#' => Some(color),
                        '.' => Some(CellColor::Transparent),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect();
        let width = rows.first().map_or(0, Vec::len);
        assert!(
            rows.iter().all(|row| row.len() == width),
            "all rows must have the same width"
        );
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let (width, height) = (width as i32, rows.len() as i32);
        Self::from_parts(width, height, rows.concat())
    }

    fn from_parts(width: i32, height: i32, cells: Vec<CellColor>) -> Self {
        Self {
            buffer: Rc::new(RefCell::new(PixelBuffer {
                width,
                height,
                cells,
                visible: None,
            })),
            bounds: Rect::new(0, 0, width, height),
        }
    }

    /// Creates a second view of the same pixels at the same position.
    #[must_use]
    pub fn shallow_clone(&self) -> Self {
        Self {
            buffer: Rc::clone(&self.buffer),
            bounds: self.bounds,
        }
    }

    /// Copies the pixels into a new buffer, keeping the position.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        let buffer = self.buffer.borrow();
        let mut copy = Self::from_parts(
            buffer.width,
            buffer.height,
            buffer.cells[..buffer.area()].to_vec(),
        );
        copy.bounds = self.bounds;
        copy
    }

    /// Returns `true` if both views share one pixel buffer.
    #[must_use]
    pub fn shares_pixels_with(&self, other: &IndexedImage) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.bounds.width()
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.bounds.height()
    }

    /// Moves this view; other views of the same pixels stay where they are.
    pub fn offset(&mut self, dx: i32, dy: i32) {
        self.bounds.offset(dx, dy);
    }

    pub fn move_to(&mut self, x: i32, y: i32) {
        self.bounds.move_to(x, y);
    }

    #[expect(clippy::cast_sign_loss)]
    fn index(&self, x: i32, y: i32) -> usize {
        debug_assert!(
            self.bounds.contains_point(x, y),
            "({x}, {y}) outside image bounds {}",
            self.bounds
        );
        ((y - self.bounds.top) * self.bounds.width() + (x - self.bounds.left)) as usize
    }

    #[must_use]
    pub fn value_at(&self, x: i32, y: i32) -> CellColor {
        self.buffer.borrow().cells[self.index(x, y)]
    }

    pub fn set_value_at(&mut self, x: i32, y: i32, value: CellColor) {
        let index = self.index(x, y);
        let mut buffer = self.buffer.borrow_mut();
        buffer.cells[index] = value;
        buffer.visible = None;
    }

    pub fn fill(&mut self, value: CellColor) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.cells.fill(value);
        buffer.visible = None;
    }

    /// Fills the part of `r` that lies inside the image.
    pub fn fill_rect(&mut self, r: Rect, value: CellColor) {
        let area = self.bounds.intersection(r);
        for (x, y) in area.cells() {
            self.set_value_at(x, y, value);
        }
    }

    /// Copies `src_rect` of `src` so that its top-left lands on `(dst_x, dst_y)`.
    ///
    /// The copied area is clipped to this image, the translated `src_rect` and the
    /// translated bounds of `src`. With [`CopyMode::Merge`] transparent source cells are
    /// skipped, which stamps a piece onto a background without erasing it.
    pub fn copy_rect(
        &mut self,
        src_rect: Rect,
        src: &IndexedImage,
        dst_x: i32,
        dst_y: i32,
        mode: CopyMode,
    ) {
        let dx = dst_x - src_rect.left;
        let dy = dst_y - src_rect.top;
        let area = self
            .bounds
            .intersection(src_rect.offset_by(dx, dy))
            .intersection(src.bounds.offset_by(dx, dy));
        if area.empty() {
            return;
        }
        // Read everything first: `src` may share this image's buffer.
        let values: Vec<_> = area
            .cells()
            .map(|(x, y)| ((x, y), src.value_at(x - dx, y - dy)))
            .collect();
        for ((x, y), value) in values {
            if mode == CopyMode::Merge && value.is_transparent() {
                continue;
            }
            self.set_value_at(x, y, value);
        }
    }

    /// Merges `image` into this one over `rect`, keeping both at their own positions.
    pub fn merge_rect(&mut self, rect: Rect, image: &IndexedImage) {
        self.copy_rect(rect, image, rect.left, rect.top, CopyMode::Merge);
    }

    /// Extracts a new image covering the part of `rect` inside this one.
    #[must_use]
    pub fn sub_image(&self, rect: Rect) -> Option<IndexedImage> {
        let area = self.bounds.intersection(rect);
        if area.empty() {
            return None;
        }
        let mut image = IndexedImage::new(area.width(), area.height());
        image.move_to(area.left, area.top);
        image.copy_rect(area, self, area.left, area.top, CopyMode::Replace);
        Some(image)
    }

    /// Tightest rectangle around the non-transparent cells.
    ///
    /// A fully transparent image reports an empty rectangle located at its own top-left
    /// corner.
    #[must_use]
    pub fn visible_bounds(&self) -> Rect {
        let local = {
            let mut buffer = self.buffer.borrow_mut();
            match buffer.visible {
                Some(visible) => visible,
                None => {
                    let visible = buffer.compute_visible();
                    buffer.visible = Some(visible);
                    visible
                }
            }
        };
        local.offset_by(self.bounds.left, self.bounds.top)
    }

    /// Number of non-transparent cells.
    #[must_use]
    pub fn visible_cell_count(&self) -> usize {
        let buffer = self.buffer.borrow();
        buffer.cells[..buffer.area()]
            .iter()
            .filter(|c| !c.is_transparent())
            .count()
    }

    /// Returns the cells of row `y` (absolute coordinate).
    #[must_use]
    pub fn row(&self, y: i32) -> Vec<CellColor> {
        (self.bounds.left..self.bounds.right)
            .map(|x| self.value_at(x, y))
            .collect()
    }

    /// Renders the image as ASCII art: `.` transparent, `#` anything else.
    #[must_use]
    pub fn to_ascii(&self) -> String {
        (self.bounds.top..self.bounds.bottom)
            .map(|y| {
                self.row(y)
                    .into_iter()
                    .map(|c| if c.is_transparent() { '.' } else { '#' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Returns `true` if any non-transparent cells of `a` and `b` occupy the same position.
#[must_use]
pub fn visible_overlap(a: &IndexedImage, b: &IndexedImage) -> bool {
    let overlap = a.visible_bounds().intersection(b.visible_bounds());
    if overlap.empty() {
        return false;
    }
    overlap
        .cells()
        .any(|(x, y)| !a.value_at(x, y).is_transparent() && !b.value_at(x, y).is_transparent())
}
