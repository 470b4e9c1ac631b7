use std::fmt;

/// A 2-D point in board coordinates.
///
/// Integer points address cells; `Point<f64>` is used for pixel centres during
/// rotation and is brought back to the grid with [`Point::round`].
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, derive_more::Add, derive_more::Sub,
)]
pub struct Point<T = i32> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    #[must_use]
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl Point<f64> {
    /// Rounds both coordinates to the nearest integer, halves rounding up.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn round(self) -> Point<i32> {
        Point::new(
            (self.x + 0.5).floor() as i32,
            (self.y + 0.5).floor() as i32,
        )
    }
}

/// An axis-aligned rectangle, half-open on the right and bottom edges.
///
/// `Rect` is value geometry: [`union`](Self::union), [`intersection`](Self::intersection)
/// and the predicates never fail, and degenerate rectangles are simply
/// [`empty`](Self::empty). [`offset`](Self::offset) and [`move_to`](Self::move_to) mutate
/// in place.
///
/// # Example
///
/// ```
/// use blockfall_engine::Rect;
///
/// let a = Rect::new(0, 0, 4, 4);
/// let b = Rect::new(2, 2, 6, 6);
/// assert_eq!(a.intersection(b), Rect::new(2, 2, 4, 4));
/// assert_eq!(a.union(b), Rect::new(0, 0, 6, 6));
/// assert_eq!(a.union(Rect::EMPTY), a);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {} {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

impl Rect {
    /// The canonical empty rectangle at the origin.
    pub const EMPTY: Self = Self::new(0, 0, 0, 0);

    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn from_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    /// Returns `true` for zero-area or inverted rectangles.
    #[must_use]
    pub const fn empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    #[must_use]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    #[must_use]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    #[must_use]
    pub const fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Real-valued midpoint of the rectangle.
    #[must_use]
    pub fn center(&self) -> Point<f64> {
        Point::new(
            f64::from(self.left + self.right) / 2.0,
            f64::from(self.top + self.bottom) / 2.0,
        )
    }

    /// Returns `true` if `r` lies entirely inside `self`.
    ///
    /// Always `false` when either rectangle is empty.
    #[must_use]
    pub const fn contains(&self, r: Rect) -> bool {
        if self.empty() || r.empty() {
            return false;
        }
        self.left <= r.left && self.top <= r.top && self.right >= r.right && self.bottom >= r.bottom
    }

    /// Returns `true` if the cell at `(x, y)` is inside the rectangle.
    #[must_use]
    pub const fn contains_point(&self, x: i32, y: i32) -> bool {
        self.left <= x && x < self.right && self.top <= y && y < self.bottom
    }

    /// Smallest rectangle covering both operands.
    ///
    /// A union with an empty rectangle returns the other operand unchanged, wherever
    /// the empty one happens to be located.
    #[must_use]
    pub fn union(&self, r: Rect) -> Rect {
        if self.empty() {
            return r;
        }
        if r.empty() {
            return *self;
        }
        Rect::new(
            self.left.min(r.left),
            self.top.min(r.top),
            self.right.max(r.right),
            self.bottom.max(r.bottom),
        )
    }

    /// Overlapping area of both operands, possibly empty.
    #[must_use]
    pub fn intersection(&self, r: Rect) -> Rect {
        if self.empty() || r.empty() {
            return Rect::EMPTY;
        }
        Rect::new(
            self.left.max(r.left),
            self.top.max(r.top),
            self.right.min(r.right),
            self.bottom.min(r.bottom),
        )
    }

    #[must_use]
    pub fn intersects(&self, r: Rect) -> bool {
        !self.intersection(r).empty()
    }

    /// Translates the rectangle in place.
    pub const fn offset(&mut self, dx: i32, dy: i32) {
        self.left += dx;
        self.top += dy;
        self.right += dx;
        self.bottom += dy;
    }

    /// Returns a translated copy.
    #[must_use]
    pub const fn offset_by(mut self, dx: i32, dy: i32) -> Self {
        self.offset(dx, dy);
        self
    }

    /// Moves the top-left corner to `(x, y)`, keeping the size.
    pub const fn move_to(&mut self, x: i32, y: i32) {
        self.offset(x - self.left, y - self.top);
    }

    /// Iterates the cells of the rectangle in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let Rect {
            left,
            top,
            right,
            bottom,
        } = *self;
        (top..bottom).flat_map(move |y| (left..right).map(move |x| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [Rect; 7] = [
        Rect::new(0, 0, 4, 4),
        Rect::new(2, 2, 6, 6),
        Rect::new(-3, 1, 1, 2),
        Rect::new(5, 5, 5, 9),
        Rect::new(10, 0, 12, 20),
        Rect::new(1, 1, 3, 3),
        Rect::new(7, 7, 6, 8),
    ];

    #[test]
    fn test_empty() {
        assert!(Rect::EMPTY.empty());
        assert!(Rect::new(3, 0, 3, 5).empty());
        assert!(Rect::new(0, 4, 5, 2).empty());
        assert!(!Rect::new(0, 0, 1, 1).empty());
    }

    #[test]
    fn test_union_contains_both_operands() {
        for a in SAMPLES {
            for b in SAMPLES {
                let u = a.union(b);
                if a.empty() {
                    assert_eq!(u, b, "union with empty {a} should return {b}");
                } else if b.empty() {
                    assert_eq!(u, a, "union with empty {b} should return {a}");
                } else {
                    assert!(u.contains(a), "{u} should contain {a}");
                    assert!(u.contains(b), "{u} should contain {b}");
                }
            }
        }
    }

    #[test]
    fn test_union_with_empty_ignores_location() {
        let a = Rect::new(2, 3, 4, 5);
        let far_empty = Rect::new(100, 100, 100, 200);
        assert_eq!(a.union(far_empty), a);
        assert_eq!(far_empty.union(a), a);
    }

    #[test]
    fn test_intersects_matches_intersection() {
        for a in SAMPLES {
            for b in SAMPLES {
                assert_eq!(a.intersects(b), !a.intersection(b).empty(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_disjoint_intersection_is_empty() {
        let a = Rect::new(0, 0, 2, 2);
        let b = Rect::new(2, 0, 4, 2);
        assert!(a.intersection(b).empty());
        assert!(!a.intersects(b));
    }

    #[test]
    fn test_contains_rejects_empty() {
        let outer = Rect::new(0, 0, 10, 10);
        assert!(outer.contains(Rect::new(1, 1, 2, 2)));
        assert!(!outer.contains(Rect::new(5, 5, 5, 5)));
        assert!(!Rect::EMPTY.contains(Rect::EMPTY));
        assert!(!outer.contains(Rect::new(-1, 0, 2, 2)));
    }

    #[test]
    fn test_offset_and_move_to() {
        let mut r = Rect::new(1, 2, 4, 6);
        r.offset(2, -1);
        assert_eq!(r, Rect::new(3, 1, 6, 5));
        r.move_to(-1, 10);
        assert_eq!(r, Rect::new(-1, 10, 2, 14));
        assert_eq!(r.width(), 3);
        assert_eq!(r.height(), 4);
    }

    #[test]
    fn test_center_rounding() {
        let r = Rect::new(0, 0, 3, 3);
        assert_eq!(r.center(), Point::new(1.5, 1.5));
        assert_eq!(r.center().round(), Point::new(2, 2));
        assert_eq!(Rect::new(-3, -3, 0, 0).center().round(), Point::new(-1, -1));
        assert_eq!(Rect::new(0, 0, 4, 2).center().round(), Point::new(2, 1));
    }

    #[test]
    fn test_cells_row_major() {
        let cells: Vec<_> = Rect::new(1, 1, 3, 3).cells().collect();
        assert_eq!(cells, vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
        assert_eq!(Rect::EMPTY.cells().count(), 0);
    }
}
