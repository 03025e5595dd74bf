//! Utility types, used throughout the crate.
//! Canvas geometry is integer pixels, as handed to and from the viewer.

/// A point on the canvas, or an offset within a line.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}
impl Point {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
    /// Componentwise max with zero.
    #[must_use]
    pub fn clamp_non_negative(self) -> Self {
        Self {
            x: self.x.max(0),
            y: self.y.max(0),
        }
    }
    #[must_use]
    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}
impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle, extending right and down from `origin`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct Rect {
    pub origin: Point,
    pub width: i32,
    pub height: i32,
}
impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point { x, y },
            width,
            height,
        }
    }
    /// The box spanned by two corners. The corners may be given in any order.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        let origin = Point::new(a.x.min(b.x), a.y.min(b.y));
        Self {
            origin,
            width: a.x.abs_diff(b.x).try_into().unwrap_or(i32::MAX),
            height: a.y.abs_diff(b.y).try_into().unwrap_or(i32::MAX),
        }
    }
    #[must_use]
    pub fn top_left(&self) -> Point {
        self.origin
    }
    #[must_use]
    pub fn bottom_right(&self) -> Point {
        self.origin.translate(self.width, self.height)
    }
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let bottom_right = self.bottom_right();
        (self.origin.x..bottom_right.x).contains(&point.x)
            && (self.origin.y..bottom_right.y).contains(&point.y)
    }
}

#[cfg(test)]
mod test {
    use super::{Point, Rect};
    #[test]
    fn corners_any_order() {
        let expected = Rect::new(2, 3, 8, 4);
        assert_eq!(
            Rect::from_corners(Point::new(2, 3), Point::new(10, 7)),
            expected
        );
        assert_eq!(
            Rect::from_corners(Point::new(10, 7), Point::new(2, 3)),
            expected
        );
        assert_eq!(expected.bottom_right(), Point::new(10, 7));
    }
    #[test]
    fn contains_is_half_open() {
        let rect = Rect::new(0, 0, 10, 10);
        assert!(rect.contains(Point::ORIGIN));
        assert!(rect.contains(Point::new(9, 9)));
        assert!(!rect.contains(Point::new(10, 5)));
    }
    #[test]
    fn clamp() {
        assert_eq!(
            Point::new(-4, 3).clamp_non_negative(),
            Point::new(0, 3)
        );
    }
}
