//! Integer geometry value types
//!
//! Pixel coordinates with the origin in the top-left corner, `y` growing downwards.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A position in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: i32,
    /// Vertical coordinate
    pub y: i32,
}

impl Point {
    /// Create a point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f32 {
        let dx = f64::from(other.x) - f64::from(self.x);
        let dy = f64::from(other.y) - f64::from(self.y);
        #[allow(clippy::cast_possible_truncation)]
        let distance = dx.hypot(dy) as f32;
        distance
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point{{x: {}, y: {}}}", self.x, self.y)
    }
}

/// A width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Area {
    /// Horizontal extent
    pub width: i32,
    /// Vertical extent
    pub height: i32,
}

impl Area {
    /// Create an area
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Whether both extents are positive.
    pub const fn has_area(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// `width * height`, widened so large surfaces cannot overflow.
    pub const fn size(self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

impl From<(i32, i32)> for Area {
    fn from((width, height): (i32, i32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "area{{width: {}, height: {}}}", self.width, self.height)
    }
}

/// An axis aligned rectangle: a top-left position plus a size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Horizontal extent
    pub width: i32,
    /// Vertical extent
    pub height: i32,
}

impl Rect {
    /// Create a rectangle
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rectangle from its position and size
    pub const fn from_parts(position: Point, size: Area) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    /// Top-left corner
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Width and height
    pub const fn size(&self) -> Area {
        Area::new(self.width, self.height)
    }

    /// Moves the rectangle, keeping its size.
    pub fn move_to(&mut self, position: Point) {
        self.x = position.x;
        self.y = position.y;
    }

    /// Resizes the rectangle, keeping its position.
    pub fn resize(&mut self, size: Area) {
        self.width = size.width;
        self.height = size.height;
    }

    /// Right edge, `x + width`
    pub const fn max_x(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge, `y + height`
    pub const fn max_y(&self) -> i32 {
        self.y + self.height
    }

    /// Center, rounded towards the top-left corner
    pub const fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Number of pixels covered
    pub const fn area(&self) -> i64 {
        self.size().size()
    }

    /// Whether both extents are positive
    pub const fn has_area(&self) -> bool {
        self.size().has_area()
    }

    /// Whether `point` lies inside or on the edges of the rectangle.
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.y >= self.y && point.x <= self.max_x() && point.y <= self.max_y()
    }

    /// Whether the rectangles share interior pixels. Touching edges do not count and
    /// empty rectangles never intersect.
    pub const fn intersects(&self, other: &Self) -> bool {
        self.has_area()
            && other.has_area()
            && self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    /// Whether the rectangles overlap or touch.
    pub const fn collides(&self, other: &Self) -> bool {
        self.x <= other.max_x()
            && other.x <= self.max_x()
            && self.y <= other.max_y()
            && other.y <= self.max_y()
    }

    /// Smallest rectangle containing both. An empty rectangle contributes nothing.
    pub fn union(&self, other: &Self) -> Self {
        match (self.has_area(), other.has_area()) {
            (false, false) => Self::default(),
            (true, false) => *self,
            (false, true) => *other,
            (true, true) => {
                let x = self.x.min(other.x);
                let y = self.y.min(other.y);
                Self::new(x, y, self.max_x().max(other.max_x()) - x, self.max_y().max(other.max_y()) - y)
            }
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rect{{x: {}, y: {}, width: {}, height: {}}}",
            self.x, self.y, self.width, self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_arithmetic() {
        let a = Point::new(3, 4);
        assert_eq!(a + Point::new(1, 1), Point::new(4, 5));
        assert_eq!(a - a, Point::default());
        assert_relative_eq!(Point::default().distance(a), 5.0);
    }

    #[test]
    fn test_default_rect_has_no_area() {
        let rect = Rect::default();
        assert_eq!(rect.position(), Point::default());
        assert!(!rect.has_area());
        assert!(!Rect::new(0, 0, 10, 0).has_area());
        assert!(!Rect::new(0, 0, -1, 5).has_area());
        assert!(Rect::new(0, 0, 1, 1).has_area());
    }

    #[test]
    fn test_contains_includes_edges() {
        let rect = Rect::new(10, 20, 30, 40);
        assert!(rect.contains(Point::new(10, 20)));
        assert!(rect.contains(Point::new(rect.max_x(), rect.max_y())));
        assert!(!rect.contains(Point::new(9, 20)));
        assert!(!rect.contains(Point::new(10, 19)));
        assert!(!rect.contains(Point::new(rect.max_x() + 1, rect.y)));
        assert!(!rect.contains(Point::new(rect.x, rect.max_y() + 1)));
    }

    #[test]
    fn test_intersects() {
        let rect = Rect::new(100, 100, 100, 100);
        assert!(rect.intersects(&rect));
        assert!(!rect.intersects(&Rect::default()));
        assert!(!Rect::default().intersects(&Rect::default()));

        // Touching edges
        assert!(!rect.intersects(&Rect::new(90, 100, 10, 10)));
        assert!(!rect.intersects(&Rect::new(200, 100, 10, 10)));
        assert!(!rect.intersects(&Rect::new(100, 200, 10, 10)));

        assert!(rect.intersects(&Rect::new(90, 150, 50, 1)));
        assert!(Rect::new(150, 150, 50, 10).intersects(&rect));
    }

    #[test]
    fn test_collides() {
        let rect = Rect::new(100, 100, 100, 100);
        assert!(rect.collides(&Rect::new(90, 100, 10, 10)));
        assert!(rect.collides(&Rect::new(200, 100, 10, 10)));
        assert!(!rect.collides(&Rect::new(89, 100, 10, 10)));
        assert!(!rect.collides(&Rect::new(100, 201, 10, 10)));
    }

    #[test]
    fn test_center_and_area() {
        let rect = Rect::new(77, 81, 128, 256);
        assert_eq!(rect.center(), Point::new(77 + 64, 81 + 128));
        assert_eq!(rect.area(), 128 * 256);
        assert_eq!(Rect::from_parts(rect.position(), rect.size()), rect);
    }

    #[test]
    fn test_union() {
        let a = Rect::new(10, 10, 50, 50);
        let b = Rect::new(40, 40, 50, 50);
        assert_eq!(a.union(&b), Rect::new(10, 10, 80, 80));
        assert_eq!(a.union(&Rect::default()), a);
        assert_eq!(Rect::default().union(&Rect::default()), Rect::default());
    }

    #[test]
    fn test_move_and_resize() {
        let mut rect = Rect::new(1, 2, 3, 4);
        rect.move_to(Point::new(5, 6));
        rect.resize(Area::new(7, 8));
        assert_eq!(rect, Rect::new(5, 6, 7, 8));
        assert_eq!(rect.to_string(), "rect{x: 5, y: 6, width: 7, height: 8}");
    }
}
