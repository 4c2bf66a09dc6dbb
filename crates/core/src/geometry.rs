//! Screen geometry primitives.
//!
//! All coordinates are `f64` because that is the unit the accessibility API
//! speaks; layout strategies keep full precision and only the OS rounds to
//! device pixels. The rectangle type carries the splitting and inset
//! operations the layout strategies are built from.

use serde::{Deserialize, Serialize};

/// A point in global screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }
}

/// The off-screen position windows are parked at while their workspace is
/// hidden. A window observed at this position belongs to an inactive
/// workspace and must never be classified or re-tiled from its parked frame.
pub const SENTINEL: Point = Point::new(-10000.0, -10000.0);

/// Returns true if `point` is the hide sentinel.
pub fn is_sentinel(point: Point) -> bool {
    (point.x - SENTINEL.x).abs() < 0.5 && (point.y - SENTINEL.y).abs() < 0.5
}

/// A rectangle with position and dimensions.
///
/// # Example
///
/// ```
/// use tatami_core::geometry::Rect;
///
/// let screen = Rect::new(0.0, 0.0, 1920.0, 1080.0);
/// let (left, right) = screen.split_horizontal(0.5);
/// assert_eq!(left.width, 960.0);
/// assert_eq!(right.x, 960.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
    }

    /// Split into left and right parts at `ratio` of the width.
    pub fn split_horizontal(&self, ratio: f64) -> (Rect, Rect) {
        let split = self.width * ratio;
        let left = Rect::new(self.x, self.y, split, self.height);
        let right = Rect::new(self.x + split, self.y, self.width - split, self.height);
        (left, right)
    }

    /// Split into top and bottom parts at `ratio` of the height.
    pub fn split_vertical(&self, ratio: f64) -> (Rect, Rect) {
        let split = self.height * ratio;
        let top = Rect::new(self.x, self.y, self.width, split);
        let bottom = Rect::new(self.x, self.y + split, self.width, self.height - split);
        (top, bottom)
    }

    /// Shrink by `amount` on all sides. Width and height clamp at zero.
    pub fn inset(&self, amount: f64) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            (self.width - 2.0 * amount).max(0.0),
            (self.height - 2.0 * amount).max(0.0),
        )
    }

    /// Center a rect of `size` inside this one.
    pub fn centered(&self, size: Size) -> Rect {
        Rect::new(
            self.x + (self.width - size.width) / 2.0,
            self.y + (self.height - size.height) / 2.0,
            size.width,
            size.height,
        )
    }

    /// Component-wise comparison within `eps`.
    pub fn approx_eq(&self, other: &Rect, eps: f64) -> bool {
        (self.x - other.x).abs() < eps
            && (self.y - other.y).abs() < eps
            && (self.width - other.width).abs() < eps
            && (self.height - other.height).abs() < eps
    }
}
